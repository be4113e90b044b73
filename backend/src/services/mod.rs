//! Business logic services
//!
//! Services encapsulate business logic and coordinate between
//! repositories and external systems.

pub mod activity;
pub mod chat;
pub mod export;
pub mod family;
pub mod guideline;
pub mod measurement;
pub mod summary;
pub mod user;

pub use activity::ActivityService;
pub use chat::ChatOrchestrator;
pub use export::ExportService;
pub use family::FamilyService;
pub use guideline::GuidelineService;
pub use measurement::MeasurementService;
pub use summary::SummaryService;
pub use user::UserService;
