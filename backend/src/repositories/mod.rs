//! Database repositories
//!
//! Provides data access layer for database operations.

pub mod activity;
pub mod chat;
pub mod family;
pub mod measurement;
pub mod user;

pub use activity::{ActivityFilter, ActivityRecord, ActivityRepository, WriteActivity};
pub use chat::{ChatRepository, ChatTurnRecord};
pub use family::{
    BabyRecord, BabyRepository, CreateBaby, FamilyRecord, FamilyRepository, MembershipRecord,
};
pub use measurement::{CreateMeasurement, MeasurementRecord, MeasurementRepository};
pub use user::{UserRecord, UserRepository};
