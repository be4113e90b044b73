//! Babylog Shared Library
//!
//! Domain models, activity summaries and care guidelines shared by the
//! backend and the WASM module.

pub mod errors;
pub mod guidelines;
pub mod models;
pub mod summary;
pub mod types;
pub mod validation;

// Re-export commonly used items
pub use errors::*;
pub use models::{
    ActivityCategory, ActivityEvent, ActivityPayload, Baby, BreastSide, DiaperType, FeedingType,
    Gender, MedicineUnit, SleepType, StoolCondition,
};
pub use summary::{
    compare_values, period_windows, ActivityBundle, ComparisonResult, PeriodStats, PeriodSummary,
    PeriodWindows, Trend, Window,
};
