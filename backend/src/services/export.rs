//! Activity export
//!
//! Flattens category payloads into one CSV row per activity so the log can
//! be opened in a spreadsheet.

use crate::error::ApiError;
use crate::repositories::{ActivityFilter, ActivityRecord, ActivityRepository};
use babylog_shared::models::ActivityPayload;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

const EXPORT_LIMIT: i64 = 10_000;

/// One exported activity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityExportRow {
    pub id: String,
    pub category: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub kind: Option<String>,
    pub amount: Option<f64>,
    pub unit: Option<String>,
    pub detail: Option<String>,
    pub note: Option<String>,
}

impl From<ActivityRecord> for ActivityExportRow {
    fn from(record: ActivityRecord) -> Self {
        let (kind, amount, unit, detail) = match record.payload.0 {
            ActivityPayload::Feeding {
                feeding_type,
                amount_ml,
                duration_minutes,
                side,
            } => (
                Some(enum_label(&feeding_type)),
                amount_ml,
                amount_ml.map(|_| "ml".to_string()),
                duration_minutes
                    .map(|m| format!("{} min", m))
                    .or_else(|| side.map(|s| enum_label(&s))),
            ),
            ActivityPayload::Sleep { sleep_type } => (Some(enum_label(&sleep_type)), None, None, None),
            ActivityPayload::Diaper {
                diaper_type,
                stool_condition,
            } => (
                Some(enum_label(&diaper_type)),
                None,
                None,
                stool_condition.map(|c| enum_label(&c)),
            ),
            ActivityPayload::Temperature { celsius } => {
                (None, Some(celsius), Some("°C".to_string()), None)
            }
            ActivityPayload::Medicine { name, amount, unit } => {
                (Some(name), Some(amount), Some(unit.symbol().to_string()), None)
            }
            ActivityPayload::Bath | ActivityPayload::Play => (None, None, None, None),
        };

        Self {
            id: record.id.to_string(),
            category: record.category,
            started_at: record.started_at,
            ended_at: record.ended_at,
            kind,
            amount,
            unit,
            detail,
            note: record.note,
        }
    }
}

/// Export service
pub struct ExportService;

impl ExportService {
    /// All activities of a baby as CSV, oldest first
    pub async fn activities_csv(pool: &PgPool, baby_id: Uuid) -> Result<String, ApiError> {
        let filter = ActivityFilter {
            limit: EXPORT_LIMIT,
            ..Default::default()
        };
        let mut records = ActivityRepository::list(pool, baby_id, &filter)
            .await
            .map_err(ApiError::Internal)?;
        records.reverse();

        let rows: Vec<ActivityExportRow> = records.into_iter().map(ActivityExportRow::from).collect();
        Self::to_csv(&rows)
    }

    /// Convert data to CSV string
    fn to_csv<T: Serialize>(data: &[T]) -> Result<String, ApiError> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        for record in data {
            wtr.serialize(record)
                .map_err(|e| ApiError::Internal(anyhow::anyhow!("CSV serialization error: {}", e)))?;
        }
        let bytes = wtr
            .into_inner()
            .map_err(|e| ApiError::Internal(anyhow::anyhow!("CSV flush error: {}", e)))?;
        String::from_utf8(bytes)
            .map_err(|e| ApiError::Internal(anyhow::anyhow!("CSV encoding error: {}", e)))
    }
}

/// snake_case serde name of a unit-like enum variant
fn enum_label<T: Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(s)) => s,
        _ => String::new(),
    }
}
