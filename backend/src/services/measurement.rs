//! Growth measurement service

use crate::error::ApiError;
use crate::repositories::{CreateMeasurement, MeasurementRecord, MeasurementRepository};
use babylog_shared::types::{MeasurementRequest, MeasurementResponse};
use babylog_shared::validation::validate_measurement;
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

const DEFAULT_HISTORY_LIMIT: i64 = 50;

/// Measurement service
pub struct MeasurementService;

impl MeasurementService {
    pub async fn record(
        pool: &PgPool,
        user_id: Uuid,
        baby_id: Uuid,
        req: &MeasurementRequest,
        now: DateTime<Utc>,
    ) -> Result<MeasurementResponse, ApiError> {
        validate_measurement(req.weight_kg, req.height_cm, req.head_circumference_cm)?;
        if req.measured_at > now {
            return Err(ApiError::InvalidField {
                field: "measured_at".to_string(),
                message: "Measurement time cannot be in the future".to_string(),
            });
        }

        let record = MeasurementRepository::create(
            pool,
            CreateMeasurement {
                baby_id,
                recorded_by: user_id,
                measured_at: req.measured_at,
                weight_kg: to_decimal(req.weight_kg, 2),
                height_cm: to_decimal(req.height_cm, 1),
                head_circumference_cm: to_decimal(req.head_circumference_cm, 1),
            },
        )
        .await
        .map_err(ApiError::Internal)?;

        Ok(measurement_response(record))
    }

    pub async fn history(pool: &PgPool, baby_id: Uuid) -> Result<Vec<MeasurementResponse>, ApiError> {
        let records = MeasurementRepository::get_recent(pool, baby_id, DEFAULT_HISTORY_LIMIT)
            .await
            .map_err(ApiError::Internal)?;

        Ok(records.into_iter().map(measurement_response).collect())
    }

    /// Latest known weight in kg
    pub async fn latest_weight(pool: &PgPool, baby_id: Uuid) -> Result<Option<f64>, ApiError> {
        let weight = MeasurementRepository::latest_weight(pool, baby_id)
            .await
            .map_err(ApiError::Internal)?;

        Ok(weight.and_then(|w| w.to_f64()))
    }
}

fn to_decimal(value: Option<f64>, scale: u32) -> Option<Decimal> {
    value
        .and_then(|v| Decimal::try_from(v).ok())
        .map(|d| d.round_dp(scale))
}

fn measurement_response(record: MeasurementRecord) -> MeasurementResponse {
    MeasurementResponse {
        id: record.id.to_string(),
        measured_at: record.measured_at,
        weight_kg: record.weight_kg.and_then(|d| d.to_f64()),
        height_cm: record.height_cm.and_then(|d| d.to_f64()),
        head_circumference_cm: record.head_circumference_cm.and_then(|d| d.to_f64()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_decimal_rounds_to_column_scale() {
        assert_eq!(to_decimal(Some(6.456), 2), Some(Decimal::new(646, 2)));
        assert_eq!(to_decimal(Some(64.26), 1), Some(Decimal::new(643, 1)));
        assert_eq!(to_decimal(None, 2), None);
    }

    #[test]
    fn test_response_converts_decimals() {
        let record = MeasurementRecord {
            id: Uuid::new_v4(),
            baby_id: Uuid::new_v4(),
            recorded_by: Uuid::new_v4(),
            measured_at: Utc::now(),
            weight_kg: Some(Decimal::new(715, 2)),
            height_cm: None,
            head_circumference_cm: Some(Decimal::new(425, 1)),
            created_at: Utc::now(),
        };
        let response = measurement_response(record);
        assert_eq!(response.weight_kg, Some(7.15));
        assert_eq!(response.height_cm, None);
        assert_eq!(response.head_circumference_cm, Some(42.5));
    }
}
