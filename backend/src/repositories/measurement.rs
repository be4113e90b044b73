//! Growth measurement repository for database operations

use anyhow::Result;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

/// Growth measurement record from database
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MeasurementRecord {
    pub id: Uuid,
    pub baby_id: Uuid,
    pub recorded_by: Uuid,
    pub measured_at: DateTime<Utc>,
    pub weight_kg: Option<Decimal>,
    pub height_cm: Option<Decimal>,
    pub head_circumference_cm: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a measurement
#[derive(Debug, Clone)]
pub struct CreateMeasurement {
    pub baby_id: Uuid,
    pub recorded_by: Uuid,
    pub measured_at: DateTime<Utc>,
    pub weight_kg: Option<Decimal>,
    pub height_cm: Option<Decimal>,
    pub head_circumference_cm: Option<Decimal>,
}

/// Measurement repository for database operations
pub struct MeasurementRepository;

impl MeasurementRepository {
    pub async fn create(pool: &PgPool, input: CreateMeasurement) -> Result<MeasurementRecord> {
        let record = sqlx::query_as::<_, MeasurementRecord>(
            r#"
            INSERT INTO growth_measurements
                (baby_id, recorded_by, measured_at, weight_kg, height_cm, head_circumference_cm)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, baby_id, recorded_by, measured_at, weight_kg, height_cm,
                      head_circumference_cm, created_at
            "#,
        )
        .bind(input.baby_id)
        .bind(input.recorded_by)
        .bind(input.measured_at)
        .bind(input.weight_kg)
        .bind(input.height_cm)
        .bind(input.head_circumference_cm)
        .fetch_one(pool)
        .await?;

        Ok(record)
    }

    /// Most recent measurements, newest first
    pub async fn get_recent(pool: &PgPool, baby_id: Uuid, limit: i64) -> Result<Vec<MeasurementRecord>> {
        let records = sqlx::query_as::<_, MeasurementRecord>(
            r#"
            SELECT id, baby_id, recorded_by, measured_at, weight_kg, height_cm,
                   head_circumference_cm, created_at
            FROM growth_measurements
            WHERE baby_id = $1
            ORDER BY measured_at DESC
            LIMIT $2
            "#,
        )
        .bind(baby_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(records)
    }

    /// Latest recorded weight, skipping measurements without one
    pub async fn latest_weight(pool: &PgPool, baby_id: Uuid) -> Result<Option<Decimal>> {
        let weight = sqlx::query_scalar::<_, Decimal>(
            r#"
            SELECT weight_kg
            FROM growth_measurements
            WHERE baby_id = $1 AND weight_kg IS NOT NULL
            ORDER BY measured_at DESC
            LIMIT 1
            "#,
        )
        .bind(baby_id)
        .fetch_optional(pool)
        .await?;

        Ok(weight)
    }
}
