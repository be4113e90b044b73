//! Activity repository for database operations
//!
//! Payloads are stored as JSONB tagged by category; the `category` column
//! duplicates the tag so window queries can filter without touching JSON.

use anyhow::Result;
use babylog_shared::models::{ActivityEvent, ActivityPayload};
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

/// Activity record from database
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ActivityRecord {
    pub id: Uuid,
    pub baby_id: Uuid,
    pub recorded_by: Uuid,
    pub category: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub payload: Json<ActivityPayload>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ActivityRecord> for ActivityEvent {
    fn from(record: ActivityRecord) -> Self {
        ActivityEvent {
            id: record.id,
            baby_id: record.baby_id,
            started_at: record.started_at,
            ended_at: record.ended_at,
            payload: record.payload.0,
            note: record.note,
        }
    }
}

/// Input for creating or replacing an activity
#[derive(Debug, Clone)]
pub struct WriteActivity {
    pub baby_id: Uuid,
    pub recorded_by: Uuid,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub payload: ActivityPayload,
    pub note: Option<String>,
}

/// Filters for listing activities
#[derive(Debug, Clone, Default)]
pub struct ActivityFilter {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub category: Option<String>,
    pub limit: i64,
}

const ACTIVITY_COLUMNS: &str = "id, baby_id, recorded_by, category, started_at, ended_at, payload, note, created_at, updated_at";

/// Activity repository for database operations
pub struct ActivityRepository;

impl ActivityRepository {
    pub async fn create(pool: &PgPool, input: WriteActivity) -> Result<ActivityRecord> {
        let query = format!(
            r#"
            INSERT INTO activities (baby_id, recorded_by, category, started_at, ended_at, payload, note)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {ACTIVITY_COLUMNS}
            "#
        );
        let record = sqlx::query_as::<_, ActivityRecord>(&query)
            .bind(input.baby_id)
            .bind(input.recorded_by)
            .bind(input.payload.category().as_str())
            .bind(input.started_at)
            .bind(input.ended_at)
            .bind(Json(&input.payload))
            .bind(&input.note)
            .fetch_one(pool)
            .await?;

        Ok(record)
    }

    /// Replace an activity's timestamps, payload and note
    pub async fn update(pool: &PgPool, id: Uuid, input: WriteActivity) -> Result<Option<ActivityRecord>> {
        let query = format!(
            r#"
            UPDATE activities
            SET category = $3, started_at = $4, ended_at = $5, payload = $6, note = $7,
                updated_at = NOW()
            WHERE id = $1 AND baby_id = $2
            RETURNING {ACTIVITY_COLUMNS}
            "#
        );
        let record = sqlx::query_as::<_, ActivityRecord>(&query)
            .bind(id)
            .bind(input.baby_id)
            .bind(input.payload.category().as_str())
            .bind(input.started_at)
            .bind(input.ended_at)
            .bind(Json(&input.payload))
            .bind(&input.note)
            .fetch_optional(pool)
            .await?;

        Ok(record)
    }

    pub async fn delete(pool: &PgPool, id: Uuid, baby_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM activities
            WHERE id = $1 AND baby_id = $2
            "#,
        )
        .bind(id)
        .bind(baby_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Newest-first listing with optional time range and category filters
    pub async fn list(pool: &PgPool, baby_id: Uuid, filter: &ActivityFilter) -> Result<Vec<ActivityRecord>> {
        let query = format!(
            r#"
            SELECT {ACTIVITY_COLUMNS}
            FROM activities
            WHERE baby_id = $1
              AND ($2::timestamptz IS NULL OR started_at >= $2)
              AND ($3::timestamptz IS NULL OR started_at <= $3)
              AND ($4::text IS NULL OR category = $4)
            ORDER BY started_at DESC
            LIMIT $5
            "#
        );
        let records = sqlx::query_as::<_, ActivityRecord>(&query)
            .bind(baby_id)
            .bind(filter.from)
            .bind(filter.to)
            .bind(&filter.category)
            .bind(filter.limit)
            .fetch_all(pool)
            .await?;

        Ok(records)
    }

    /// Events of the given categories whose start lies in `[start, end]`
    pub async fn list_in_window(
        pool: &PgPool,
        baby_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        categories: &[&str],
    ) -> Result<Vec<ActivityEvent>> {
        let categories: Vec<String> = categories.iter().map(|c| c.to_string()).collect();
        let query = format!(
            r#"
            SELECT {ACTIVITY_COLUMNS}
            FROM activities
            WHERE baby_id = $1
              AND started_at >= $2 AND started_at <= $3
              AND category = ANY($4)
            ORDER BY started_at ASC
            "#
        );
        let records = sqlx::query_as::<_, ActivityRecord>(&query)
            .bind(baby_id)
            .bind(start)
            .bind(end)
            .bind(&categories)
            .fetch_all(pool)
            .await?;

        Ok(records.into_iter().map(ActivityEvent::from).collect())
    }

    /// Whether any activity or measurement was written at or after `since`
    pub async fn has_writes_since(pool: &PgPool, baby_id: Uuid, since: DateTime<Utc>) -> Result<bool> {
        let recent = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM activities
                WHERE baby_id = $1 AND (created_at >= $2 OR updated_at >= $2)
            ) OR EXISTS(
                SELECT 1 FROM growth_measurements
                WHERE baby_id = $1 AND created_at >= $2
            )
            "#,
        )
        .bind(baby_id)
        .bind(since)
        .fetch_one(pool)
        .await?;

        Ok(recent)
    }
}
