//! Activity recording service
//!
//! Validation happens here, before anything reaches the repository.

use crate::error::ApiError;
use crate::repositories::{ActivityFilter, ActivityRecord, ActivityRepository, WriteActivity};
use babylog_shared::types::{ActivityListQuery, ActivityRequest, ActivityResponse};
use babylog_shared::validation::validate_activity;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

const MAX_LIST_LIMIT: i64 = 500;

/// Activity service for CRUD operations
pub struct ActivityService;

impl ActivityService {
    pub async fn create(
        pool: &PgPool,
        user_id: Uuid,
        baby_id: Uuid,
        req: ActivityRequest,
        now: DateTime<Utc>,
    ) -> Result<ActivityResponse, ApiError> {
        let input = Self::checked_input(user_id, baby_id, req, now)?;
        let record = ActivityRepository::create(pool, input)
            .await
            .map_err(ApiError::Internal)?;

        debug!(activity_id = %record.id, category = %record.category, "activity recorded");
        Ok(activity_response(record))
    }

    /// Replace an activity in full
    pub async fn update(
        pool: &PgPool,
        user_id: Uuid,
        baby_id: Uuid,
        activity_id: Uuid,
        req: ActivityRequest,
        now: DateTime<Utc>,
    ) -> Result<ActivityResponse, ApiError> {
        let input = Self::checked_input(user_id, baby_id, req, now)?;
        let record = ActivityRepository::update(pool, activity_id, input)
            .await
            .map_err(ApiError::Internal)?
            .ok_or_else(|| ApiError::NotFound("Activity not found".to_string()))?;

        Ok(activity_response(record))
    }

    pub async fn delete(pool: &PgPool, baby_id: Uuid, activity_id: Uuid) -> Result<(), ApiError> {
        let deleted = ActivityRepository::delete(pool, activity_id, baby_id)
            .await
            .map_err(ApiError::Internal)?;
        if !deleted {
            return Err(ApiError::NotFound("Activity not found".to_string()));
        }
        Ok(())
    }

    pub async fn list(
        pool: &PgPool,
        baby_id: Uuid,
        query: &ActivityListQuery,
    ) -> Result<Vec<ActivityResponse>, ApiError> {
        if let (Some(from), Some(to)) = (query.from, query.to) {
            if to < from {
                return Err(ApiError::InvalidField {
                    field: "to".to_string(),
                    message: "Range end must not be before range start".to_string(),
                });
            }
        }

        let filter = ActivityFilter {
            from: query.from,
            to: query.to,
            category: query.category.map(|c| c.as_str().to_string()),
            limit: query.limit.clamp(1, MAX_LIST_LIMIT),
        };

        let records = ActivityRepository::list(pool, baby_id, &filter)
            .await
            .map_err(ApiError::Internal)?;

        Ok(records.into_iter().map(activity_response).collect())
    }

    fn checked_input(
        user_id: Uuid,
        baby_id: Uuid,
        req: ActivityRequest,
        now: DateTime<Utc>,
    ) -> Result<WriteActivity, ApiError> {
        let note = req
            .note
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        validate_activity(req.started_at, req.ended_at, &req.payload, note.as_deref(), now)?;

        Ok(WriteActivity {
            baby_id,
            recorded_by: user_id,
            started_at: req.started_at,
            ended_at: req.ended_at,
            payload: req.payload,
            note,
        })
    }
}

pub(crate) fn activity_response(record: ActivityRecord) -> ActivityResponse {
    ActivityResponse {
        id: record.id.to_string(),
        baby_id: record.baby_id.to_string(),
        started_at: record.started_at,
        ended_at: record.ended_at,
        payload: record.payload.0,
        note: record.note,
        recorded_by: record.recorded_by.to_string(),
        created_at: record.created_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use babylog_shared::models::{ActivityPayload, SleepType};
    use chrono::Duration;

    fn request(payload: ActivityPayload, note: Option<&str>) -> ActivityRequest {
        let now = Utc::now();
        ActivityRequest {
            started_at: now - Duration::hours(2),
            ended_at: Some(now - Duration::hours(1)),
            payload,
            note: note.map(str::to_string),
        }
    }

    #[test]
    fn test_blank_note_is_dropped() {
        let input = ActivityService::checked_input(
            Uuid::new_v4(),
            Uuid::new_v4(),
            request(ActivityPayload::Sleep { sleep_type: SleepType::Nap }, Some("   ")),
            Utc::now(),
        )
        .unwrap();
        assert!(input.note.is_none());
    }

    #[test]
    fn test_invalid_temperature_maps_to_field_error() {
        let err = ActivityService::checked_input(
            Uuid::new_v4(),
            Uuid::new_v4(),
            request(ActivityPayload::Temperature { celsius: 50.0 }, None),
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::InvalidField { ref field, .. } if field == "celsius"));
    }
}
