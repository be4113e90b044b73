//! Family and baby management
//!
//! Every baby-scoped operation goes through [`FamilyService::ensure_baby_access`],
//! which keeps "no such baby" (404) distinct from "not your family" (403).

use crate::error::ApiError;
use crate::repositories::{BabyRecord, BabyRepository, CreateBaby, FamilyRepository, MembershipRecord};
use anyhow::anyhow;
use babylog_shared::models::{Baby, Gender};
use babylog_shared::types::{BabyResponse, CreateBabyRequest, CreateFamilyRequest, FamilyResponse};
use chrono::NaiveDate;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

const INVITE_CODE_LENGTH: usize = 8;

/// Family service for membership and baby operations
pub struct FamilyService;

impl FamilyService {
    pub async fn create_family(
        pool: &PgPool,
        user_id: Uuid,
        req: &CreateFamilyRequest,
    ) -> Result<FamilyResponse, ApiError> {
        req.validate()?;

        let family = FamilyRepository::create_with_owner(pool, req.name.trim(), &new_invite_code(), user_id)
            .await
            .map_err(ApiError::Internal)?;

        info!(family_id = %family.id, %user_id, "family created");
        Ok(FamilyResponse {
            id: family.id.to_string(),
            name: family.name,
            invite_code: family.invite_code,
            role: "owner".to_string(),
            created_at: family.created_at,
        })
    }

    pub async fn join_family(
        pool: &PgPool,
        user_id: Uuid,
        invite_code: &str,
    ) -> Result<FamilyResponse, ApiError> {
        let code = invite_code.trim().to_uppercase();
        let family = FamilyRepository::find_by_invite_code(pool, &code)
            .await
            .map_err(ApiError::Internal)?
            .ok_or_else(|| ApiError::NotFound("Invite code not found".to_string()))?;

        FamilyRepository::add_member(pool, family.id, user_id)
            .await
            .map_err(ApiError::Internal)?;

        let membership = FamilyRepository::find_membership(pool, family.id, user_id)
            .await
            .map_err(ApiError::Internal)?
            .ok_or_else(|| ApiError::Internal(anyhow!("membership missing after join")))?;

        info!(family_id = %family.id, %user_id, "joined family");
        Ok(family_response(membership))
    }

    pub async fn list_families(pool: &PgPool, user_id: Uuid) -> Result<Vec<FamilyResponse>, ApiError> {
        let families = FamilyRepository::list_for_user(pool, user_id)
            .await
            .map_err(ApiError::Internal)?;

        Ok(families.into_iter().map(family_response).collect())
    }

    pub async fn create_baby(
        pool: &PgPool,
        user_id: Uuid,
        family_id: Uuid,
        req: &CreateBabyRequest,
        today: NaiveDate,
    ) -> Result<BabyResponse, ApiError> {
        req.validate()?;
        if req.birth_date > today {
            return Err(ApiError::InvalidField {
                field: "birth_date".to_string(),
                message: "Birth date cannot be in the future".to_string(),
            });
        }

        Self::ensure_member(pool, family_id, user_id).await?;

        let record = BabyRepository::create(
            pool,
            CreateBaby {
                family_id,
                name: req.name.trim().to_string(),
                birth_date: req.birth_date,
                gender: req.gender.to_string(),
            },
        )
        .await
        .map_err(ApiError::Internal)?;

        Ok(baby_response(&baby_model(&record)?, today))
    }

    pub async fn list_babies(
        pool: &PgPool,
        user_id: Uuid,
        family_id: Uuid,
        today: NaiveDate,
    ) -> Result<Vec<BabyResponse>, ApiError> {
        Self::ensure_member(pool, family_id, user_id).await?;

        let records = BabyRepository::list_for_family(pool, family_id)
            .await
            .map_err(ApiError::Internal)?;

        records
            .iter()
            .map(|r| baby_model(r).map(|b| baby_response(&b, today)))
            .collect()
    }

    pub async fn get_baby(
        pool: &PgPool,
        user_id: Uuid,
        baby_id: Uuid,
        today: NaiveDate,
    ) -> Result<BabyResponse, ApiError> {
        let baby = Self::ensure_baby_access(pool, user_id, baby_id).await?;
        Ok(baby_response(&baby, today))
    }

    /// Load a baby the user may act on
    ///
    /// Returns `NotFound` when the baby does not exist and `Forbidden` when
    /// it belongs to a family the user is not a member of.
    pub async fn ensure_baby_access(pool: &PgPool, user_id: Uuid, baby_id: Uuid) -> Result<Baby, ApiError> {
        let record = BabyRepository::find_by_id(pool, baby_id)
            .await
            .map_err(ApiError::Internal)?
            .ok_or_else(|| ApiError::NotFound("Baby not found".to_string()))?;

        let member = FamilyRepository::is_member(pool, record.family_id, user_id)
            .await
            .map_err(ApiError::Internal)?;
        if !member {
            warn!(%user_id, %baby_id, "baby access denied");
            return Err(ApiError::Forbidden(
                "Baby does not belong to any of your families".to_string(),
            ));
        }

        baby_model(&record)
    }

    async fn ensure_member(pool: &PgPool, family_id: Uuid, user_id: Uuid) -> Result<(), ApiError> {
        let member = FamilyRepository::is_member(pool, family_id, user_id)
            .await
            .map_err(ApiError::Internal)?;
        if member {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Not a member of this family".to_string()))
        }
    }
}

fn new_invite_code() -> String {
    let simple = Uuid::new_v4().simple().to_string();
    simple[..INVITE_CODE_LENGTH].to_uppercase()
}

fn family_response(m: MembershipRecord) -> FamilyResponse {
    FamilyResponse {
        id: m.id.to_string(),
        name: m.name,
        invite_code: m.invite_code,
        role: m.role,
        created_at: m.created_at,
    }
}

fn baby_model(record: &BabyRecord) -> Result<Baby, ApiError> {
    let gender: Gender = record
        .gender
        .parse()
        .map_err(|e: String| ApiError::Internal(anyhow!(e)))?;

    Ok(Baby {
        id: record.id,
        family_id: record.family_id,
        name: record.name.clone(),
        birth_date: record.birth_date,
        gender,
    })
}

fn baby_response(baby: &Baby, today: NaiveDate) -> BabyResponse {
    BabyResponse {
        id: baby.id.to_string(),
        family_id: baby.family_id.to_string(),
        name: baby.name.clone(),
        birth_date: baby.birth_date,
        gender: baby.gender,
        age_months: baby.age_in_months(today),
    }
}
