//! Care guideline assembly for one baby

use crate::error::ApiError;
use crate::services::measurement::MeasurementService;
use babylog_shared::guidelines::{build_guidelines, Concentrations, GuidelineSet};
use babylog_shared::models::Baby;
use babylog_shared::types::GuidelineQuery;
use chrono::NaiveDate;
use sqlx::PgPool;

/// Guideline service
pub struct GuidelineService;

impl GuidelineService {
    /// Guidelines for the baby's latest weight and current age
    pub async fn for_baby(
        pool: &PgPool,
        baby: &Baby,
        query: &GuidelineQuery,
        today: NaiveDate,
    ) -> Result<GuidelineSet, ApiError> {
        let weight = MeasurementService::latest_weight(pool, baby.id).await?;
        Ok(Self::compute(baby, weight, query, today))
    }

    pub fn compute(
        baby: &Baby,
        weight_kg: Option<f64>,
        query: &GuidelineQuery,
        today: NaiveDate,
    ) -> GuidelineSet {
        build_guidelines(
            weight_kg,
            baby.age_in_months(today),
            baby.gender,
            Concentrations {
                ibuprofen_mg_per_ml: query.ibuprofen_mg_per_ml,
                acetaminophen_mg_per_ml: query.acetaminophen_mg_per_ml,
            },
        )
    }
}
