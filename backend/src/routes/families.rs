//! Family and baby registration routes

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::services::FamilyService;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use babylog_shared::types::{
    BabyResponse, CreateBabyRequest, CreateFamilyRequest, FamilyResponse, JoinFamilyRequest,
};
use chrono::Utc;
use uuid::Uuid;

/// Create family routes
pub fn family_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_families).post(create_family))
        .route("/join", post(join_family))
        .route("/:family_id/babies", get(list_babies).post(create_baby))
}

/// POST /api/v1/families - caller becomes the owner
async fn create_family(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreateFamilyRequest>,
) -> ApiResult<(StatusCode, Json<FamilyResponse>)> {
    let family = FamilyService::create_family(state.db(), auth.user_id, &req).await?;
    Ok((StatusCode::CREATED, Json(family)))
}

/// GET /api/v1/families
async fn list_families(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<FamilyResponse>>> {
    let families = FamilyService::list_families(state.db(), auth.user_id).await?;
    Ok(Json(families))
}

/// POST /api/v1/families/join
async fn join_family(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<JoinFamilyRequest>,
) -> ApiResult<Json<FamilyResponse>> {
    let family = FamilyService::join_family(state.db(), auth.user_id, &req.invite_code).await?;
    Ok(Json(family))
}

/// POST /api/v1/families/:family_id/babies
async fn create_baby(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(family_id): Path<Uuid>,
    Json(req): Json<CreateBabyRequest>,
) -> ApiResult<(StatusCode, Json<BabyResponse>)> {
    let today = state.today(Utc::now());
    let baby = FamilyService::create_baby(state.db(), auth.user_id, family_id, &req, today).await?;
    Ok((StatusCode::CREATED, Json(baby)))
}

/// GET /api/v1/families/:family_id/babies
async fn list_babies(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(family_id): Path<Uuid>,
) -> ApiResult<Json<Vec<BabyResponse>>> {
    let today = state.today(Utc::now());
    let babies = FamilyService::list_babies(state.db(), auth.user_id, family_id, today).await?;
    Ok(Json(babies))
}
