//! Per-baby routes: activities, growth, summaries, guidelines and chat history
//!
//! Every handler checks family membership first; an unknown baby is a 404,
//! a baby of another family is a 403.

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::services::{
    ActivityService, ExportService, FamilyService, GuidelineService, MeasurementService,
    SummaryService,
};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use babylog_shared::guidelines::GuidelineSet;
use babylog_shared::types::{
    ActivityListQuery, ActivityListResponse, ActivityRequest, ActivityResponse, BabyResponse,
    ChatTurnResponse, GuidelineQuery, MeasurementRequest, MeasurementResponse, SummaryQuery,
};
use babylog_shared::PeriodSummary;
use chrono::Utc;
use uuid::Uuid;

/// Create baby routes
pub fn baby_routes() -> Router<AppState> {
    Router::new()
        .route("/:baby_id", get(get_baby))
        .route("/:baby_id/activities", get(list_activities).post(create_activity))
        .route("/:baby_id/activities/export", get(export_activities))
        .route(
            "/:baby_id/activities/:activity_id",
            put(update_activity).delete(delete_activity),
        )
        .route("/:baby_id/measurements", get(list_measurements).post(record_measurement))
        .route("/:baby_id/summary", get(period_summary))
        .route("/:baby_id/guidelines", get(guidelines))
        .route("/:baby_id/chat", get(chat_history))
}

/// GET /api/v1/babies/:baby_id
async fn get_baby(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(baby_id): Path<Uuid>,
) -> ApiResult<Json<BabyResponse>> {
    let today = state.today(Utc::now());
    let baby = FamilyService::get_baby(state.db(), auth.user_id, baby_id, today).await?;
    Ok(Json(baby))
}

/// POST /api/v1/babies/:baby_id/activities
async fn create_activity(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(baby_id): Path<Uuid>,
    Json(req): Json<ActivityRequest>,
) -> ApiResult<(StatusCode, Json<ActivityResponse>)> {
    FamilyService::ensure_baby_access(state.db(), auth.user_id, baby_id).await?;
    let activity =
        ActivityService::create(state.db(), auth.user_id, baby_id, req, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(activity)))
}

/// GET /api/v1/babies/:baby_id/activities?from=&to=&category=&limit=
async fn list_activities(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(baby_id): Path<Uuid>,
    Query(query): Query<ActivityListQuery>,
) -> ApiResult<Json<ActivityListResponse>> {
    FamilyService::ensure_baby_access(state.db(), auth.user_id, baby_id).await?;
    let items = ActivityService::list(state.db(), baby_id, &query).await?;
    let count = items.len();
    Ok(Json(ActivityListResponse { items, count }))
}

/// PUT /api/v1/babies/:baby_id/activities/:activity_id
async fn update_activity(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((baby_id, activity_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<ActivityRequest>,
) -> ApiResult<Json<ActivityResponse>> {
    FamilyService::ensure_baby_access(state.db(), auth.user_id, baby_id).await?;
    let activity = ActivityService::update(
        state.db(),
        auth.user_id,
        baby_id,
        activity_id,
        req,
        Utc::now(),
    )
    .await?;
    Ok(Json(activity))
}

/// DELETE /api/v1/babies/:baby_id/activities/:activity_id
async fn delete_activity(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((baby_id, activity_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    FamilyService::ensure_baby_access(state.db(), auth.user_id, baby_id).await?;
    ActivityService::delete(state.db(), baby_id, activity_id).await?;
    state.chat().forget_context(baby_id).await;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/babies/:baby_id/activities/export - CSV download
async fn export_activities(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(baby_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    FamilyService::ensure_baby_access(state.db(), auth.user_id, baby_id).await?;
    let csv = ExportService::activities_csv(state.db(), baby_id).await?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/csv; charset=utf-8"),
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_static("attachment; filename=\"activities.csv\""),
    );

    Ok((headers, csv))
}

/// POST /api/v1/babies/:baby_id/measurements
async fn record_measurement(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(baby_id): Path<Uuid>,
    Json(req): Json<MeasurementRequest>,
) -> ApiResult<(StatusCode, Json<MeasurementResponse>)> {
    FamilyService::ensure_baby_access(state.db(), auth.user_id, baby_id).await?;
    let measurement =
        MeasurementService::record(state.db(), auth.user_id, baby_id, &req, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(measurement)))
}

/// GET /api/v1/babies/:baby_id/measurements
async fn list_measurements(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(baby_id): Path<Uuid>,
) -> ApiResult<Json<Vec<MeasurementResponse>>> {
    FamilyService::ensure_baby_access(state.db(), auth.user_id, baby_id).await?;
    let history = MeasurementService::history(state.db(), baby_id).await?;
    Ok(Json(history))
}

/// GET /api/v1/babies/:baby_id/summary?days=7
async fn period_summary(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(baby_id): Path<Uuid>,
    Query(query): Query<SummaryQuery>,
) -> ApiResult<Json<PeriodSummary>> {
    FamilyService::ensure_baby_access(state.db(), auth.user_id, baby_id).await?;
    let today = state.today(Utc::now());
    let summary =
        SummaryService::calculate_period_summary(state.db(), baby_id, query.days, today, state.offset())
            .await?;
    Ok(Json(summary))
}

/// GET /api/v1/babies/:baby_id/guidelines
async fn guidelines(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(baby_id): Path<Uuid>,
    Query(query): Query<GuidelineQuery>,
) -> ApiResult<Json<GuidelineSet>> {
    let baby = FamilyService::ensure_baby_access(state.db(), auth.user_id, baby_id).await?;
    let today = state.today(Utc::now());
    let set = GuidelineService::for_baby(state.db(), &baby, &query, today).await?;
    Ok(Json(set))
}

/// GET /api/v1/babies/:baby_id/chat - own turns plus turns shared with the family
async fn chat_history(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(baby_id): Path<Uuid>,
) -> ApiResult<Json<Vec<ChatTurnResponse>>> {
    FamilyService::ensure_baby_access(state.db(), auth.user_id, baby_id).await?;
    let turns = state.chat().history(baby_id, auth.user_id).await?;
    Ok(Json(turns))
}
