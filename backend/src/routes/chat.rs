//! AI chat routes
//!
//! `POST /api/v1/chat` answers with a chunked `text/plain` body. Failures
//! after the first byte cannot change the status code, so the model's
//! errors arrive as an apology in the last chunk.

use super::BABY_ID_HEADER;
use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::services::FamilyService;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
    routing::{post, put},
    Json, Router,
};
use babylog_shared::types::{ChatRequest, ChatTurnResponse, ShareTurnRequest};
use chrono::Utc;
use futures_util::stream;
use std::convert::Infallible;
use uuid::Uuid;

/// Create chat routes
pub fn chat_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(chat))
        .route("/:turn_id/share", put(share_turn))
}

/// POST /api/v1/chat
///
/// The baby is named by `babyId` in the body or the `X-Baby-Id` header.
async fn chat(
    State(state): State<AppState>,
    auth: AuthUser,
    headers: HeaderMap,
    Json(req): Json<ChatRequest>,
) -> ApiResult<Response> {
    let baby_id = requested_baby_id(&req, &headers)?;
    let baby = FamilyService::ensure_baby_access(state.db(), auth.user_id, baby_id).await?;

    let rx = state
        .chat()
        .start_turn(auth.user_id, &baby, req, Utc::now())
        .await?;

    let body = stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|chunk| (Ok::<_, Infallible>(chunk), rx))
    });

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(body),
    )
        .into_response())
}

/// PUT /api/v1/chat/:turn_id/share
async fn share_turn(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(turn_id): Path<Uuid>,
    Json(req): Json<ShareTurnRequest>,
) -> ApiResult<Json<ChatTurnResponse>> {
    let baby_id = state.chat().turn_baby(turn_id).await?;
    FamilyService::ensure_baby_access(state.db(), auth.user_id, baby_id).await?;

    let turn = state
        .chat()
        .set_shared(turn_id, auth.user_id, req.shared)
        .await?;
    Ok(Json(turn))
}

/// Baby id from the body, falling back to the header
fn requested_baby_id(req: &ChatRequest, headers: &HeaderMap) -> Result<Uuid, ApiError> {
    let raw = req
        .baby_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .or_else(|| {
            headers
                .get(BABY_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|s| !s.is_empty())
        })
        .ok_or_else(|| ApiError::Unauthorized("Baby id is required".to_string()))?;

    Uuid::parse_str(raw).map_err(|_| ApiError::InvalidField {
        field: "babyId".to_string(),
        message: "Baby id must be a UUID".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use babylog_shared::types::{ChatMessage, ChatRole};

    fn request(baby_id: Option<&str>) -> ChatRequest {
        ChatRequest {
            messages: vec![ChatMessage {
                role: ChatRole::User,
                content: "How much should she eat?".to_string(),
            }],
            baby_id: baby_id.map(str::to_string),
        }
    }

    #[test]
    fn test_body_baby_id_wins_over_header() {
        let body_id = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(
            BABY_ID_HEADER,
            HeaderValue::from_str(&Uuid::new_v4().to_string()).unwrap(),
        );

        let id = requested_baby_id(&request(Some(&body_id.to_string())), &headers).unwrap();
        assert_eq!(id, body_id);
    }

    #[test]
    fn test_header_used_when_body_has_no_id() {
        let header_id = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(
            BABY_ID_HEADER,
            HeaderValue::from_str(&header_id.to_string()).unwrap(),
        );

        assert_eq!(requested_baby_id(&request(Some("  ")), &headers).unwrap(), header_id);
    }

    #[test]
    fn test_missing_baby_id_is_unauthorized() {
        let err = requested_baby_id(&request(None), &HeaderMap::new()).unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[test]
    fn test_malformed_baby_id_is_rejected() {
        let err = requested_baby_id(&request(Some("baby-1")), &HeaderMap::new()).unwrap_err();
        assert!(matches!(err, ApiError::InvalidField { .. }));
    }
}
