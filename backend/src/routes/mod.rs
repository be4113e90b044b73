//! Route definitions for the Babylog API
//!
//! This module organizes all API routes and applies middleware.

use crate::state::AppState;
use axum::{
    http::{header, HeaderName, Method},
    routing::get,
    Router,
};
use std::time::Duration;
use tower_http::{
    compression::{
        predicate::{DefaultPredicate, NotForContentType, Predicate},
        CompressionLayer,
    },
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

mod auth;
mod babies;
mod chat;
mod families;
mod health;
mod metrics;

#[cfg(test)]
mod chat_tests;

pub use auth::auth_routes;
pub use babies::baby_routes;
pub use chat::chat_routes;
pub use families::family_routes;

/// Header carrying the baby id for chat requests
pub const BABY_ID_HEADER: &str = "x-baby-id";

/// Create the main application router with all middleware
pub fn create_router(state: AppState) -> Router {
    // Chat replies are streamed as text/plain; compressing them would
    // hold chunks back until the encoder flushes.
    let compression = CompressionLayer::new()
        .compress_when(DefaultPredicate::new().and(NotForContentType::new("text/plain")));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
        .route("/health/live", get(health::liveness_check))
        .route("/metrics", get(metrics::render))
        .nest("/api/v1", api_routes())
        // Apply middleware layers
        .layer(compression)
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
                .allow_headers([
                    header::CONTENT_TYPE,
                    header::AUTHORIZATION,
                    HeaderName::from_static(BABY_ID_HEADER),
                ]),
        )
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// API v1 routes
fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(|| async { "Babylog API v1" }))
        .nest("/auth", auth::auth_routes())
        .nest("/families", families::family_routes())
        .nest("/babies", babies::baby_routes())
        .nest("/chat", chat::chat_routes())
}
