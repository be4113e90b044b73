//! Babylog Backend
//!
//! Baby activity tracking for families, with an AI assistant that answers
//! from the baby's recent log.
//!
//! ## Architecture
//!
//! The backend follows a layered architecture:
//! - Routes: HTTP request handling and routing
//! - Services: Business logic, the chat pipeline and its summary worker
//! - Repositories: Data access
//! - Database: PostgreSQL with SQLx, Redis for the AI context cache

use anyhow::{Context, Result};
use babylog_backend::{
    config::{self, AppConfig, DEVELOPMENT_ENCRYPTION_KEY},
    db, routes,
    services::chat::{
        spawn_summarizer, summary_channel, ChatModel, ChatOrchestrator, ContextCache,
        DisabledModel, MessageCipher, OllamaClient,
    },
    state::AppState,
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use redis::aio::ConnectionManager;
use secrecy::SecretString;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    init_tracing();

    let config = AppConfig::load()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        env = if AppConfig::is_production() { "production" } else { "development" },
        "Starting Babylog backend"
    );

    if AppConfig::is_production() {
        validate_production_config(&config)?;
    }

    let metrics = install_metrics_recorder();

    info!("Connecting to database...");
    let db_pool = db::create_pool(&config.database).await?;

    // Production runs migrations as a separate job
    if !AppConfig::is_production() {
        db::run_migrations(&db_pool).await?;
    }

    let redis_conn = connect_redis(&config.redis.url).await;
    let cache = ContextCache::new(redis_conn, config.insights.context_cache_ttl_secs);

    let cipher = MessageCipher::from_base64_key(&config.encryption.key)
        .context("invalid encryption key")?;
    let model = build_model(&config.ai)?;

    let (summaries, summary_rx) = summary_channel(config.ai.summary_queue_capacity);
    let _summarizer = spawn_summarizer(summary_rx, model.clone(), db_pool.clone(), cipher.clone());

    let chat = ChatOrchestrator::new(
        db_pool.clone(),
        cache,
        cipher,
        model,
        summaries,
        config.insights.clone(),
    );

    let mut state = AppState::new(db_pool, config.clone(), chat);
    if let Some(handle) = metrics {
        state = state.with_metrics(handle);
    }

    let app = routes::create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!(address = %addr, "Server listening");

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Hosted model client, or a stand-in that always fails when AI is off
fn build_model(ai: &config::AiConfig) -> Result<Arc<dyn ChatModel>> {
    if !ai.enabled {
        warn!("AI chat disabled; replies will be the apology message");
        return Ok(Arc::new(DisabledModel));
    }

    let api_key = (!ai.api_key.is_empty()).then(|| SecretString::new(ai.api_key.clone()));
    let client = OllamaClient::new(
        &ai.base_url,
        ai.model.clone(),
        api_key,
        Duration::from_secs(ai.request_timeout_secs),
    )
    .context("failed to build model client")?;

    info!(base_url = %ai.base_url, model = %ai.model, "AI chat enabled");
    Ok(Arc::new(client))
}

/// Install the global Prometheus recorder
///
/// Returns None when a recorder is already installed; the server still
/// runs, `/metrics` answers 404.
fn install_metrics_recorder() -> Option<PrometheusHandle> {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("Failed to install metrics recorder: {}", e);
            None
        }
    }
}

/// Connect to Redis with graceful fallback
///
/// Returns None if Redis is unavailable; the AI context is then rebuilt on
/// every chat request.
async fn connect_redis(url: &str) -> Option<ConnectionManager> {
    info!("Connecting to Redis...");

    match redis::Client::open(url) {
        Ok(client) => match ConnectionManager::new(client).await {
            Ok(conn) => {
                info!("Redis connection established");
                Some(conn)
            }
            Err(e) => {
                warn!("Failed to connect to Redis: {}. Context caching disabled.", e);
                None
            }
        },
        Err(e) => {
            warn!("Invalid Redis URL: {}. Context caching disabled.", e);
            None
        }
    }
}

/// Initialize tracing/logging
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if AppConfig::is_production() {
            "babylog_backend=info,tower_http=info".into()
        } else {
            "babylog_backend=debug,tower_http=debug,sqlx=warn".into()
        }
    });

    let subscriber = tracing_subscriber::registry().with(env_filter);

    if AppConfig::is_production() {
        // JSON logging for log aggregation
        subscriber
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        subscriber
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}

/// Validate configuration for production deployment
fn validate_production_config(config: &AppConfig) -> Result<()> {
    let mut errors = Vec::new();

    if config.jwt.secret.contains("development") || config.jwt.secret.len() < 32 {
        errors.push("JWT secret must be at least 32 characters and not contain 'development'");
    }

    if config.encryption.key == DEVELOPMENT_ENCRYPTION_KEY {
        errors.push("Encryption key must be replaced in production");
    }

    if config.database.url.contains("localhost") || config.database.url.contains("127.0.0.1") {
        warn!("Database URL contains localhost - ensure this is intentional for production");
    }

    if !errors.is_empty() {
        for err in &errors {
            error!("Configuration error: {}", err);
        }
        anyhow::bail!("Invalid production configuration");
    }

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
