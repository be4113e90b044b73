//! Application state management
//!
//! This module provides the shared application state that is passed
//! to all request handlers via Axum's state extraction.
//!
//! Every field is cheap to clone: pools and clients are internally
//! reference counted, configuration sits behind an `Arc`.

use crate::auth::JwtService;
use crate::config::AppConfig;
use crate::services::chat::{
    summary_channel, ChatOrchestrator, ContextCache, DisabledModel, MessageCipher,
};
use anyhow::Result;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::PgPool;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Pre-initialized JWT service with cached keys
    pub jwt: JwtService,
    /// Chat pipeline: cache, cipher, model and summary queue
    pub chat: ChatOrchestrator,
    /// Prometheus render handle, absent when no recorder was installed
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create a new application state
    ///
    /// JWT keys are derived here once; call at startup only.
    pub fn new(db: PgPool, config: AppConfig, chat: ChatOrchestrator) -> Self {
        let jwt = JwtService::new(
            &config.jwt.secret,
            config.jwt.access_token_expiry_secs,
            config.jwt.refresh_token_expiry_secs,
        );

        Self {
            db,
            config: Arc::new(config),
            jwt,
            chat,
            metrics: None,
        }
    }

    /// State with no cache, no model and no summary worker
    ///
    /// Chat requests still persist the user message and receive the
    /// apology chunk.
    pub fn without_ai(db: PgPool, config: AppConfig) -> Result<Self> {
        let cipher = MessageCipher::from_base64_key(&config.encryption.key)?;
        let (summaries, _worker_rx) = summary_channel(1);
        let chat = ChatOrchestrator::new(
            db.clone(),
            ContextCache::disabled(),
            cipher,
            Arc::new(DisabledModel),
            summaries,
            config.insights.clone(),
        );
        Ok(Self::new(db, config, chat))
    }

    /// Swap the chat context cache, e.g. for a live Redis in tests
    pub fn with_context_cache(mut self, cache: ContextCache) -> Self {
        self.chat = self.chat.with_cache(cache);
        self
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Get a reference to the database pool
    #[inline]
    pub fn db(&self) -> &PgPool {
        &self.db
    }

    /// Get a reference to the configuration
    #[inline]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Get a reference to the JWT service
    #[inline]
    pub fn jwt(&self) -> &JwtService {
        &self.jwt
    }

    #[inline]
    pub fn chat(&self) -> &ChatOrchestrator {
        &self.chat
    }

    /// Offset used to cut calendar days
    pub fn offset(&self) -> FixedOffset {
        self.config.insights.offset()
    }

    /// Local calendar date of `now`
    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.offset()).date_naive()
    }
}
