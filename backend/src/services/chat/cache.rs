//! Redis-backed cache for formatted chat context
//!
//! The cache is optional: without a Redis connection every lookup misses
//! and every store is a no-op. Redis failures degrade to a miss.

use metrics::counter;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct ContextCache {
    conn: Option<ConnectionManager>,
    ttl_secs: u64,
}

impl ContextCache {
    pub fn new(conn: Option<ConnectionManager>, ttl_secs: u64) -> Self {
        Self { conn, ttl_secs }
    }

    /// Cache that never stores anything
    pub fn disabled() -> Self {
        Self {
            conn: None,
            ttl_secs: 0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.conn.is_some()
    }

    pub fn key(baby_id: Uuid, days: u32) -> String {
        format!("babylog:context:{}:{}d", baby_id, days)
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        let mut conn = self.conn.clone()?;
        match conn.get::<_, Option<String>>(key).await {
            Ok(Some(value)) => {
                counter!("babylog_context_cache_hits_total").increment(1);
                debug!(key, "context cache hit");
                Some(value)
            }
            Ok(None) => {
                counter!("babylog_context_cache_misses_total").increment(1);
                None
            }
            Err(e) => {
                warn!(key, error = %e, "context cache read failed");
                None
            }
        }
    }

    pub async fn set(&self, key: &str, value: &str) {
        let Some(mut conn) = self.conn.clone() else {
            return;
        };
        if let Err(e) = conn
            .set_ex::<_, _, ()>(key, value, self.ttl_secs)
            .await
        {
            warn!(key, error = %e, "context cache write failed");
        }
    }

    /// Drop a cached snapshot so the next lookup rebuilds it
    pub async fn invalidate(&self, key: &str) {
        let Some(mut conn) = self.conn.clone() else {
            return;
        };
        match conn.del::<_, u32>(key).await {
            Ok(removed) => debug!(key, removed, "context cache invalidated"),
            Err(e) => warn!(key, error = %e, "context cache invalidation failed"),
        }
    }
}
