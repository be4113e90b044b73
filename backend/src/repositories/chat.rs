//! Chat turn repository
//!
//! Message, reply and summary columns hold ciphertext; this layer never
//! sees plaintext.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// Chat turn record from database
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ChatTurnRecord {
    pub id: Uuid,
    pub baby_id: Uuid,
    pub user_id: Uuid,
    pub message: String,
    pub reply: String,
    pub summary: Option<String>,
    pub shared: bool,
    pub created_at: DateTime<Utc>,
}

/// Chat repository for database operations
pub struct ChatRepository;

impl ChatRepository {
    /// Store a new turn with an empty reply
    pub async fn create(
        pool: &PgPool,
        baby_id: Uuid,
        user_id: Uuid,
        message: &str,
    ) -> Result<ChatTurnRecord> {
        let record = sqlx::query_as::<_, ChatTurnRecord>(
            r#"
            INSERT INTO chat_turns (baby_id, user_id, message)
            VALUES ($1, $2, $3)
            RETURNING id, baby_id, user_id, message, reply, summary, shared, created_at
            "#,
        )
        .bind(baby_id)
        .bind(user_id)
        .bind(message)
        .fetch_one(pool)
        .await?;

        Ok(record)
    }

    pub async fn set_reply(pool: &PgPool, id: Uuid, reply: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE chat_turns SET reply = $2 WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(reply)
        .execute(pool)
        .await?;

        Ok(())
    }

    pub async fn set_summary(pool: &PgPool, id: Uuid, summary: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE chat_turns SET summary = $2 WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(summary)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Most recent summaries the user may see: their own turns or shared ones
    pub async fn recent_summaries(
        pool: &PgPool,
        baby_id: Uuid,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<String>> {
        let summaries = sqlx::query_scalar::<_, String>(
            r#"
            SELECT summary
            FROM chat_turns
            WHERE baby_id = $1
              AND summary IS NOT NULL
              AND (user_id = $2 OR shared)
            ORDER BY created_at DESC
            LIMIT $3
            "#,
        )
        .bind(baby_id)
        .bind(user_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(summaries)
    }

    /// Turns visible to the user, newest first
    pub async fn list_visible(
        pool: &PgPool,
        baby_id: Uuid,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<ChatTurnRecord>> {
        let records = sqlx::query_as::<_, ChatTurnRecord>(
            r#"
            SELECT id, baby_id, user_id, message, reply, summary, shared, created_at
            FROM chat_turns
            WHERE baby_id = $1 AND (user_id = $2 OR shared)
            ORDER BY created_at DESC
            LIMIT $3
            "#,
        )
        .bind(baby_id)
        .bind(user_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(records)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<ChatTurnRecord>> {
        let record = sqlx::query_as::<_, ChatTurnRecord>(
            r#"
            SELECT id, baby_id, user_id, message, reply, summary, shared, created_at
            FROM chat_turns
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(record)
    }

    /// Toggle sharing; only the author's own turn is updated
    pub async fn set_shared(
        pool: &PgPool,
        id: Uuid,
        user_id: Uuid,
        shared: bool,
    ) -> Result<Option<ChatTurnRecord>> {
        let record = sqlx::query_as::<_, ChatTurnRecord>(
            r#"
            UPDATE chat_turns
            SET shared = $3
            WHERE id = $1 AND user_id = $2
            RETURNING id, baby_id, user_id, message, reply, summary, shared, created_at
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(shared)
        .fetch_optional(pool)
        .await?;

        Ok(record)
    }
}
