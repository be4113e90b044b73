//! AI chat orchestration
//!
//! A turn runs in this order: the user message is stored encrypted, the
//! prompt is assembled (activity log, guidelines, earlier summaries), the
//! model reply is streamed to the caller through a channel, the full reply
//! is stored encrypted, and the exchange is queued for summarization.
//!
//! If the model fails before or during streaming, the caller receives
//! [`APOLOGY_MESSAGE`] as the final chunk and the stored reply stays empty.

pub mod cache;
pub mod cipher;
pub mod context;
pub mod llm;
pub mod prompt;
pub mod summarizer;

pub use cache::ContextCache;
pub use cipher::{CipherError, MessageCipher};
pub use llm::{ChatModel, ChunkStream, DisabledModel, LlmError, ModelRequest, OllamaClient};
pub use summarizer::{spawn_summarizer, summary_channel, SummaryJob, SummaryQueue};

use crate::config::InsightsConfig;
use crate::error::ApiError;
use crate::repositories::{ChatRepository, ChatTurnRecord};
use crate::services::guideline::GuidelineService;
use anyhow::anyhow;
use babylog_shared::models::Baby;
use babylog_shared::types::{ChatMessage, ChatRequest, ChatRole, ChatTurnResponse, GuidelineQuery};
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use metrics::{counter, histogram};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Final chunk sent when the model cannot answer
pub const APOLOGY_MESSAGE: &str =
    "\n\nSorry, I couldn't finish answering just now. Please try again in a moment.";

const MAX_MESSAGE_CHARS: usize = 4000;
const MAX_HISTORY_MESSAGES: usize = 20;
const STREAM_BUFFER: usize = 32;
const HISTORY_PAGE_SIZE: i64 = 50;

/// How a streamed reply ended
#[derive(Debug, PartialEq, Eq)]
pub enum ReplyOutcome {
    /// The model finished; holds the full reply text
    Completed(String),
    /// The model failed and the apology was sent
    Failed,
    /// The caller went away mid-stream
    Disconnected,
}

/// Everything a chat turn needs, cloned cheaply into the streaming task
#[derive(Clone)]
pub struct ChatOrchestrator {
    pool: PgPool,
    cache: ContextCache,
    cipher: MessageCipher,
    model: Arc<dyn ChatModel>,
    summaries: SummaryQueue,
    insights: InsightsConfig,
}

impl ChatOrchestrator {
    pub fn new(
        pool: PgPool,
        cache: ContextCache,
        cipher: MessageCipher,
        model: Arc<dyn ChatModel>,
        summaries: SummaryQueue,
        insights: InsightsConfig,
    ) -> Self {
        Self {
            pool,
            cache,
            cipher,
            model,
            summaries,
            insights,
        }
    }

    pub fn cipher(&self) -> &MessageCipher {
        &self.cipher
    }

    pub fn cache(&self) -> &ContextCache {
        &self.cache
    }

    /// Same orchestrator over a different context cache
    pub fn with_cache(mut self, cache: ContextCache) -> Self {
        self.cache = cache;
        self
    }

    /// Evict the baby's cached activity context
    ///
    /// Deletions leave no trace for the freshness check, so they evict the
    /// snapshot directly.
    pub async fn forget_context(&self, baby_id: Uuid) {
        let key = ContextCache::key(baby_id, self.insights.context_days);
        self.cache.invalidate(&key).await;
    }

    /// Store the user's message, build the prompt and start streaming
    ///
    /// Errors before the stream starts are returned to the caller; once the
    /// receiver is handed back, every failure is reported in-band.
    pub async fn start_turn(
        &self,
        user_id: Uuid,
        baby: &Baby,
        request: ChatRequest,
        now: DateTime<Utc>,
    ) -> Result<mpsc::Receiver<String>, ApiError> {
        let (message, history) = split_request(request.messages)?;

        let sealed = self
            .cipher
            .encrypt(&message)
            .map_err(|e| ApiError::Internal(e.into()))?;
        let turn = ChatRepository::create(&self.pool, baby.id, user_id, &sealed)
            .await
            .map_err(ApiError::Internal)?;
        counter!("babylog_chat_turns_total").increment(1);
        info!(turn_id = %turn.id, baby_id = %baby.id, %user_id, "chat turn started");

        let system = self.system_prompt(user_id, baby, now).await?;
        let model_request = ModelRequest {
            system,
            history,
            message: message.clone(),
        };

        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        let this = self.clone();
        let turn_id = turn.id;
        tokio::spawn(async move {
            this.finish_turn(turn_id, message, model_request, tx).await;
        });

        Ok(rx)
    }

    async fn system_prompt(&self, user_id: Uuid, baby: &Baby, now: DateTime<Utc>) -> Result<String, ApiError> {
        let today = now.with_timezone(&self.insights.offset()).date_naive();
        let no_concentrations = GuidelineQuery::default();

        let (activity, guidelines, summaries) = tokio::try_join!(
            context::activity_context(&self.pool, &self.cache, &self.insights, baby.id, now),
            GuidelineService::for_baby(&self.pool, baby, &no_concentrations, today),
            context::prior_summaries(
                &self.pool,
                &self.cipher,
                baby.id,
                user_id,
                self.insights.prior_summary_limit,
            ),
        )?;

        Ok(prompt::build_system_prompt(&prompt::PromptInput {
            baby,
            age_months: baby.age_in_months(today),
            activity_context: &activity,
            guidelines: &guidelines,
            prior_summaries: &summaries,
        }))
    }

    async fn finish_turn(
        self,
        turn_id: Uuid,
        message: String,
        request: ModelRequest,
        tx: mpsc::Sender<String>,
    ) {
        let started = Instant::now();
        let outcome = stream_reply(self.model.as_ref(), request, &tx).await;
        histogram!("babylog_chat_stream_seconds").record(started.elapsed().as_secs_f64());
        drop(tx);

        match outcome {
            ReplyOutcome::Completed(reply) => {
                if let Err(e) = self.save_reply(turn_id, &reply).await {
                    error!(%turn_id, error = %e, "failed to store chat reply");
                    return;
                }
                self.summaries.enqueue(SummaryJob {
                    turn_id,
                    message,
                    reply,
                });
            }
            ReplyOutcome::Failed => {
                counter!("babylog_chat_stream_failures_total").increment(1);
            }
            ReplyOutcome::Disconnected => {
                debug!(%turn_id, "client disconnected before reply finished");
            }
        }
    }

    async fn save_reply(&self, turn_id: Uuid, reply: &str) -> anyhow::Result<()> {
        let sealed = self.cipher.encrypt(reply)?;
        ChatRepository::set_reply(&self.pool, turn_id, &sealed).await
    }

    /// Turns visible to the user, decrypted; undecryptable turns are skipped
    pub async fn history(&self, baby_id: Uuid, user_id: Uuid) -> Result<Vec<ChatTurnResponse>, ApiError> {
        let records = ChatRepository::list_visible(&self.pool, baby_id, user_id, HISTORY_PAGE_SIZE)
            .await
            .map_err(ApiError::Internal)?;

        Ok(records
            .into_iter()
            .filter_map(|r| self.decrypt_turn(r))
            .collect())
    }

    /// Share or unshare one of the user's own turns with the family
    pub async fn set_shared(&self, turn_id: Uuid, user_id: Uuid, shared: bool) -> Result<ChatTurnResponse, ApiError> {
        let existing = ChatRepository::find_by_id(&self.pool, turn_id)
            .await
            .map_err(ApiError::Internal)?
            .ok_or_else(|| ApiError::NotFound("Chat turn not found".to_string()))?;
        if existing.user_id != user_id {
            return Err(ApiError::Forbidden("Only the author can share a turn".to_string()));
        }

        let updated = ChatRepository::set_shared(&self.pool, turn_id, user_id, shared)
            .await
            .map_err(ApiError::Internal)?
            .ok_or_else(|| ApiError::NotFound("Chat turn not found".to_string()))?;

        self.decrypt_turn(updated)
            .ok_or_else(|| ApiError::Internal(anyhow!("stored chat turn could not be decrypted")))
    }

    /// Baby a turn belongs to, for access checks
    pub async fn turn_baby(&self, turn_id: Uuid) -> Result<Uuid, ApiError> {
        ChatRepository::find_by_id(&self.pool, turn_id)
            .await
            .map_err(ApiError::Internal)?
            .map(|t| t.baby_id)
            .ok_or_else(|| ApiError::NotFound("Chat turn not found".to_string()))
    }

    fn decrypt_turn(&self, record: ChatTurnRecord) -> Option<ChatTurnResponse> {
        let message = match self.cipher.decrypt(&record.message) {
            Ok(m) => m,
            Err(e) => {
                warn!(turn_id = %record.id, error = %e, "skipping undecryptable chat turn");
                return None;
            }
        };
        let reply = match self.cipher.decrypt_optional(&record.reply) {
            Ok(r) if r.is_empty() => None,
            Ok(r) => Some(r),
            Err(e) => {
                warn!(turn_id = %record.id, error = %e, "chat reply could not be decrypted");
                None
            }
        };

        Some(ChatTurnResponse {
            id: record.id.to_string(),
            user_id: record.user_id.to_string(),
            message,
            reply,
            shared: record.shared,
            created_at: record.created_at,
        })
    }
}

/// Pull the new user message off the end of the conversation
///
/// Everything before it becomes history; system messages from the client
/// are ignored.
pub fn split_request(mut messages: Vec<ChatMessage>) -> Result<(String, Vec<ChatMessage>), ApiError> {
    let invalid = |message: &str| ApiError::InvalidField {
        field: "messages".to_string(),
        message: message.to_string(),
    };

    let last = messages
        .pop()
        .ok_or_else(|| invalid("At least one message is required"))?;
    if last.role != ChatRole::User {
        return Err(invalid("The last message must come from the user"));
    }

    let content = last.content.trim().to_string();
    if content.is_empty() {
        return Err(invalid("Message must not be empty"));
    }
    if content.chars().count() > MAX_MESSAGE_CHARS {
        return Err(invalid("Message must be at most 4000 characters"));
    }

    let history: Vec<ChatMessage> = messages
        .into_iter()
        .filter(|m| m.role != ChatRole::System && !m.content.trim().is_empty())
        .collect();
    let skip = history.len().saturating_sub(MAX_HISTORY_MESSAGES);

    Ok((content, history.into_iter().skip(skip).collect()))
}

/// Relay model output to the caller and collect the full reply
///
/// On any model error the apology is sent as the final chunk. An empty
/// reply counts as a failure.
pub async fn stream_reply(
    model: &dyn ChatModel,
    request: ModelRequest,
    tx: &mpsc::Sender<String>,
) -> ReplyOutcome {
    let mut chunks = match model.stream_chat(request).await {
        Ok(chunks) => chunks,
        Err(e) => {
            warn!(error = %e, "model request failed");
            return apologize(tx).await;
        }
    };

    let mut reply = String::new();
    while let Some(chunk) = chunks.next().await {
        match chunk {
            Ok(text) => {
                reply.push_str(&text);
                if tx.send(text).await.is_err() {
                    return ReplyOutcome::Disconnected;
                }
            }
            Err(e) => {
                warn!(error = %e, "model stream failed");
                return apologize(tx).await;
            }
        }
    }

    if reply.trim().is_empty() {
        warn!("model returned an empty reply");
        return apologize(tx).await;
    }

    ReplyOutcome::Completed(reply)
}

async fn apologize(tx: &mpsc::Sender<String>) -> ReplyOutcome {
    if tx.send(APOLOGY_MESSAGE.to_string()).await.is_err() {
        return ReplyOutcome::Disconnected;
    }
    ReplyOutcome::Failed
}
