//! Background summarization of finished chat turns
//!
//! The chat handler hands each completed exchange to a bounded queue and
//! moves on. A single worker drains the queue, asks the model for a short
//! summary and stores it encrypted. Failures are logged and dropped; a
//! turn without a summary is simply left out of future context.

use super::cipher::{CipherError, MessageCipher};
use super::llm::{ChatModel, LlmError, ModelRequest};
use super::prompt::SUMMARY_INSTRUCTION;
use crate::repositories::ChatRepository;
use metrics::counter;
use sqlx::PgPool;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

const MAX_SUMMARY_CHARS: usize = 500;

/// One finished exchange awaiting a summary
#[derive(Debug, Clone)]
pub struct SummaryJob {
    pub turn_id: Uuid,
    pub message: String,
    pub reply: String,
}

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("model failed: {0}")]
    Model(#[from] LlmError),

    #[error("model returned an empty summary")]
    Empty,

    #[error("encryption failed: {0}")]
    Cipher(#[from] CipherError),

    #[error("storage failed: {0}")]
    Store(#[from] anyhow::Error),
}

/// Sending half handed to request handlers
#[derive(Clone, Debug)]
pub struct SummaryQueue {
    tx: mpsc::Sender<SummaryJob>,
}

impl SummaryQueue {
    /// Queue a job without waiting; returns false when it had to be dropped
    pub fn enqueue(&self, job: SummaryJob) -> bool {
        let turn_id = job.turn_id;
        match self.tx.try_send(job) {
            Ok(()) => {
                counter!("babylog_summary_jobs_queued_total").increment(1);
                true
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                counter!("babylog_summary_jobs_dropped_total").increment(1);
                warn!(%turn_id, "summary queue full, dropping job");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!(%turn_id, "summary worker stopped, dropping job");
                false
            }
        }
    }
}

/// Create the queue and its receiving end
pub fn summary_channel(capacity: usize) -> (SummaryQueue, mpsc::Receiver<SummaryJob>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (SummaryQueue { tx }, rx)
}

/// Spawn the worker that drains the queue
pub fn spawn_summarizer(
    rx: mpsc::Receiver<SummaryJob>,
    model: Arc<dyn ChatModel>,
    pool: PgPool,
    cipher: MessageCipher,
) -> JoinHandle<()> {
    tokio::spawn(run_worker(rx, model, pool, cipher))
}

async fn run_worker(
    mut rx: mpsc::Receiver<SummaryJob>,
    model: Arc<dyn ChatModel>,
    pool: PgPool,
    cipher: MessageCipher,
) {
    info!("summary worker started");

    while let Some(job) = rx.recv().await {
        let turn_id = job.turn_id;
        match store_summary(model.as_ref(), &pool, &cipher, &job).await {
            Ok(()) => {
                counter!("babylog_summary_jobs_completed_total").increment(1);
                debug!(%turn_id, "turn summary stored");
            }
            Err(e) => {
                counter!("babylog_summary_jobs_failed_total").increment(1);
                warn!(%turn_id, error = %e, "turn summarization failed");
            }
        }
    }

    info!("summary worker stopped");
}

async fn store_summary(
    model: &dyn ChatModel,
    pool: &PgPool,
    cipher: &MessageCipher,
    job: &SummaryJob,
) -> Result<(), SummaryError> {
    let summary = summarize_exchange(model, job).await?;
    let sealed = cipher.encrypt(&summary)?;
    ChatRepository::set_summary(pool, job.turn_id, &sealed).await?;
    Ok(())
}

/// Ask the model for a short summary of one exchange
pub async fn summarize_exchange(model: &dyn ChatModel, job: &SummaryJob) -> Result<String, SummaryError> {
    let request = ModelRequest {
        system: SUMMARY_INSTRUCTION.to_string(),
        history: Vec::new(),
        message: format!("Parent: {}\n\nAssistant: {}", job.message.trim(), job.reply.trim()),
    };

    let summary = model.complete(request).await?;
    let summary = summary.trim();
    if summary.is_empty() {
        return Err(SummaryError::Empty);
    }

    Ok(summary.chars().take(MAX_SUMMARY_CHARS).collect())
}
