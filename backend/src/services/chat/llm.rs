//! Hosted model client
//!
//! The chat orchestrator talks to the model through [`ChatModel`] so the
//! streaming path can be exercised without a network. [`OllamaClient`]
//! speaks the Ollama `/api/chat` protocol, which streams newline-delimited
//! JSON objects until one arrives with `"done": true`.

use async_trait::async_trait;
use babylog_shared::types::{ChatMessage, ChatRole};
use futures_util::{stream, Stream, StreamExt};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;

/// Finite, non-restartable sequence of reply fragments
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send>>;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("model returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not decode model output: {0}")]
    Decode(String),

    #[error("model reported an error: {0}")]
    Model(String),

    #[error("model stream ended before completion")]
    Truncated,

    #[error("AI assistant is disabled")]
    Disabled,
}

/// One prompt sent to the model
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    pub system: String,
    pub history: Vec<ChatMessage>,
    pub message: String,
}

impl ModelRequest {
    /// Flatten into the role-tagged list the wire protocol expects
    pub fn to_messages(&self) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(self.history.len() + 2);
        messages.push(ChatMessage {
            role: ChatRole::System,
            content: self.system.clone(),
        });
        messages.extend(
            self.history
                .iter()
                .filter(|m| m.role != ChatRole::System)
                .cloned(),
        );
        messages.push(ChatMessage {
            role: ChatRole::User,
            content: self.message.clone(),
        });
        messages
    }
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Start a streamed reply
    async fn stream_chat(&self, request: ModelRequest) -> Result<ChunkStream, LlmError>;

    /// Request a complete, non-streamed reply
    async fn complete(&self, request: ModelRequest) -> Result<String, LlmError>;
}

/// Stand-in used when `ai.enabled` is false
pub struct DisabledModel;

#[async_trait]
impl ChatModel for DisabledModel {
    async fn stream_chat(&self, _request: ModelRequest) -> Result<ChunkStream, LlmError> {
        Err(LlmError::Disabled)
    }

    async fn complete(&self, _request: ModelRequest) -> Result<String, LlmError> {
        Err(LlmError::Disabled)
    }
}

// ============================================================================
// Ollama
// ============================================================================

#[derive(Serialize)]
struct ChatBody<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatLine {
    #[serde(default)]
    message: Option<LineMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct LineMessage {
    #[serde(default)]
    content: String,
}

/// Client for an Ollama-compatible chat endpoint
#[derive(Clone, Debug)]
pub struct OllamaClient {
    base_url: String,
    model: String,
    api_key: Option<SecretString>,
    client: reqwest::Client,
}

impl OllamaClient {
    pub fn new(
        base_url: &str,
        model: impl Into<String>,
        api_key: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.into(),
            api_key,
            client,
        })
    }

    fn chat_request(&self, request: &ModelRequest, stream: bool) -> reqwest::RequestBuilder {
        let body = ChatBody {
            model: &self.model,
            messages: request.to_messages(),
            stream,
        };
        let builder = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&body);
        match &self.api_key {
            Some(key) => builder.bearer_auth(key.expose_secret()),
            None => builder,
        }
    }

    async fn send(&self, request: &ModelRequest, stream: bool) -> Result<reqwest::Response, LlmError> {
        let resp = self.chat_request(request, stream).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body: body.chars().take(256).collect(),
            });
        }
        Ok(resp)
    }
}

#[async_trait]
impl ChatModel for OllamaClient {
    async fn stream_chat(&self, request: ModelRequest) -> Result<ChunkStream, LlmError> {
        let resp = self.send(&request, true).await?;
        Ok(ndjson_chunks(Box::pin(resp.bytes_stream())))
    }

    async fn complete(&self, request: ModelRequest) -> Result<String, LlmError> {
        let resp = self.send(&request, false).await?;
        let line: ChatLine = resp
            .json()
            .await
            .map_err(|e| LlmError::Decode(e.to_string()))?;
        if let Some(err) = line.error {
            return Err(LlmError::Model(err));
        }
        Ok(line.message.map(|m| m.content).unwrap_or_default())
    }
}

// ============================================================================
// NDJSON decoding
// ============================================================================

enum LineEvent {
    Chunk(String),
    /// Final fragment; the line also carried `done`
    Last(String),
    Skip,
    Done,
}

fn parse_line(raw: &[u8]) -> Result<LineEvent, LlmError> {
    let text = std::str::from_utf8(raw).map_err(|e| LlmError::Decode(e.to_string()))?;
    let text = text.trim();
    if text.is_empty() {
        return Ok(LineEvent::Skip);
    }

    let line: ChatLine = serde_json::from_str(text).map_err(|e| LlmError::Decode(e.to_string()))?;
    if let Some(err) = line.error {
        return Err(LlmError::Model(err));
    }

    let content = line.message.map(|m| m.content).unwrap_or_default();
    match (content.is_empty(), line.done) {
        (false, true) => Ok(LineEvent::Last(content)),
        (false, false) => Ok(LineEvent::Chunk(content)),
        (true, true) => Ok(LineEvent::Done),
        (true, false) => Ok(LineEvent::Skip),
    }
}

struct NdjsonState<S> {
    inner: S,
    buffer: Vec<u8>,
    finished: bool,
}

/// Turn a byte stream of NDJSON chat lines into text fragments
///
/// A line carrying both content and `done` yields its content and ends the
/// stream, with or without a trailing newline. A body that ends without a `done`
/// line yields [`LlmError::Truncated`].
pub(crate) fn ndjson_chunks<S, B, E>(inner: S) -> ChunkStream
where
    S: Stream<Item = Result<B, E>> + Send + Unpin + 'static,
    B: AsRef<[u8]>,
    E: Into<LlmError>,
{
    let state = NdjsonState {
        inner,
        buffer: Vec::new(),
        finished: false,
    };

    let chunks = stream::unfold(state, |mut st| async move {
        loop {
            if st.finished {
                return None;
            }

            if let Some(pos) = st.buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = st.buffer.drain(..=pos).collect();
                match parse_line(&line) {
                    Ok(LineEvent::Chunk(text)) => return Some((Ok(text), st)),
                    Ok(LineEvent::Last(text)) => {
                        st.finished = true;
                        return Some((Ok(text), st));
                    }
                    Ok(LineEvent::Skip) => continue,
                    Ok(LineEvent::Done) => {
                        st.finished = true;
                        return None;
                    }
                    Err(e) => {
                        st.finished = true;
                        return Some((Err(e), st));
                    }
                }
            }

            match st.inner.next().await {
                Some(Ok(bytes)) => st.buffer.extend_from_slice(bytes.as_ref()),
                Some(Err(e)) => {
                    st.finished = true;
                    return Some((Err(e.into()), st));
                }
                None => {
                    st.finished = true;
                    let rest = std::mem::take(&mut st.buffer);
                    return match parse_line(&rest) {
                        Ok(LineEvent::Done) => None,
                        Ok(LineEvent::Last(text)) => Some((Ok(text), st)),
                        Ok(LineEvent::Chunk(_)) | Ok(LineEvent::Skip) => {
                            Some((Err(LlmError::Truncated), st))
                        }
                        Err(e) => Some((Err(e), st)),
                    };
                }
            }
        }
    });

    Box::pin(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> ModelRequest {
        ModelRequest {
            system: "You are a pediatric assistant.".to_string(),
            history: vec![ChatMessage {
                role: ChatRole::Assistant,
                content: "Hello".to_string(),
            }],
            message: "How much should she eat?".to_string(),
        }
    }

    async fn collect(stream: ChunkStream) -> Vec<Result<String, LlmError>> {
        stream.collect().await
    }

    fn bytes_of(parts: &[&str]) -> impl Stream<Item = Result<Vec<u8>, LlmError>> + Send + Unpin {
        let owned: Vec<Result<Vec<u8>, LlmError>> =
            parts.iter().map(|p| Ok(p.as_bytes().to_vec())).collect();
        stream::iter(owned)
    }

    #[test]
    fn test_request_orders_system_history_then_message() {
        let messages = request().to_messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, ChatRole::System);
        assert_eq!(messages[1].content, "Hello");
        assert_eq!(messages[2].role, ChatRole::User);
    }

    #[tokio::test]
    async fn test_ndjson_split_across_reads() {
        let body = bytes_of(&[
            "{\"message\":{\"content\":\"Hel\"},\"done\":false}\n{\"mess",
            "age\":{\"content\":\"lo\"},\"done\":false}\n",
            "{\"done\":true}\n",
        ]);
        let out: Vec<String> = collect(ndjson_chunks(body))
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(out, vec!["Hel", "lo"]);
    }

    #[tokio::test]
    async fn test_final_line_with_content_and_done() {
        for last in [
            "{\"message\":{\"content\":\"120 ml\"},\"done\":true}\n",
            "{\"message\":{\"content\":\"120 ml\"},\"done\":true}",
        ] {
            let body = bytes_of(&["{\"message\":{\"content\":\"Around \"},\"done\":false}\n", last]);
            let out = collect(ndjson_chunks(body)).await;
            assert!(out.iter().all(|r| r.is_ok()), "unexpected error for {:?}", last);
            let text: Vec<String> = out.into_iter().map(|r| r.unwrap()).collect();
            assert_eq!(text, vec!["Around ", "120 ml"]);
        }
    }

    #[tokio::test]
    async fn test_lines_after_done_are_ignored() {
        let body = bytes_of(&[
            "{\"message\":{\"content\":\"Done.\"},\"done\":true}\n",
            "{\"message\":{\"content\":\"extra\"},\"done\":false}\n",
        ]);
        let text: Vec<String> = collect(ndjson_chunks(body))
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(text, vec!["Done."]);
    }

    #[tokio::test]
    async fn test_missing_done_is_truncated() {
        let body = bytes_of(&["{\"message\":{\"content\":\"partial\"},\"done\":false}\n"]);
        let out = collect(ndjson_chunks(body)).await;
        assert_eq!(out.len(), 2);
        assert!(matches!(out[1], Err(LlmError::Truncated)));
    }

    #[tokio::test]
    async fn test_error_line_surfaces() {
        let body = bytes_of(&["{\"error\":\"model not found\"}\n"]);
        let out = collect(ndjson_chunks(body)).await;
        assert!(matches!(&out[0], Err(LlmError::Model(msg)) if msg == "model not found"));
    }

    #[tokio::test]
    async fn test_streams_from_server() {
        let server = MockServer::start().await;
        let body = "{\"message\":{\"role\":\"assistant\",\"content\":\"Around \"},\"done\":false}\n\
                    {\"message\":{\"role\":\"assistant\",\"content\":\"120 ml\"},\"done\":false}\n\
                    {\"message\":{\"role\":\"assistant\",\"content\":\"\"},\"done\":true}\n";
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(header("authorization", "Bearer secret-token"))
            .and(body_partial_json(serde_json::json!({"model": "llama3.2", "stream": true})))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .expect(1)
            .mount(&server)
            .await;

        let client = OllamaClient::new(
            &server.uri(),
            "llama3.2",
            Some(SecretString::new("secret-token".to_string())),
            Duration::from_secs(5),
        )
        .unwrap();

        let stream = client.stream_chat(request()).await.unwrap();
        let text: String = collect(stream)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(text, "Around 120 ml");
    }

    #[tokio::test]
    async fn test_server_body_ending_on_content_done_line() {
        let server = MockServer::start().await;
        let body = "{\"message\":{\"role\":\"assistant\",\"content\":\"Around \"},\"done\":false}\n\
                    {\"message\":{\"role\":\"assistant\",\"content\":\"120 ml\"},\"done\":true}";
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let client =
            OllamaClient::new(&server.uri(), "llama3.2", None, Duration::from_secs(5)).unwrap();
        let out = collect(client.stream_chat(request()).await.unwrap()).await;
        assert!(out.iter().all(|r| r.is_ok()));
        let text: String = out.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(text, "Around 120 ml");
    }

    #[tokio::test]
    async fn test_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let client =
            OllamaClient::new(&server.uri(), "llama3.2", None, Duration::from_secs(5)).unwrap();
        let err = client.complete(request()).await.unwrap_err();
        assert!(matches!(err, LlmError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_complete_returns_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(serde_json::json!({"stream": false})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "message": {"role": "assistant", "content": "Asked about feeding volume."},
                "done": true
            })))
            .mount(&server)
            .await;

        let client =
            OllamaClient::new(&server.uri(), "llama3.2", None, Duration::from_secs(5)).unwrap();
        assert_eq!(
            client.complete(request()).await.unwrap(),
            "Asked about feeding volume."
        );
    }

    #[tokio::test]
    async fn test_disabled_model_refuses() {
        assert!(matches!(
            DisabledModel.stream_chat(request()).await,
            Err(LlmError::Disabled)
        ));
    }
}
