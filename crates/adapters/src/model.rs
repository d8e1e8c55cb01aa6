// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client for a locally reachable model server.
//!
//! One blocking chat call per execution:
//! `POST {endpoint}/chat {model, messages, stream: false, options: {temperature}}`
//! returning `{message: {content}, prompt_eval_count, eval_count}`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelClientError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("model server returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("request failed: {0}")]
    Transport(String),
    #[error("invalid response: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    /// The call aborts itself past this deadline
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatReply {
    pub content: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

#[derive(Serialize)]
pub(crate) struct WireRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    options: WireOptions,
}

#[derive(Serialize)]
pub(crate) struct WireOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct WireReply {
    message: WireMessage,
    #[serde(default)]
    prompt_eval_count: u64,
    #[serde(default)]
    eval_count: u64,
}

#[derive(Deserialize)]
struct WireMessage {
    #[serde(default)]
    content: String,
}

pub(crate) fn request_body(request: &ChatRequest) -> WireRequest<'_> {
    WireRequest {
        model: &request.model,
        messages: &request.messages,
        stream: false,
        options: WireOptions { temperature: request.temperature },
    }
}

pub(crate) fn parse_reply(body: &str) -> Result<ChatReply, ModelClientError> {
    let reply: WireReply =
        serde_json::from_str(body).map_err(|e| ModelClientError::Decode(e.to_string()))?;
    Ok(ChatReply {
        content: reply.message.content,
        prompt_tokens: reply.prompt_eval_count,
        completion_tokens: reply.eval_count,
    })
}

/// Adapter for a chat-style model endpoint
#[async_trait]
pub trait ModelClient: Send + Sync + 'static {
    async fn chat(&self, endpoint: &str, request: &ChatRequest) -> Result<ChatReply, ModelClientError>;
}

#[derive(Clone, Default)]
pub struct HttpModelClient {
    client: reqwest::Client,
}

impl HttpModelClient {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ModelClient for HttpModelClient {
    async fn chat(&self, endpoint: &str, request: &ChatRequest) -> Result<ChatReply, ModelClientError> {
        let url = format!("{}/chat", endpoint.trim_end_matches('/'));
        let start = std::time::Instant::now();
        let response = self
            .client
            .post(&url)
            .timeout(request.timeout)
            .json(&request_body(request))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ModelClientError::Timeout(request.timeout)
                } else {
                    ModelClientError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| ModelClientError::Transport(e.to_string()))?;
        let elapsed_ms = start.elapsed().as_millis() as u64;
        if !status.is_success() {
            tracing::warn!(%url, status = status.as_u16(), elapsed_ms, "model call failed");
            return Err(ModelClientError::Http { status: status.as_u16(), body });
        }
        tracing::info!(%url, model = %request.model, elapsed_ms, "model call completed");
        parse_reply(&body)
    }
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::{ChatReply, ChatRequest, ModelClient, ModelClientError};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::Arc;

    #[derive(Default)]
    struct FakeModelState {
        calls: Vec<(String, ChatRequest)>,
        replies: VecDeque<Result<ChatReply, String>>,
    }

    /// Fake model client. Replies are scripted; unscripted calls echo the
    /// last message back.
    #[derive(Clone, Default)]
    pub struct FakeModelClient {
        inner: Arc<Mutex<FakeModelState>>,
    }

    impl FakeModelClient {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn reply(&self, content: &str, prompt_tokens: u64, completion_tokens: u64) {
            self.inner.lock().replies.push_back(Ok(ChatReply {
                content: content.to_string(),
                prompt_tokens,
                completion_tokens,
            }));
        }

        pub fn fail(&self, error: &str) {
            self.inner.lock().replies.push_back(Err(error.to_string()));
        }

        /// Recorded `(endpoint, request)` pairs.
        pub fn calls(&self) -> Vec<(String, ChatRequest)> {
            self.inner.lock().calls.clone()
        }
    }

    #[async_trait]
    impl ModelClient for FakeModelClient {
        async fn chat(
            &self,
            endpoint: &str,
            request: &ChatRequest,
        ) -> Result<ChatReply, ModelClientError> {
            let mut inner = self.inner.lock();
            inner.calls.push((endpoint.to_string(), request.clone()));
            match inner.replies.pop_front() {
                Some(Ok(reply)) => Ok(reply),
                Some(Err(e)) => Err(ModelClientError::Transport(e)),
                None => Ok(ChatReply {
                    content: request.messages.last().map(|m| m.content.clone()).unwrap_or_default(),
                    prompt_tokens: 0,
                    completion_tokens: 0,
                }),
            }
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeModelClient;

#[cfg(test)]
#[path = "model_tests.rs"]
mod tests;
