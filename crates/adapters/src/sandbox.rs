// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client for a managed agent-runtime service.
//!
//! - `POST {endpoint}/invoke {runtimeId, prompt, sessionId}` → `{output, sessionId, metadata}`
//! - `GET {endpoint}/status/{runtimeId}` → `{state, endpoint}`

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("sandbox returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("request failed: {0}")]
    Transport(String),
    #[error("invalid response: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvokeRequest {
    pub runtime_id: String,
    pub prompt: String,
    pub session_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvokeReply {
    #[serde(default)]
    pub output: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeStatus {
    pub state: String,
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl RuntimeStatus {
    pub fn is_ready(&self) -> bool {
        self.state.eq_ignore_ascii_case("ready")
    }
}

/// Adapter for the managed sandbox service
#[async_trait]
pub trait SandboxClient: Send + Sync + 'static {
    async fn invoke(
        &self,
        endpoint: &str,
        request: &InvokeRequest,
        timeout: Duration,
    ) -> Result<InvokeReply, SandboxError>;

    async fn status(&self, endpoint: &str, runtime_id: &str) -> Result<RuntimeStatus, SandboxError>;
}

const STATUS_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Default)]
pub struct HttpSandboxClient {
    client: reqwest::Client,
}

impl HttpSandboxClient {
    pub fn new() -> Self {
        Self::default()
    }

    async fn read<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, SandboxError> {
        let status = response.status();
        let body = response.text().await.map_err(|e| SandboxError::Transport(e.to_string()))?;
        if !status.is_success() {
            return Err(SandboxError::Http { status: status.as_u16(), body });
        }
        serde_json::from_str(&body).map_err(|e| SandboxError::Decode(e.to_string()))
    }
}

fn transport(timeout: Duration) -> impl Fn(reqwest::Error) -> SandboxError {
    move |e| {
        if e.is_timeout() {
            SandboxError::Timeout(timeout)
        } else {
            SandboxError::Transport(e.to_string())
        }
    }
}

#[async_trait]
impl SandboxClient for HttpSandboxClient {
    async fn invoke(
        &self,
        endpoint: &str,
        request: &InvokeRequest,
        timeout: Duration,
    ) -> Result<InvokeReply, SandboxError> {
        let url = format!("{}/invoke", endpoint.trim_end_matches('/'));
        let start = std::time::Instant::now();
        let response = self
            .client
            .post(&url)
            .timeout(timeout)
            .json(request)
            .send()
            .await
            .map_err(transport(timeout))?;
        let result = Self::read(response).await;
        tracing::info!(
            runtime_id = %request.runtime_id,
            session_id = %request.session_id,
            elapsed_ms = start.elapsed().as_millis() as u64,
            ok = result.is_ok(),
            "sandbox invoke finished"
        );
        result
    }

    async fn status(&self, endpoint: &str, runtime_id: &str) -> Result<RuntimeStatus, SandboxError> {
        let url = format!("{}/status/{}", endpoint.trim_end_matches('/'), runtime_id);
        let response = self
            .client
            .get(&url)
            .timeout(STATUS_TIMEOUT)
            .send()
            .await
            .map_err(transport(STATUS_TIMEOUT))?;
        Self::read(response).await
    }
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::{InvokeReply, InvokeRequest, RuntimeStatus, SandboxClient, SandboxError};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::time::Duration;

    struct FakeSandboxState {
        invocations: Vec<InvokeRequest>,
        replies: VecDeque<Result<String, String>>,
        state: String,
    }

    /// Fake sandbox service. Unscripted invocations answer `"ok"`.
    #[derive(Clone)]
    pub struct FakeSandboxClient {
        inner: Arc<Mutex<FakeSandboxState>>,
    }

    impl Default for FakeSandboxClient {
        fn default() -> Self {
            Self {
                inner: Arc::new(Mutex::new(FakeSandboxState {
                    invocations: Vec::new(),
                    replies: VecDeque::new(),
                    state: "READY".to_string(),
                })),
            }
        }
    }

    impl FakeSandboxClient {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn reply(&self, output: &str) {
            self.inner.lock().replies.push_back(Ok(output.to_string()));
        }

        pub fn fail(&self, error: &str) {
            self.inner.lock().replies.push_back(Err(error.to_string()));
        }

        pub fn set_state(&self, state: &str) {
            self.inner.lock().state = state.to_string();
        }

        pub fn invocations(&self) -> Vec<InvokeRequest> {
            self.inner.lock().invocations.clone()
        }
    }

    #[async_trait]
    impl SandboxClient for FakeSandboxClient {
        async fn invoke(
            &self,
            _endpoint: &str,
            request: &InvokeRequest,
            _timeout: Duration,
        ) -> Result<InvokeReply, SandboxError> {
            let mut inner = self.inner.lock();
            inner.invocations.push(request.clone());
            match inner.replies.pop_front().unwrap_or_else(|| Ok("ok".to_string())) {
                Ok(output) => Ok(InvokeReply {
                    output,
                    session_id: Some(request.session_id.clone()),
                    metadata: serde_json::Value::Null,
                }),
                Err(e) => Err(SandboxError::Http { status: 500, body: e }),
            }
        }

        async fn status(
            &self,
            endpoint: &str,
            _runtime_id: &str,
        ) -> Result<RuntimeStatus, SandboxError> {
            Ok(RuntimeStatus {
                state: self.inner.lock().state.clone(),
                endpoint: Some(endpoint.to_string()),
            })
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeSandboxClient;

#[cfg(test)]
#[path = "sandbox_tests.rs"]
mod tests;
