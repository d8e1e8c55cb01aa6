// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local model backend: one synchronous chat call per execution.

use crate::error::DispatchError;
use crate::runtime::Runtime;
use arq_adapters::{ChatMessage, ChatRequest};
use arq_core::{Clock, ErrorStage, Execution, ExecutionStatus, LocalModelConfig, TokenUsage};
use std::time::{Duration, Instant};

impl<C: Clock> Runtime<C> {
    pub(crate) async fn run_local(
        &self,
        exe: &Execution,
        job: &LocalModelConfig,
    ) -> Result<(), DispatchError> {
        let id = &exe.id;
        if !self.recorder.update_status(id, ExecutionStatus::Running)? {
            return Ok(());
        }
        self.recorder.note(id, format!("calling local model {}", job.model))?;

        let mut messages = Vec::with_capacity(2);
        if let Some(prompt) = exe.system_prompt.as_deref().filter(|p| !p.trim().is_empty()) {
            messages.push(ChatMessage::system(prompt));
        }
        messages.push(ChatMessage::user(exe.query.as_str()));
        let request = ChatRequest {
            model: job.model.clone(),
            messages,
            temperature: job.temperature,
            timeout: Duration::from_millis(exe.timeout_ms),
        };

        let start = Instant::now();
        match self.models.chat(&job.endpoint, &request).await {
            Ok(reply) => {
                let usage = TokenUsage {
                    prompt_tokens: reply.prompt_tokens,
                    completion_tokens: reply.completion_tokens,
                };
                tracing::info!(
                    execution_id = %id,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    completion_tokens = usage.completion_tokens,
                    "local model replied"
                );
                self.recorder.note(
                    id,
                    format!(
                        "model replied ({} prompt / {} completion tokens)",
                        usage.prompt_tokens, usage.completion_tokens
                    ),
                )?;
                if !self.recorder.complete(id, Some(reply.content), Some(usage))? {
                    tracing::debug!(execution_id = %id, "late model reply discarded");
                }
            }
            Err(e) => {
                self.recorder.note(id, format!("model call failed: {e}"))?;
                self.recorder.fail(id, ErrorStage::Execution, e.to_string())?;
            }
        }
        Ok(())
    }
}
