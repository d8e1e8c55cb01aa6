// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Managed sandbox backend: invoke a remote runtime under a fresh session.

use crate::error::{DispatchError, RuntimeError};
use crate::runtime::Runtime;
use arq_adapters::{InvokeRequest, RuntimeStatus};
use arq_core::{
    BackendHandles, Clock, ErrorStage, Execution, ExecutionStatus, SandboxJobConfig,
};
use std::time::{Duration, Instant};
use uuid::Uuid;

impl<C: Clock> Runtime<C> {
    pub(crate) async fn run_sandbox(
        &self,
        exe: &Execution,
        job: &SandboxJobConfig,
    ) -> Result<(), DispatchError> {
        let id = &exe.id;
        if !self.recorder.update_status(id, ExecutionStatus::Running)? {
            return Ok(());
        }

        let session_id = Uuid::new_v4().to_string();
        let handles = BackendHandles {
            runtime_id: Some(job.runtime_id.clone()),
            session_id: Some(session_id.clone()),
            ..Default::default()
        };
        self.recorder.attach_backend(id, handles, None, None)?;
        self.recorder.note(id, format!("invoking sandbox runtime {}", job.runtime_id))?;

        let request = InvokeRequest {
            runtime_id: job.runtime_id.clone(),
            prompt: exe.query.clone(),
            session_id,
        };
        let start = Instant::now();
        let result =
            self.sandbox.invoke(&job.endpoint, &request, Duration::from_millis(exe.timeout_ms)).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;
        match result {
            Ok(reply) => {
                tracing::info!(execution_id = %id, elapsed_ms, "sandbox invocation returned");
                if !self.recorder.complete(id, Some(reply.output), None)? {
                    tracing::debug!(execution_id = %id, "late sandbox reply discarded");
                }
            }
            Err(e) => {
                tracing::warn!(execution_id = %id, elapsed_ms, error = %e, "sandbox invocation failed");
                self.recorder.note(id, format!("sandbox invocation failed: {e}"))?;
                self.recorder.fail(id, ErrorStage::Execution, e.to_string())?;
            }
        }
        Ok(())
    }

    /// Readiness of a remote runtime, independent of any execution.
    pub async fn sandbox_status(
        &self,
        endpoint: &str,
        runtime_id: &str,
    ) -> Result<RuntimeStatus, RuntimeError> {
        Ok(self.sandbox.status(endpoint, runtime_id).await?)
    }
}
