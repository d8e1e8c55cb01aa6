// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Provider routing

use super::Runtime;
use crate::error::DispatchError;
use arq_core::{BackendConfig, Clock, Execution};

impl<C: Clock> Runtime<C> {
    /// Hand a claimed execution to the backend its provider names.
    ///
    /// `Ok` means the backend accepted the job (it may since have finished).
    /// An unknown provider or malformed provider config is a non-retryable
    /// `service` failure.
    pub(crate) async fn dispatch(&self, exe: &Execution) -> Result<(), DispatchError> {
        let backend = BackendConfig::resolve(&exe.provider, &exe.model_config)
            .map_err(|e| DispatchError::config(e.to_string()))?;
        tracing::debug!(execution_id = %exe.id, provider = backend.provider(), "dispatching");
        match backend {
            BackendConfig::LocalModel(job) => self.run_local(exe, &job).await,
            BackendConfig::ManagedContainer(job) => self.launch_container(exe, &job).await,
            BackendConfig::ManagedSandbox(job) => self.run_sandbox(exe, &job).await,
        }
    }
}
