// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime error types

use arq_core::ErrorStage;
use arq_storage::StoreError;
use thiserror::Error;

/// Errors that can occur in the runtime
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("execution not found: {0}")]
    ExecutionNotFound(String),
    #[error("sandbox error: {0}")]
    Sandbox(#[from] arq_adapters::SandboxError),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Why a claimed execution could not be handed to its backend.
///
/// `message` is what ends up in the execution's `error` field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{stage} failure: {message}")]
pub struct DispatchError {
    pub stage: ErrorStage,
    pub message: String,
    pub retryable: bool,
}

impl DispatchError {
    /// Launch or provisioning failure; worth another attempt.
    pub fn build(message: impl Into<String>) -> Self {
        Self { stage: ErrorStage::Build, message: message.into(), retryable: true }
    }

    /// Bad provider or provider configuration; retrying cannot help.
    pub fn config(message: impl Into<String>) -> Self {
        Self { stage: ErrorStage::Service, message: message.into(), retryable: false }
    }
}

impl From<RuntimeError> for DispatchError {
    fn from(e: RuntimeError) -> Self {
        Self { stage: ErrorStage::Service, message: e.to_string(), retryable: true }
    }
}
