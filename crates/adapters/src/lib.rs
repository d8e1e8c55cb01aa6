// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! arq-adapters: clients for the platforms executions run on

pub mod container;
pub mod model;
pub mod sandbox;

pub use container::{
    ContainerError, ContainerPlatform, DockerPlatform, KubernetesPlatform, TaskHandle, TaskRequest,
    TaskStatus,
};
pub use model::{ChatMessage, ChatReply, ChatRequest, HttpModelClient, ModelClient, ModelClientError};
pub use sandbox::{
    HttpSandboxClient, InvokeReply, InvokeRequest, RuntimeStatus, SandboxClient, SandboxError,
};

#[cfg(any(test, feature = "test-support"))]
pub use container::{ContainerCall, FakeContainerPlatform};
#[cfg(any(test, feature = "test-support"))]
pub use model::FakeModelClient;
#[cfg(any(test, feature = "test-support"))]
pub use sandbox::FakeSandboxClient;
