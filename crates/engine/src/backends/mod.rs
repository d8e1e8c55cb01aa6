// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Backend adapters, one per provider

pub(crate) mod container;
mod local;
mod sandbox;

pub use container::{scan_markers, Completion, TIMEOUT_ERROR};
