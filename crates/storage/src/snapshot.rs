// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Point-in-time copies of the materialized state.
//!
//! Snapshots are zstd-compressed JSON written through a temp file and an
//! atomic rename. `seq` is the last WAL sequence the state includes.

use crate::state::MaterializedState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;
use thiserror::Error;

pub const CURRENT_SNAPSHOT_VERSION: u32 = 1;

const ZSTD_LEVEL: i32 = 3;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("snapshot version {0} is newer than supported version {1}")]
    TooNew(u32, u32),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(rename = "v")]
    pub version: u32,
    pub seq: u64,
    pub state: MaterializedState,
    pub created_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(seq: u64, state: MaterializedState) -> Self {
        Self { version: CURRENT_SNAPSHOT_VERSION, seq, state, created_at: Utc::now() }
    }

    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        let tmp = path.with_extension("tmp");
        {
            let file = File::create(&tmp)?;
            let mut encoder = zstd::Encoder::new(BufWriter::new(file), ZSTD_LEVEL)?;
            serde_json::to_writer(&mut encoder, self)?;
            let mut inner = encoder.finish()?;
            inner.flush()?;
            inner.get_ref().sync_all()?;
        }
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Load a snapshot, or `None` if no file exists.
    pub fn load(path: &Path) -> Result<Option<Self>, SnapshotError> {
        if !path.exists() {
            return Ok(None);
        }
        let decoder = zstd::Decoder::new(BufReader::new(File::open(path)?))?;
        let snapshot: Snapshot = serde_json::from_reader(decoder)?;
        if snapshot.version > CURRENT_SNAPSHOT_VERSION {
            return Err(SnapshotError::TooNew(snapshot.version, CURRENT_SNAPSHOT_VERSION));
        }
        Ok(Some(snapshot))
    }
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
