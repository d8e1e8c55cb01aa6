// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Write-ahead log of store events.
//!
//! One JSON object per line: `{"seq":N,"event":{...}}`. Appends are
//! buffered in memory until [`Wal::flush`], which writes and fsyncs them.
//! A corrupt tail found on open is preserved in a rotated `.bak` file and
//! the valid prefix is kept.

use arq_core::Event;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Number of rotated `.bak` files kept for corrupt logs.
const MAX_BAK_FILES: usize = 3;

#[derive(Debug, Error)]
pub enum WalError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalEntry {
    pub seq: u64,
    pub event: Event,
}

pub struct Wal {
    path: PathBuf,
    file: File,
    buffer: Vec<WalEntry>,
    write_seq: u64,
}

impl Wal {
    /// Open or create the log at `path`, recovering the highest valid sequence.
    pub fn open(path: &Path) -> Result<Self, WalError> {
        let (entries, corrupt) = if path.exists() { read_entries(path)? } else { (Vec::new(), false) };

        if corrupt {
            let bak = rotate_bak_path(path);
            tracing::warn!(
                path = %path.display(),
                bak = %bak.display(),
                valid = entries.len(),
                "corrupt WAL tail, keeping valid prefix"
            );
            fs::copy(path, &bak)?;
            rewrite(path, &entries)?;
        }

        let write_seq = entries.last().map(|e| e.seq).unwrap_or(0);
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { path: path.to_path_buf(), file, buffer: Vec::new(), write_seq })
    }

    /// Buffer an event and return its sequence number.
    pub fn append(&mut self, event: &Event) -> Result<u64, WalError> {
        self.write_seq += 1;
        self.buffer.push(WalEntry { seq: self.write_seq, event: event.clone() });
        Ok(self.write_seq)
    }

    pub fn flush(&mut self) -> Result<(), WalError> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let mut out = Vec::new();
        for entry in &self.buffer {
            serde_json::to_writer(&mut out, entry)?;
            out.push(b'\n');
        }
        self.file.write_all(&out)?;
        self.file.sync_data()?;
        self.buffer.clear();
        Ok(())
    }

    pub fn write_seq(&self) -> u64 {
        self.write_seq
    }

    /// All durable and buffered entries with `seq > after`, in order.
    ///
    /// Reading stops at the first unparseable line.
    pub fn entries_after(&self, after: u64) -> Result<Vec<WalEntry>, WalError> {
        let (mut entries, _) = read_entries(&self.path)?;
        entries.retain(|e| e.seq > after);
        entries.extend(self.buffer.iter().filter(|e| e.seq > after).cloned());
        Ok(entries)
    }

    /// Drop entries with `seq < before`. Used after a snapshot covers them.
    pub fn truncate_before(&mut self, before: u64) -> Result<(), WalError> {
        self.flush()?;
        let (mut entries, _) = read_entries(&self.path)?;
        entries.retain(|e| e.seq >= before);
        rewrite(&self.path, &entries)?;
        self.file = OpenOptions::new().append(true).open(&self.path)?;
        Ok(())
    }
}

/// Parse entries until the first bad line. Returns `(entries, corrupt)`.
fn read_entries(path: &Path) -> Result<(Vec<WalEntry>, bool), WalError> {
    let reader = BufReader::new(File::open(path)?);
    let mut entries = Vec::new();
    for line in reader.split(b'\n') {
        let line = line?;
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        match serde_json::from_slice::<WalEntry>(&line) {
            Ok(entry) => entries.push(entry),
            Err(_) => return Ok((entries, true)),
        }
    }
    Ok((entries, false))
}

/// Atomically replace the log with `entries` via a temp file and rename.
fn rewrite(path: &Path, entries: &[WalEntry]) -> Result<(), WalError> {
    let tmp = path.with_extension("tmp");
    {
        let mut file = File::create(&tmp)?;
        for entry in entries {
            serde_json::to_writer(&mut file, entry)?;
            file.write_all(b"\n")?;
        }
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Shift existing backups up one slot (`.bak` → `.bak.2` → `.bak.3`) and
/// return the freed `.bak` path. The oldest is dropped past [`MAX_BAK_FILES`].
pub(crate) fn rotate_bak_path(path: &Path) -> PathBuf {
    let slot = |n: usize| {
        if n == 1 {
            path.with_extension("bak")
        } else {
            path.with_extension(format!("bak.{n}"))
        }
    };
    let _ = fs::remove_file(slot(MAX_BAK_FILES));
    for n in (1..MAX_BAK_FILES).rev() {
        let from = slot(n);
        if from.exists() {
            let _ = fs::rename(&from, slot(n + 1));
        }
    }
    slot(1)
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod tests;
