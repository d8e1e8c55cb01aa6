// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::{ExecutionId, QueueEntryId};

#[test]
fn generated_ids_carry_prefix_and_fit_inline() {
    let id = ExecutionId::new();
    assert!(id.as_str().starts_with("exe-"));
    assert_eq!(id.as_str().len(), 23);

    let entry = QueueEntryId::new();
    assert!(entry.as_str().starts_with("que-"));
}

#[test]
fn generated_ids_are_unique() {
    assert_ne!(ExecutionId::new(), ExecutionId::new());
}

#[test]
fn suffix_and_short_strip_prefix() {
    let id = ExecutionId::from_string("exe-abcdef123");
    assert_eq!(id.suffix(), "abcdef123");
    assert_eq!(id.short(4), "abcd");
    assert_eq!(id.short(100), "abcdef123");
}

#[test]
fn serde_is_transparent() {
    let id = ExecutionId::from_string("exe-1");
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"exe-1\"");
    let parsed: ExecutionId = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, id);
}

#[yare::parameterized(
    exact = { "exe-abc", "exe-abc", true },
    full_prefix = { "exe-abc", "exe-a", true },
    suffix_prefix = { "exe-abc", "ab", true },
    mismatch = { "exe-abc", "xyz", false },
    empty_query = { "exe-abc", "", false },
)]
fn prefix_matching(key: &str, query: &str, expected: bool) {
    assert_eq!(prefix_matches(key, query), expected);
}

#[test]
fn short_handles_multibyte() {
    assert_eq!(short("héllo", 2), "hé");
    assert_eq!(short("ab", 5), "ab");
}
