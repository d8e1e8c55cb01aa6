// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    first_failure = { 0, Some(1) },
    second_failure = { 1, Some(2) },
    third_failure = { 2, None },
    past_budget = { 3, None },
)]
fn retry_budget(attempts: u32, expected: Option<u32>) {
    assert_eq!(next_attempt(attempts), expected);
}

#[test]
fn retry_keeps_priority_and_execution() {
    let entry = QueueEntry::builder().priority(0).status(QueueEntryStatus::Claimed).build();
    let retry = entry.retry(1, "launch failed", 2_000_000);

    assert_ne!(retry.id, entry.id);
    assert_eq!(retry.execution_id, entry.execution_id);
    assert_eq!(retry.priority, 0);
    assert_eq!(retry.attempts, 1);
    assert!(retry.is_pending());
    assert_eq!(retry.created_at_ms, 2_000_000);
    assert_eq!(retry.last_error.as_deref(), Some("launch failed"));
}

#[test]
fn claimed_before_ignores_pending() {
    let pending = QueueEntry::builder().build();
    assert!(!pending.claimed_before(u64::MAX));

    let claimed =
        QueueEntry::builder().status(QueueEntryStatus::Claimed).claimed_at_ms(100u64).build();
    assert!(claimed.claimed_before(100));
    assert!(!claimed.claimed_before(99));
}

#[test]
fn order_key_prefers_priority_then_age() {
    let mut entries = vec![
        QueueEntry::builder().id("que-a").priority(2).created_at_ms(1).build(),
        QueueEntry::builder().id("que-b").priority(2).created_at_ms(2).build(),
        QueueEntry::builder().id("que-c").priority(1).created_at_ms(3).build(),
    ];
    entries.sort_by(|a, b| a.order_key().cmp(&b.order_key()));
    let ids: Vec<&str> = entries.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["que-c", "que-a", "que-b"]);
}
