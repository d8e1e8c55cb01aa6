// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::{entry_created_event, logs_event, submitted_event};

#[test]
fn serializes_with_type_tag() {
    let event = Event::QueueEntryDeleted { id: QueueEntryId::from_string("que-1") };
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["type"], "queue:deleted");
    assert_eq!(json["id"], "que-1");
}

#[test]
fn name_matches_serde_tag() {
    for event in [
        submitted_event("exe-1"),
        entry_created_event("exe-1", 1, 5),
        logs_event("exe-1", &["a"], Some(0)),
        Event::ExecutionFailed {
            id: ExecutionId::from_string("exe-1"),
            stage: ErrorStage::Build,
            error: "nope".into(),
            at_ms: 1,
        },
    ] {
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], event.name());
    }
}

#[test]
fn logs_event_omits_missing_offset() {
    let json = serde_json::to_value(logs_event("exe-1", &["x"], None)).unwrap();
    assert!(json.get("source_offset").is_none());
    let parsed: Event = serde_json::from_value(json).unwrap();
    assert_eq!(parsed, logs_event("exe-1", &["x"], None));
}

#[test]
fn execution_id_extraction() {
    assert_eq!(entry_created_event("exe-9", 1, 1).execution_id().map(|i| i.as_str()), Some("exe-9"));
    let claimed = Event::QueueEntryClaimed { id: QueueEntryId::from_string("que-9"), at_ms: 1 };
    assert!(claimed.execution_id().is_none());
}

#[test]
fn log_summary_includes_id() {
    let summary = submitted_event("exe-42").log_summary();
    assert!(summary.starts_with("execution:submitted"));
    assert!(summary.contains("exe-42"));
}
