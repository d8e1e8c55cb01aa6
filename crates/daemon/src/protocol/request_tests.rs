// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    ping = { r#"{"type":"Ping"}"#, Request::Ping },
    list = { r#"{"type":"List"}"#, Request::List },
    shutdown = { r#"{"type":"Shutdown"}"#, Request::Shutdown },
    cancel = { r#"{"type":"Cancel","id":"exe-1"}"#, Request::Cancel { id: "exe-1".to_string() } },
    get = { r#"{"type":"Get","id":"exe"}"#, Request::Get { id: "exe".to_string() } },
)]
fn parses_tagged_json(json: &str, expected: Request) {
    let parsed: Request = serde_json::from_str(json).unwrap();
    assert_eq!(parsed, expected);
}

#[test]
fn submit_fills_submission_defaults() {
    let json = r#"{
        "type": "Submit",
        "submission": {
            "agent_id": "agent-1",
            "user_id": "u",
            "query": "hello",
            "timeout_ms": 60000,
            "provider": "managed-container"
        }
    }"#;

    let Request::Submit { submission } = serde_json::from_str::<Request>(json).unwrap() else {
        panic!("expected Submit");
    };
    assert_eq!(submission.agent_id, "agent-1");
    assert_eq!(submission.priority, 1);
    assert!(submission.system_prompt.is_none());
    assert_eq!(submission.bundle.code, "");
}

#[test]
fn sandbox_status_uses_named_fields() {
    let request =
        Request::SandboxStatus { endpoint: "http://sb".to_string(), runtime_id: "rt-1".to_string() };
    let json = serde_json::to_value(&request).unwrap();
    assert_eq!(json["type"], "SandboxStatus");
    assert_eq!(json["runtime_id"], "rt-1");
}

#[test]
fn summary_omits_the_bundle() {
    let submission = arq_core::Submission::new("agent-9", "local-model").query("secret query");
    let request = Request::Submit { submission: Box::new(submission) };

    let summary = request.summary();
    assert_eq!(summary, "submit agent=agent-9 provider=local-model");
    assert!(!summary.contains("secret"));
}
