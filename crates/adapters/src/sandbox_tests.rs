// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn invoke_request_uses_camel_case() {
    let req = InvokeRequest {
        runtime_id: "rt-1".to_string(),
        prompt: "hello".to_string(),
        session_id: "s-1".to_string(),
    };
    let json = serde_json::to_value(&req).unwrap();
    assert_eq!(json["runtimeId"], "rt-1");
    assert_eq!(json["sessionId"], "s-1");
}

#[test]
fn invoke_reply_tolerates_missing_fields() {
    let reply: InvokeReply = serde_json::from_str(r#"{"output":"done"}"#).unwrap();
    assert_eq!(reply.output, "done");
    assert!(reply.session_id.is_none());
}

#[yare::parameterized(
    upper = { "READY", true },
    lower = { "ready", true },
    creating = { "CREATING", false },
)]
fn readiness(state: &str, ready: bool) {
    let status = RuntimeStatus { state: state.to_string(), endpoint: None };
    assert_eq!(status.is_ready(), ready);
}

#[tokio::test]
async fn fake_records_invocations_and_reports_state() {
    let fake = FakeSandboxClient::new();
    fake.fail("boom");
    let req = InvokeRequest {
        runtime_id: "rt-1".to_string(),
        prompt: "p".to_string(),
        session_id: "s".to_string(),
    };

    assert!(fake.invoke("https://rt", &req, Duration::from_secs(1)).await.is_err());
    assert_eq!(fake.invoke("https://rt", &req, Duration::from_secs(1)).await.unwrap().output, "ok");
    assert_eq!(fake.invocations().len(), 2);

    fake.set_state("CREATING");
    assert!(!fake.status("https://rt", "rt-1").await.unwrap().is_ready());
}
