// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire format tests: length-prefix framing and JSON encoding.

use super::*;

#[test]
fn encode_returns_json_without_length_prefix() {
    let encoded = encode(&Response::Pong).expect("encode failed");

    let json_str = std::str::from_utf8(&encoded).expect("should be valid UTF-8");
    assert_eq!(json_str, r#"{"type":"Pong"}"#);
}

#[tokio::test]
async fn write_message_adds_length_prefix() {
    let data = b"test data";

    let mut buffer = Vec::new();
    write_message(&mut buffer, data).await.expect("write failed");

    let len = u32::from_be_bytes([buffer[0], buffer[1], buffer[2], buffer[3]]) as usize;
    assert_eq!(len, data.len());
    assert_eq!(&buffer[4..], data);
}

#[tokio::test]
async fn read_message_on_empty_stream_is_connection_closed() {
    let mut cursor = std::io::Cursor::new(Vec::<u8>::new());
    let err = read_message(&mut cursor).await.unwrap_err();
    assert!(matches!(err, ProtocolError::ConnectionClosed), "got {err:?}");
}

#[tokio::test]
async fn read_message_rejects_oversized_prefix() {
    let len = (MAX_MESSAGE_SIZE as u32) + 1;
    let mut cursor = std::io::Cursor::new(len.to_be_bytes().to_vec());

    let err = read_message(&mut cursor).await.unwrap_err();
    assert!(matches!(err, ProtocolError::MessageTooLarge { .. }), "got {err:?}");
}

#[tokio::test]
async fn truncated_payload_is_an_io_error() {
    let mut buffer = 10u32.to_be_bytes().to_vec();
    buffer.extend_from_slice(b"abc");
    let mut cursor = std::io::Cursor::new(buffer);

    let err = read_message(&mut cursor).await.unwrap_err();
    assert!(matches!(err, ProtocolError::Io(_)), "got {err:?}");
}

#[tokio::test]
async fn request_crosses_a_duplex_stream() {
    let (mut client, mut server) = tokio::io::duplex(4096);
    let request = Request::Cancel { id: "exe-abc".to_string() };

    write_request(&mut client, &request, Duration::from_secs(1)).await.unwrap();
    let received = read_request(&mut server, Duration::from_secs(1)).await.unwrap();

    assert_eq!(received, request);
}

#[tokio::test]
async fn read_request_times_out_when_nothing_arrives() {
    let (_client, mut server) = tokio::io::duplex(64);

    let err = read_request(&mut server, Duration::from_millis(20)).await.unwrap_err();
    assert!(matches!(err, ProtocolError::Timeout), "got {err:?}");
}

#[tokio::test]
async fn garbage_payload_is_a_json_error() {
    let mut buffer = Vec::new();
    write_message(&mut buffer, b"not json").await.unwrap();
    let mut cursor = std::io::Cursor::new(buffer);

    let err = read_request(&mut cursor, Duration::from_secs(1)).await.unwrap_err();
    assert!(matches!(err, ProtocolError::Json(_)), "got {err:?}");
}
