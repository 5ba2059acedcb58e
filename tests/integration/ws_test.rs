//! Integration tests for the WebSocket gate, routing, and framing.

mod helpers;

use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio_tungstenite::tungstenite::{self, Message};

use relay_auth::JwtEncoder;
use relay_core::types::Identity;

use helpers::{TestServer, assert_no_event, next_event, next_named, send_json};

fn http_status(err: tungstenite::Error) -> u16 {
    match err {
        tungstenite::Error::Http(response) => response.status().as_u16(),
        other => panic!("expected an HTTP rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn test_upgrade_without_credential_rejected() {
    let server = TestServer::start().await;
    let err = server.try_connect(None, None).await.unwrap_err();
    assert_eq!(http_status(err), 401);
    assert!(server.state.realtime.connections.online_identities().is_empty());
}

#[tokio::test]
async fn test_expired_token_never_registered() {
    let server = TestServer::start().await;
    let expired = JwtEncoder::new(&server.config.auth)
        .issue_until(&Identity::new("u1"), Utc::now() - ChronoDuration::minutes(10))
        .unwrap();

    let err = server.try_connect(Some(&expired), None).await.unwrap_err();
    assert_eq!(http_status(err), 401);
    assert!(server.state.realtime.connections.online_identities().is_empty());
    assert_eq!(server.state.realtime.metrics.snapshot().connections_rejected, 1);
}

#[tokio::test]
async fn test_origin_allow_list_enforced() {
    let server = TestServer::start_with(|c| {
        c.realtime.allowed_origins = vec!["https://app.example.com".to_string()];
    })
    .await;
    let token = server.token("u1");

    let err = server
        .try_connect(Some(&token), Some("https://evil.example.com"))
        .await
        .unwrap_err();
    assert_eq!(http_status(err), 403);

    let ws = server
        .try_connect(Some(&token), Some("https://app.example.com"))
        .await;
    assert!(ws.is_ok());
}

#[tokio::test]
async fn test_query_credential_source() {
    let server = TestServer::start_with(|c| {
        c.auth.credential_source = relay_core::config::CredentialSource::Query {
            name: "token".to_string(),
        };
    })
    .await;
    let url = format!("ws://{}/ws?token={}", server.addr, server.token("q1"));
    let (mut ws, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    let frame = next_named(&mut ws, "online").await;
    assert_eq!(frame["data"], json!(["q1"]));
}

#[tokio::test]
async fn test_message_fans_out_to_every_recipient_connection() {
    let server = TestServer::start().await;
    let mut r1 = server.connect("recipient").await;
    let mut r2 = server.connect("recipient").await;
    let mut sender = server.connect("sender").await;

    let conversation = json!({"conversationId": 42, "body": "hello"});
    send_json(
        &mut sender,
        json!({"event": "send_message", "data": {"recipientId": "recipient", "conversation": conversation}}),
    )
    .await;

    for ws in [&mut r1, &mut r2] {
        let frame = next_named(ws, "receive_message").await;
        assert_eq!(frame["data"], conversation);
    }
    assert_no_event(&mut sender, Duration::from_millis(200)).await;
}

#[tokio::test]
async fn test_message_to_offline_recipient_is_silent() {
    let server = TestServer::start().await;
    let mut sender = server.connect("sender").await;

    send_json(
        &mut sender,
        json!({"event": "send_message", "data": {"recipientId": "nobody", "conversation": "hi"}}),
    )
    .await;

    assert_no_event(&mut sender, Duration::from_millis(200)).await;
    assert_eq!(
        server.state.realtime.metrics.snapshot().recipients_unreachable,
        1
    );
}

#[tokio::test]
async fn test_force_reload_has_no_payload() {
    let server = TestServer::start().await;
    let mut target = server.connect("target").await;
    let mut admin = server.connect("admin").await;

    send_json(
        &mut admin,
        json!({"event": "force_reload", "data": {"userProfileId": "target"}}),
    )
    .await;

    let frame = next_named(&mut target, "force_reload").await;
    assert!(frame.get("data").is_none());
    assert_no_event(&mut admin, Duration::from_millis(200)).await;
}

#[tokio::test]
async fn test_malformed_frame_keeps_connection_open() {
    let server = TestServer::start().await;
    let mut ws = server.connect("u1").await;

    ws.send(Message::Text("{definitely not json".into()))
        .await
        .unwrap();
    let frame = next_named(&mut ws, "error").await;
    assert_eq!(frame["data"]["code"], "INVALID_MESSAGE");

    // Still routed afterwards: a message to oneself comes back.
    send_json(
        &mut ws,
        json!({"event": "send_message", "data": {"recipientId": "u1", "conversation": [1, 2]}}),
    )
    .await;
    let frame = next_named(&mut ws, "receive_message").await;
    assert_eq!(frame["data"], json!([1, 2]));
}

#[tokio::test]
async fn test_oversized_frame_rejected_with_error_event() {
    let server = TestServer::start_with(|c| c.realtime.max_message_bytes = 128).await;
    let mut ws = server.connect("u1").await;

    let big = "x".repeat(512);
    send_json(
        &mut ws,
        json!({"event": "send_message", "data": {"recipientId": "u1", "conversation": big}}),
    )
    .await;
    let frame = next_event(&mut ws).await;
    assert_eq!(frame["event"], "error");
    assert_eq!(server.state.realtime.metrics.snapshot().malformed_frames, 1);
}

#[tokio::test]
async fn test_shutdown_closes_connections() {
    let server = TestServer::start().await;
    let mut ws = server.connect("u1").await;
    let realtime = server.state.realtime.clone();

    let reader = tokio::spawn(async move {
        loop {
            match ws.next().await {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return true,
                Some(Ok(_)) => continue,
            }
        }
    });

    server.shutdown().await;
    let closed = tokio::time::timeout(Duration::from_secs(5), reader)
        .await
        .expect("client sees close")
        .unwrap();
    assert!(closed);
    assert_eq!(realtime.connections.connection_count(), 0);
}
