//! Integration tests for presence tracking across real connections.

mod helpers;

use serde_json::Value;

use helpers::{TestServer, wait_for_online};

#[tokio::test]
async fn test_presence_follows_connects_and_disconnects() {
    let server = TestServer::start().await;

    let mut u1 = server.connect("u1").await;
    let mut u2 = server.connect("u2").await;
    wait_for_online(&mut u1, &["u1", "u2"]).await;

    u1.close(None).await.unwrap();
    wait_for_online(&mut u2, &["u2"]).await;

    let online: Vec<String> = server
        .state
        .realtime
        .connections
        .online_identities()
        .into_iter()
        .map(|i| i.to_string())
        .collect();
    assert_eq!(online, vec!["u2"]);
}

#[tokio::test]
async fn test_identity_stays_online_until_last_connection_closes() {
    let server = TestServer::start().await;

    let mut watcher = server.connect("watcher").await;
    let mut tab1 = server.connect("u1").await;
    let tab2 = server.connect("u1").await;
    // One frame per join.
    wait_for_online(&mut watcher, &["u1", "watcher"]).await;
    wait_for_online(&mut watcher, &["u1", "watcher"]).await;

    drop(tab2);
    // Every change is published, so the watcher sees a frame that still
    // lists u1 before the last tab goes away.
    wait_for_online(&mut watcher, &["u1", "watcher"]).await;
    assert_eq!(server.state.realtime.registry.connection_count(), 2);

    tab1.close(None).await.unwrap();
    wait_for_online(&mut watcher, &["watcher"]).await;
}

#[tokio::test]
async fn test_extreme_heartbeat_settings_do_not_strand_identity() {
    let server = TestServer::start_with(|c| {
        c.realtime.ping_interval_seconds = u64::MAX;
        c.realtime.ping_timeout_seconds = u64::MAX;
    })
    .await;

    let mut watcher = server.connect("watcher").await;
    let ghost = server.connect("ghost").await;
    wait_for_online(&mut watcher, &["ghost", "watcher"]).await;

    drop(ghost);
    wait_for_online(&mut watcher, &["watcher"]).await;

    let online: Vec<String> = server
        .state
        .realtime
        .connections
        .online_identities()
        .into_iter()
        .map(|i| i.to_string())
        .collect();
    assert_eq!(online, vec!["watcher"]);
}

#[tokio::test]
async fn test_presence_endpoint_requires_bearer_token() {
    let server = TestServer::start().await;
    let _u1 = server.connect("u1").await;
    let client = reqwest::Client::new();

    let unauthenticated = client
        .get(server.http_url("/api/presence"))
        .send()
        .await
        .unwrap();
    assert_eq!(unauthenticated.status().as_u16(), 401);

    let body: Value = client
        .get(server.http_url("/api/presence"))
        .bearer_auth(server.token("ops"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["online"], serde_json::json!(["u1"]));
    assert_eq!(body["data"]["count"], 1);
}

#[tokio::test]
async fn test_detailed_health_reports_connections() {
    let server = TestServer::start().await;
    let _a = server.connect("a").await;
    let _b = server.connect("b").await;
    let _b2 = server.connect("b").await;

    let body: Value = reqwest::get(server.http_url("/api/health/detailed"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["status"], "ok");
    assert_eq!(body["data"]["connections"], 3);
    assert_eq!(body["data"]["online_identities"], 2);
    assert_eq!(body["data"]["metrics"]["connections_total"], 3);
}
