//! WebSocket upgrade handler and per-connection transport loop.

use std::collections::HashMap;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::{CloseFrame, Message, WebSocket, close_code};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::http::HeaderMap;
use axum::response::Response;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use relay_realtime::Admission;
use relay_realtime::connection::handle::ConnectionHandle;
use relay_realtime::connection::heartbeat::HeartbeatMonitor;
use relay_realtime::message::serializer::serialize_outbound;
use relay_realtime::message::types::OutboundMessage;

use crate::error::ApiError;
use crate::extractors::{extract_credential, extract_origin};
use crate::state::AppState;

/// How long the reader waits for the writer to flush its close frame.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// GET /ws: WebSocket upgrade
///
/// The gate runs before the upgrade, so a rejected attempt gets a plain HTTP
/// error and is never registered.
pub async fn ws_handler(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    let origin = extract_origin(&headers);
    let credential = extract_credential(&state.config.auth.credential_source, &headers, &query);

    let admission = state
        .realtime
        .admit(origin, credential.as_deref())
        .await?;

    Ok(ws.on_upgrade(move |socket| handle_ws_connection(state, admission, socket)))
}

/// Handles an established WebSocket connection.
async fn handle_ws_connection(state: AppState, admission: Admission, socket: WebSocket) {
    let engine = state.realtime.clone();
    let (mut session, outbound_rx) = engine.connections.open(admission);
    let handle = session.handle().clone();
    let conn_id = session.id();

    let (ws_tx, mut ws_rx) = socket.split();
    let mut heartbeat = HeartbeatMonitor::new(engine.heartbeat);
    let mut writer = tokio::spawn(write_loop(
        ws_tx,
        outbound_rx,
        handle.clone(),
        heartbeat.ticker(),
    ));
    let mut liveness = heartbeat.ticker();

    loop {
        tokio::select! {
            frame = ws_rx.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    heartbeat.record_pong();
                    engine.connections.handle_inbound(&session, text.as_str());
                }
                Some(Ok(Message::Binary(_))) => {
                    heartbeat.record_pong();
                    let reply = OutboundMessage::error("INVALID_MESSAGE", "Binary frames are not supported");
                    if let Err(e) = handle.send(reply) {
                        warn!(conn_id = %conn_id, error = %e, "Failed to send error frame");
                    }
                }
                // Pings are answered automatically.
                Some(Ok(Message::Pong(_) | Message::Ping(_))) => heartbeat.record_pong(),
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    warn!(conn_id = %conn_id, error = %e, "WebSocket error");
                    break;
                }
            },
            _ = liveness.tick() => {
                if heartbeat.is_expired() {
                    info!(conn_id = %conn_id, identity = %session.identity(), "Heartbeat timed out");
                    break;
                }
            }
            _ = handle.close_requested() => break,
        }
    }

    engine.connections.terminate(&mut session);

    // Let the writer send a close frame, then make sure it is gone.
    handle.request_close();
    if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut writer)
        .await
        .is_err()
    {
        writer.abort();
    }

    info!(
        conn_id = %conn_id,
        identity = %session.identity(),
        "WebSocket connection closed"
    );
}

/// Drains the outbound queue into the socket and sends keepalive pings.
async fn write_loop(
    mut ws_tx: SplitSink<WebSocket, Message>,
    mut outbound_rx: mpsc::Receiver<OutboundMessage>,
    handle: std::sync::Arc<ConnectionHandle>,
    mut pings: tokio::time::Interval,
) {
    loop {
        tokio::select! {
            msg = outbound_rx.recv() => {
                let Some(msg) = msg else { break };
                let text = match serialize_outbound(&msg) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(conn_id = %handle.id, error = %e, "Failed to serialize outbound message");
                        continue;
                    }
                };
                if ws_tx.send(Message::Text(text.into())).await.is_err() {
                    handle.mark_dead();
                    break;
                }
            }
            _ = pings.tick() => {
                if ws_tx.send(Message::Ping(Bytes::new())).await.is_err() {
                    handle.mark_dead();
                    break;
                }
            }
            _ = handle.close_requested() => {
                let frame = CloseFrame {
                    code: close_code::AWAY,
                    reason: "Connection closed".into(),
                };
                if let Err(e) = ws_tx.send(Message::Close(Some(frame))).await {
                    debug!(conn_id = %handle.id, error = %e, "Close frame not delivered");
                }
                break;
            }
        }
    }
}
