//! WebSocket transport.
//!
//! One task per connection owns the socket for both directions: it drains
//! the outbound queue (the write pump: sole writer of the sink), reads and
//! dispatches client frames, sends keepalive pings, and enforces the idle
//! deadline. Request work never runs on this task; each `diagram_request`
//! spawns an orchestrator that talks back through the outbound queue.
//!
//! Close codes: 1000 normal/idle, 1008 malformed frame, 1011 overload.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use dg_core::{ClientEnvelope, EnvelopeError, ErrorCode, ErrorData, ServerEvent};

use crate::events::Outbound;
use crate::orchestrator;
use crate::session::{AdmitError, Session};
use crate::state::AppState;

/// Keepalive ping cadence.
const PING_INTERVAL: Duration = Duration::from_secs(30);
/// Idle deadline; connections without traffic this long are closed.
const IDLE_TIMEOUT: Duration = Duration::from_secs(300);

/// Close code: normal closure / idle timeout.
const CLOSE_NORMAL: u16 = 1000;
/// Close code: malformed frame.
const CLOSE_POLICY: u16 = 1008;
/// Close code: server overloaded.
const CLOSE_OVERLOAD: u16 = 1011;

/// Required query parameters for `/ws`.
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    session_id: String,
    user_id: String,
}

/// Handle the WebSocket upgrade at `/ws`.
///
/// Missing `session_id` or `user_id` is rejected before the upgrade with
/// HTTP 400 (by the `Query` extractor).
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, query))
}

/// Drive an accepted connection to completion.
async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>, query: WsQuery) {
    let Some(session) = state
        .sessions
        .register(query.session_id.clone(), query.user_id.clone())
    else {
        tracing::warn!(session_id = %query.session_id, "connection cap reached");
        let _ = socket
            .send(close_frame(CLOSE_OVERLOAD, "server at connection capacity"))
            .await;
        return;
    };
    tracing::info!(
        session_id = %session.session_id,
        user_id = %session.user_id,
        conn = %session.conn_id,
        "connection open"
    );

    let overload = CancellationToken::new();
    let (outbound, mut outbound_rx) = Outbound::channel(overload.clone());

    let mut ping = tokio::time::interval(PING_INTERVAL);
    ping.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut last_activity = Instant::now();

    let close = loop {
        tokio::select! {
            // Write pump: the sole writer of the socket
            Some(event) = outbound_rx.recv() => {
                let Ok(text) = serde_json::to_string(&event) else {
                    continue;
                };
                if socket.send(Message::Text(text.into())).await.is_err() {
                    break None;
                }
            }
            () = overload.cancelled() => {
                break Some((CLOSE_OVERLOAD, "server overloaded"));
            }
            _ = ping.tick() => {
                if last_activity.elapsed() >= IDLE_TIMEOUT {
                    break Some((CLOSE_NORMAL, "idle timeout"));
                }
                if socket.send(Message::Ping(Vec::new().into())).await.is_err() {
                    break None;
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        last_activity = Instant::now();
                        if let Some(close) =
                            dispatch(&state, &session, &outbound, text.as_str()).await
                        {
                            break Some(close);
                        }
                    }
                    Some(Ok(Message::Ping(_) | Message::Pong(_))) => {
                        last_activity = Instant::now();
                    }
                    Some(Ok(Message::Binary(_))) => {
                        break Some((CLOSE_POLICY, "binary frames are not accepted"));
                    }
                    Some(Ok(Message::Close(_))) | None => break None,
                    Some(Err(err)) => {
                        tracing::debug!(error = %err, "socket read error");
                        break None;
                    }
                }
            }
        }
    };

    if let Some((code, reason)) = close {
        let _ = socket.send(close_frame(code, reason)).await;
    }
    state.sessions.unregister(session.conn_id);
    tracing::info!(conn = %session.conn_id, "connection closed");
}

/// Handle one text frame. Returns a close directive for fatal frames.
async fn dispatch(
    state: &Arc<AppState>,
    session: &Arc<Session>,
    outbound: &Outbound,
    text: &str,
) -> Option<(u16, &'static str)> {
    match ClientEnvelope::parse(text) {
        Ok(ClientEnvelope::DiagramRequest {
            request_id, data, ..
        }) => {
            match session.admit_request(&request_id) {
                Ok(cancel) => {
                    tracing::debug!(request_id = %request_id, "request admitted");
                    tokio::spawn(orchestrator::run(
                        Arc::clone(state),
                        Arc::clone(session),
                        request_id,
                        data,
                        outbound.clone(),
                        cancel,
                    ));
                }
                Err(admit_error) => {
                    // Rejected inline; does not count toward cancellation
                    outbound
                        .send(ServerEvent::Error {
                            request_id: Some(request_id),
                            data: admit_error_data(&admit_error),
                        })
                        .await;
                }
            }
            None
        }
        Ok(ClientEnvelope::Cancel { request_id }) => {
            if session.cancel_request(&request_id) {
                tracing::debug!(request_id = %request_id, "cancellation signalled");
            } else {
                tracing::debug!(request_id = %request_id, "cancel for unknown request ignored");
            }
            None
        }
        Ok(ClientEnvelope::Ping) => {
            outbound.send(ServerEvent::Pong).await;
            None
        }
        Err(EnvelopeError::UnknownType {
            type_name,
            request_id,
        }) => {
            outbound
                .send(ServerEvent::Error {
                    request_id,
                    data: ErrorData {
                        code: ErrorCode::ValidationError,
                        message: format!("unknown message type '{type_name}'"),
                        details: None,
                    },
                })
                .await;
            None
        }
        Err(EnvelopeError::Invalid(reason)) => {
            tracing::debug!(reason = %reason, "malformed frame");
            Some((CLOSE_POLICY, "malformed frame"))
        }
    }
}

fn admit_error_data(error: &AdmitError) -> ErrorData {
    match error {
        AdmitError::TooManyRequests { limit } => ErrorData {
            code: ErrorCode::ValidationError,
            message: format!("too many concurrent requests (limit {limit})"),
            details: None,
        },
        AdmitError::DuplicateRequestId => ErrorData {
            code: ErrorCode::ValidationError,
            message: "request_id is already in flight on this connection".to_owned(),
            details: None,
        },
    }
}

fn close_frame(code: u16, reason: &str) -> Message {
    Message::Close(Some(CloseFrame {
        code,
        reason: reason.to_owned().into(),
    }))
}
