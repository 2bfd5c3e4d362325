//! GET /ws: the viewer socket.
//!
//! A plain upgrade creates a session; `?session=<id>` joins one. Frames the
//! registry queues for this connection are written in order, client pings
//! are answered through the same queue, and the connection is deregistered
//! however the socket ends. A socket write that does not complete within
//! [`SEND_TIMEOUT`], or is overtaken by a kick, ends the connection.

use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures::{Sink, SinkExt, StreamExt};
use serde::Deserialize;

use livecast_core::{ClientFrame, ServerFrame};
use livecast_services::{DownstreamConnection, SessionRegistry};

use super::ApiState;

const SEND_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Default, Deserialize)]
pub struct WsParams {
    pub session: Option<String>,
}

pub async fn handle_ws(
    ws: WebSocketUpgrade,
    State(state): State<ApiState>,
    Query(params): Query<WsParams>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| run_connection(socket, state.registry, params.session))
}

async fn run_connection(mut socket: WebSocket, registry: SessionRegistry, join: Option<String>) {
    let (conn, mut outbound) = registry.open_connection();
    let conn_id = conn.id();

    let session_id = match join {
        None => {
            let id = registry.create_session(conn.clone()).to_string();
            queue_frame(&conn, &ServerFrame::Session {
                session_id: id.clone(),
            });
            id
        }
        Some(id) => {
            // Queued before registration so it precedes any relayed chat.
            queue_frame(&conn, &ServerFrame::Session {
                session_id: id.clone(),
            });
            if let Err(e) = registry.register_connection(&id, conn.clone()).await {
                tracing::info!(session_id = %id, conn_id, "join rejected: {e}");
                reject(&mut socket, "session_not_found", &e.to_string()).await;
                return;
            }
            id
        }
    };
    tracing::info!(session_id = %session_id, conn_id, "viewer connected");

    let (mut sink, mut stream) = socket.split();
    let mut kicked = false;
    loop {
        tokio::select! {
            frame = outbound.recv() => {
                let Some(frame) = frame else { break };
                match write_frame(&mut sink, &conn, Message::Text(frame.to_string().into())).await {
                    WriteOutcome::Sent => {}
                    WriteOutcome::Failed => break,
                    WriteOutcome::Kicked => {
                        kicked = true;
                        break;
                    }
                }
            }
            msg = stream.next() => match msg {
                Some(Ok(Message::Text(text))) => answer_client(&conn, text.as_str()),
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(session_id = %session_id, conn_id, error = %e, "viewer socket error");
                    break;
                }
            },
            _ = conn.kicked() => {
                kicked = true;
                break;
            }
        }
    }

    if kicked {
        let _ = tokio::time::timeout(SEND_TIMEOUT, sink.send(Message::Close(None))).await;
    }
    registry.deregister_connection(&session_id, conn_id).await;
    tracing::info!(session_id = %session_id, conn_id, kicked, "viewer disconnected");
}

fn answer_client(conn: &DownstreamConnection, text: &str) {
    match serde_json::from_str::<ClientFrame>(text) {
        Ok(ClientFrame::Ping) => queue_frame(conn, &ServerFrame::Pong),
        Err(_) => tracing::trace!(conn_id = conn.id(), "ignoring client frame"),
    }
}

fn queue_frame(conn: &DownstreamConnection, frame: &ServerFrame) {
    if let Err(e) = conn.send_frame(frame) {
        tracing::warn!(conn_id = conn.id(), error = %e, "failed to serialize frame");
    }
}

#[derive(Debug, PartialEq, Eq)]
enum WriteOutcome {
    Sent,
    Failed,
    Kicked,
}

/// Write one message, giving up on a kick or after [`SEND_TIMEOUT`].
async fn write_frame<S>(sink: &mut S, conn: &DownstreamConnection, msg: Message) -> WriteOutcome
where
    S: Sink<Message> + Unpin,
{
    tokio::select! {
        sent = tokio::time::timeout(SEND_TIMEOUT, sink.send(msg)) => match sent {
            Ok(Ok(())) => WriteOutcome::Sent,
            Ok(Err(_)) => WriteOutcome::Failed,
            Err(_) => {
                tracing::debug!(conn_id = conn.id(), "socket write timed out");
                WriteOutcome::Failed
            }
        },
        _ = conn.kicked() => WriteOutcome::Kicked,
    }
}

async fn reject(socket: &mut WebSocket, code: &str, message: &str) {
    let frame = ServerFrame::Error {
        code: code.to_string(),
        message: message.to_string(),
    };
    if let Ok(json) = frame.to_json() {
        let _ = socket.send(Message::Text(json.into())).await;
    }
    let _ = socket.send(Message::Close(None)).await;
}
