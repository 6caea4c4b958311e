//! WebSocket handler
//!
//! Authenticates the upgraded socket, then runs a reader task for client
//! commands and a writer task draining the connection's outbound queue.

use crate::connection::Accepted;
use crate::handlers::CommandDispatcher;
use crate::protocol::CloseCode;
use crate::server::GatewayState;
use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    http::{header::AUTHORIZATION, HeaderMap},
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::time::Duration;

/// How long the writer may take to flush its close frame
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Query parameters for `GET /ws`
#[derive(Debug, Default, Deserialize)]
pub struct ConnectParams {
    pub token: Option<String>,
}

/// WebSocket gateway handler
///
/// The token comes from `?token=` or, failing that, an `Authorization: Bearer` header.
pub async fn gateway_handler(
    State(state): State<GatewayState>,
    Query(params): Query<ConnectParams>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let token = params.token.or_else(|| {
        headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned)
    });

    ws.on_upgrade(move |socket| handle_socket(state, socket, token))
}

fn close_message(code: CloseCode) -> Message {
    Message::Close(Some(CloseFrame {
        code: code.as_u16(),
        reason: code.description().into(),
    }))
}

/// Handle an upgraded WebSocket connection
async fn handle_socket(state: GatewayState, mut socket: WebSocket, token: Option<String>) {
    let Accepted {
        connection,
        mut receiver,
    } = match state.gateway().accept(token.as_deref()) {
        Ok(accepted) => accepted,
        Err(e) => {
            if socket.send(close_message(e.close_code())).await.is_err() {
                tracing::debug!("Failed to send rejection close frame");
            }
            return;
        }
    };

    let connection_id = connection.id();
    let (mut ws_sink, mut ws_stream) = socket.split();

    // Writer: drain the outbound queue until the connection is closed
    let mut send_task = {
        let connection = connection.clone();
        let shutdown = state.gateway().shutdown_token().clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    () = connection.cancelled() => break,
                    frame = receiver.recv() => {
                        let Some(frame) = frame else { break };
                        if ws_sink.send(Message::Text(frame.to_string())).await.is_err() {
                            tracing::debug!(
                                connection_id = %connection.id(),
                                "Failed to send message to WebSocket"
                            );
                            return;
                        }
                    }
                }
            }

            let code = connection
                .close_code()
                .or_else(|| shutdown.is_cancelled().then_some(CloseCode::ServerShutdown));
            let close = code.map_or(Message::Close(None), close_message);
            let _ = ws_sink.send(close).await;
        })
    };

    // Reader: handle client commands until close, error, or cancellation
    let mut recv_task = {
        let state = state.clone();
        let connection = connection.clone();
        tokio::spawn(async move {
            loop {
                let message = tokio::select! {
                    () = connection.cancelled() => return None,
                    message = ws_stream.next() => message,
                };

                match message {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(code) = CommandDispatcher::handle_text(&state, &connection, &text) {
                            return Some(code);
                        }
                    }
                    Some(Ok(Message::Binary(_))) => {
                        tracing::debug!(
                            connection_id = %connection.id(),
                            "Binary messages not supported"
                        );
                        return Some(CloseCode::DecodeError);
                    }
                    Some(Ok(Message::Ping(_) | Message::Pong(_))) => connection.touch(),
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::debug!(connection_id = %connection.id(), "Client closed connection");
                        return None;
                    }
                    Some(Err(e)) => {
                        tracing::warn!(
                            connection_id = %connection.id(),
                            error = %e,
                            "WebSocket error"
                        );
                        return Some(CloseCode::UnknownError);
                    }
                }
            }
        })
    };

    tokio::select! {
        result = &mut recv_task => {
            match result {
                Ok(Some(code)) => {
                    connection.close(code);
                }
                Ok(None) => connection.release(),
                Err(e) => {
                    tracing::error!(connection_id = %connection_id, error = %e, "Reader task failed");
                    connection.close(CloseCode::UnknownError);
                }
            }
            if tokio::time::timeout(CLOSE_TIMEOUT, &mut send_task).await.is_err() {
                send_task.abort();
            }
        }
        _ = &mut send_task => {
            connection.release();
            recv_task.abort();
        }
    }

    state.gateway().disconnect(connection_id);
}
