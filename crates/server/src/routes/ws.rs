//! Live order update WebSocket endpoint.
//!
//! The credential travels in the `?token=` query parameter and is validated
//! with the same rule as the HTTP auth path. Validation failures close the
//! socket with a distinct application close code and never touch the
//! registry:
//!
//! - `4401` - no token presented
//! - `4403` - malformed, invalid, or expired token
//! - `4404` - token subject matches no user record

use std::time::Duration;

use axum::{
    extract::{
        Query, State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use minimart_core::Email;

use crate::services::auth::{AuthError, AuthService};
use crate::state::AppState;

/// Close code: no credential presented.
const CLOSE_MISSING_TOKEN: u16 = 4401;
/// Close code: malformed, invalid, or expired credential.
const CLOSE_INVALID_TOKEN: u16 = 4403;
/// Close code: credential subject matches no user.
const CLOSE_UNKNOWN_SUBJECT: u16 = 4404;

/// A socket send exceeding this bound counts as a dead client.
const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Handshake query parameters.
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub token: Option<String>,
}

/// GET /ws
pub async fn upgrade(
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(state, socket, query.token))
}

/// Authenticate the handshake, then run the connection until either side
/// goes away. Cleanup always unsubscribes the channel.
async fn handle_socket(state: AppState, mut socket: WebSocket, token: Option<String>) {
    let Some(token) = token else {
        close_with(&mut socket, CLOSE_MISSING_TOKEN, "missing token").await;
        return;
    };

    let user = match AuthService::new(state.pool(), state.jwt())
        .authenticate(&token)
        .await
    {
        Ok(user) => user,
        Err(AuthError::UnknownSubject) => {
            close_with(&mut socket, CLOSE_UNKNOWN_SUBJECT, "unknown subject").await;
            return;
        }
        Err(e) => {
            tracing::debug!(error = %e, "websocket handshake rejected");
            close_with(&mut socket, CLOSE_INVALID_TOKEN, "invalid token").await;
            return;
        }
    };

    run_connection(&state, socket, &user.email).await;
}

/// Register the channel and pump events until disconnect.
async fn run_connection(state: &AppState, socket: WebSocket, email: &Email) {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let channel_id = state.registry().subscribe(email, tx);
    tracing::info!(user = %email, channel = %channel_id, "websocket connected");

    let (mut sender, mut receiver) = socket.split();

    // Forward registry events to the client. A slow or failed send tears
    // the connection down.
    let mut send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let Ok(text) = serde_json::to_string(&event) else {
                continue;
            };

            match tokio::time::timeout(SEND_TIMEOUT, sender.send(Message::Text(text.into()))).await
            {
                Ok(Ok(())) => {}
                Ok(Err(_)) | Err(_) => break,
            }
        }
    });

    // Await inbound frames solely to detect disconnect. Payloads are
    // discarded.
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Close(_)) | Err(_) => break,
                Ok(_) => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    state.registry().unsubscribe(email, channel_id);
    tracing::info!(user = %email, channel = %channel_id, "websocket disconnected");
}

/// Send a close frame with an application close code, ignoring failures.
async fn close_with(socket: &mut WebSocket, code: u16, reason: &'static str) {
    let _ = socket
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.into(),
        })))
        .await;
}
