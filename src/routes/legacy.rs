//! The legacy per-session endpoint (§6): one connection per session,
//! raw duplex pty bytes with no binary frame header, and a single JSON
//! control frame shape for resize. A subset of the Mux Protocol Endpoint
//! — no `create_session`/`attach_session` handshake, since the
//! connection's one session is created implicitly on upgrade and
//! destroyed on disconnect.

use super::AppState;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::WebSocketUpgrade;
use axum::response::IntoResponse;
use paneflow_core::error::SessionError;
use paneflow_core::ids::ClientId;
use paneflow_core::wire::LegacyControl;
use paneflow_session::broadcaster::spawn_session_writer;
use tokio::sync::broadcast::error::RecvError;

async fn send_bytes(socket: &mut WebSocket, bytes: Vec<u8>) -> Result<(), SessionError> {
    socket
        .send(Message::Binary(bytes.into()))
        .await
        .map_err(|err| SessionError::TransportFailure(err.to_string()))
}

pub async fn ws_handler(
    state: axum::extract::State<AppState>,
    cols: Option<u16>,
    rows: Option<u16>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let cols = cols.unwrap_or(state.config.default_cols);
    let rows = rows.unwrap_or(state.config.default_rows);
    ws.on_upgrade(move |socket| handle_legacy(socket, state.0, cols, rows))
}

async fn handle_legacy(mut socket: WebSocket, state: AppState, cols: u16, rows: u16) {
    let client_id = ClientId::next();

    let session_id = match state.sessions.create(cols, rows) {
        Ok((session_id, events)) => {
            spawn_session_writer(state.sessions.clone(), session_id, events);
            session_id
        }
        Err(err) => {
            log::warn!("legacy connection: failed to create session: {err}");
            let _ = socket.close().await;
            return;
        }
    };

    let mut output = match state.sessions.attach(client_id, session_id, cols, rows) {
        Ok((scrollback, receiver)) => {
            if !scrollback.is_empty() && send_bytes(&mut socket, scrollback).await.is_err() {
                let _ = state.sessions.destroy(session_id);
                return;
            }
            receiver
        }
        Err(err) => {
            log::warn!("legacy connection: attach failed: {err}");
            let _ = state.sessions.destroy(session_id);
            return;
        }
    };

    loop {
        tokio::select! {
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str(&text) {
                            Ok(LegacyControl::Resize { cols, rows }) => {
                                let _ = state.sessions.resize(session_id, cols, rows, client_id);
                            }
                            Err(err) => {
                                let err = SessionError::ProtocolViolation(format!("malformed control message: {err}"));
                                log::warn!("legacy client {client_id}: {err}");
                            }
                        }
                    }
                    Some(Ok(Message::Binary(data))) => {
                        let _ = state.sessions.input(client_id, session_id, &data);
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
            chunk = output.recv() => {
                match chunk {
                    Ok(bytes) => {
                        if let Err(err) = send_bytes(&mut socket, (*bytes).to_vec()).await {
                            if err.is_fatal_to_connection() {
                                break;
                            }
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        log::warn!("legacy client {client_id} lagged {skipped} frames on session {session_id}");
                        if let Some(snapshot) = state.sessions.scrollback_snapshot(session_id) {
                            if let Err(err) = send_bytes(&mut socket, snapshot).await {
                                if err.is_fatal_to_connection() {
                                    break;
                                }
                            }
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    let _ = state.sessions.detach(client_id, session_id);
    let _ = state.sessions.destroy(session_id);
    log::debug!("legacy client {client_id} disconnected (session {session_id} destroyed)");
}
