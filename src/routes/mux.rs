//! The Mux Protocol Endpoint (component G, §4.G): one axum `WebSocketUpgrade`
//! per client, multiplexing session-addressed binary frames and JSON
//! control messages over a single duplex stream. Transport realization
//! per §4.G: a `tokio::select!` loop over the socket's own inbound stream
//! and this client's outbox — the outbox (§4.F) is itself fed by the
//! per-(session, client) subscriber tasks spawned on attach (component H)
//! and by `ClientRegistry` broadcasts, which together cover asynchronous
//! state pushes (peer presence, driver changes) without a third
//! `select!` arm.

use super::AppState;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use paneflow_core::error::SessionError;
use paneflow_core::ids::{ClientId, SessionId};
use paneflow_core::wire::{build_frame, parse_frame, ControlInbound, ControlOutbound};
use paneflow_session::broadcaster::{run_subscriber_loop, spawn_session_writer};
use paneflow_session::OutboundFrame;
use std::collections::HashMap;
use tokio::task::JoinHandle;

pub async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_mux(socket, state))
}

async fn handle_mux(mut socket: WebSocket, state: AppState) {
    let (client_id, mut outbox_rx) = state.clients.register();
    log::debug!("client {client_id} connected (mux)");

    let workspace = {
        let layout = state.layout.lock();
        serde_json::to_value(&*layout).ok()
    };
    let snapshot = ControlOutbound::WorkspaceSnapshot {
        client_id,
        workspace,
        terminal_config: state.config.default_terminal_config.clone(),
    };
    if send_control(&mut socket, &snapshot).await.is_err() {
        state.clients.deregister(client_id);
        return;
    }

    // Ordering guarantee §5.4: client_joined reaches every other already-ready
    // client before this one starts receiving pty output for anything it
    // attaches to, which holds here because no attach has happened yet.
    state.clients.broadcast_except(Some(client_id), OutboundFrame::Control(ControlOutbound::ClientJoined { client_id }));

    let mut subscriber_tasks: HashMap<SessionId, JoinHandle<()>> = HashMap::new();

    loop {
        tokio::select! {
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ControlInbound>(&text) {
                            Ok(inbound) => handle_inbound(inbound, client_id, &state, &mut socket, &mut subscriber_tasks).await,
                            Err(err) => {
                                // §7 protocol-violation: frame discarded, connection stays open.
                                let err = SessionError::ProtocolViolation(format!("malformed control message: {err}"));
                                log::warn!("client {client_id}: {err}");
                            }
                        }
                    }
                    Some(Ok(Message::Binary(data))) => {
                        match parse_frame(&data) {
                            Some((session_id, payload)) => {
                                let _ = state.sessions.input(client_id, session_id, payload);
                            }
                            None => {
                                let err = SessionError::ProtocolViolation("binary frame shorter than 4 bytes".to_string());
                                log::warn!("client {client_id}: {err}");
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
            frame = outbox_rx.recv() => {
                match frame {
                    Some(OutboundFrame::Binary(session_id, payload)) => {
                        if let Err(err) = send_binary(&mut socket, session_id, &payload).await {
                            if err.is_fatal_to_connection() {
                                break;
                            }
                        }
                    }
                    Some(OutboundFrame::Control(msg)) => {
                        if let Err(err) = send_control(&mut socket, &msg).await {
                            if err.is_fatal_to_connection() {
                                break;
                            }
                        }
                    }
                    None => break,
                }
            }
        }
    }

    for (_, handle) in subscriber_tasks.drain() {
        handle.abort();
    }
    for (session_id, was_driver) in state.sessions.disconnect_client(client_id) {
        if was_driver {
            let mode = state.sessions.mode_of(session_id).unwrap_or(paneflow_core::wire::SessionMode::Shared);
            broadcast_to_subscribers(&state, session_id, ControlOutbound::DriverChanged { session_id, driver_id: None, mode });
        }
    }
    state.clients.deregister(client_id);
    // Cancellation (§5): client_left is delivered after this client's input
    // has ceased to affect any session, which holds since disconnect_client
    // and deregister above have already run.
    state.clients.broadcast_except(None, OutboundFrame::Control(ControlOutbound::ClientLeft { client_id }));
    log::debug!("client {client_id} disconnected (mux)");
}

async fn handle_inbound(
    inbound: ControlInbound,
    client_id: ClientId,
    state: &AppState,
    socket: &mut WebSocket,
    subscriber_tasks: &mut HashMap<SessionId, JoinHandle<()>>,
) {
    match inbound {
        ControlInbound::CreateSession { cols, rows } => match state.sessions.create(cols, rows) {
            Ok((session_id, events)) => {
                spawn_session_writer(state.sessions.clone(), session_id, events);
                let _ = send_control(socket, &ControlOutbound::SessionCreated { session_id }).await;
            }
            Err(err) => log::warn!("client {client_id}: failed to create session: {err}"),
        },

        ControlInbound::DestroySession { session_id } => {
            if let Some(handle) = subscriber_tasks.remove(&session_id) {
                handle.abort();
            }
            let _ = state.sessions.destroy(session_id);
        }

        ControlInbound::Resize { session_id, cols, rows } => {
            if let Ok(others) = state.sessions.resize(session_id, cols, rows, client_id) {
                for peer in others {
                    state.clients.send_to(peer, OutboundFrame::Control(ControlOutbound::SessionResized { session_id, cols, rows }));
                }
            }
        }

        ControlInbound::AttachSession { session_id, cols, rows } => {
            match state.sessions.attach(client_id, session_id, cols, rows) {
                Ok((scrollback, receiver)) => {
                    state.clients.mark_attached(client_id, session_id);
                    // §5.2: session_attached, then the scrollback burst, both
                    // written directly here before the subscriber task (which
                    // carries only *subsequent* live output) is spawned.
                    if send_control(socket, &ControlOutbound::SessionAttached { session_id }).await.is_err() {
                        return;
                    }
                    if !scrollback.is_empty() && send_binary(socket, session_id, &scrollback).await.is_err() {
                        return;
                    }
                    if let Some(previous) = subscriber_tasks.remove(&session_id) {
                        previous.abort();
                    }
                    if let Some(outbox_tx) = state.clients.outbox_of(client_id) {
                        let handle = tokio::spawn(run_subscriber_loop(state.sessions.clone(), session_id, client_id, receiver, outbox_tx));
                        subscriber_tasks.insert(session_id, handle);
                    }
                }
                Err(err) => log::debug!("client {client_id}: attach_session failed: {err}"),
            }
        }

        ControlInbound::DetachSession { session_id } => {
            if let Some(handle) = subscriber_tasks.remove(&session_id) {
                handle.abort();
            }
            if let Ok(was_driver) = state.sessions.detach(client_id, session_id) {
                state.clients.mark_detached(client_id, session_id);
                if was_driver {
                    state.clients.clear_driver(client_id, session_id);
                    let mode = state.sessions.mode_of(session_id).unwrap_or(paneflow_core::wire::SessionMode::Shared);
                    broadcast_to_subscribers(state, session_id, ControlOutbound::DriverChanged { session_id, driver_id: None, mode });
                }
            }
        }

        ControlInbound::SetSessionMode { session_id, mode } => {
            if let Ok((mode, driver)) = state.sessions.set_mode(client_id, session_id, mode) {
                if driver == Some(client_id) {
                    state.clients.mark_driver(client_id, session_id);
                }
                broadcast_to_subscribers(state, session_id, ControlOutbound::DriverChanged { session_id, driver_id: driver, mode });
            }
        }

        ControlInbound::RequestDriver { session_id } => {
            if let Ok(mode) = state.sessions.request_driver(client_id, session_id) {
                state.clients.mark_driver(client_id, session_id);
                broadcast_to_subscribers(state, session_id, ControlOutbound::DriverChanged { session_id, driver_id: Some(client_id), mode });
            }
        }

        ControlInbound::ReleaseDriver { session_id } => {
            let was_driver = state.sessions.driver_of(session_id) == Some(Some(client_id));
            if was_driver && state.sessions.release_driver(client_id, session_id).is_ok() {
                state.clients.clear_driver(client_id, session_id);
                let mode = state.sessions.mode_of(session_id).unwrap_or(paneflow_core::wire::SessionMode::Shared);
                broadcast_to_subscribers(state, session_id, ControlOutbound::DriverChanged { session_id, driver_id: None, mode });
            }
        }
    }
}

fn broadcast_to_subscribers(state: &AppState, session_id: SessionId, msg: ControlOutbound) {
    if let Some(subscribers) = state.sessions.subscribers_of(session_id) {
        for client in subscribers {
            state.clients.send_to(client, OutboundFrame::Control(msg.clone()));
        }
    }
}

async fn send_control(socket: &mut WebSocket, msg: &ControlOutbound) -> Result<(), SessionError> {
    let text = serde_json::to_string(msg).expect("ControlOutbound always serializes");
    socket
        .send(Message::Text(text.into()))
        .await
        .map_err(|err| SessionError::TransportFailure(err.to_string()))
}

async fn send_binary(socket: &mut WebSocket, session_id: SessionId, payload: &[u8]) -> Result<(), SessionError> {
    socket
        .send(Message::Binary(build_frame(session_id, payload).into()))
        .await
        .map_err(|err| SessionError::TransportFailure(err.to_string()))
}
