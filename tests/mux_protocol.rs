//! End-to-end exercise of the Mux Protocol Endpoint (§4.G, §8 scenarios
//! 5 and 6) over a real `TcpListener` and real `tokio-tungstenite`
//! clients, with `paneflow-session`'s `FakePtySpawner` standing in for an
//! OS pty. Requires `--features test-util`.

#![cfg(feature = "test-util")]

use futures_util::{SinkExt, StreamExt};
use paneflow::routes::{self, AppState};
use paneflow_core::config::Config;
use paneflow_core::wire::{ControlInbound, ControlOutbound, SessionMode};
use paneflow_layout::AppState as LayoutState;
use paneflow_session::pty::fake::FakePtySpawner;
use paneflow_session::{ClientRegistry, SessionTable};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

type WsStream = tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

async fn spawn_server() -> (u16, Arc<FakePtySpawner>) {
    let spawner = Arc::new(FakePtySpawner::new());
    let sessions = Arc::new(SessionTable::new(spawner.clone(), None, 1000, 64));
    let clients = Arc::new(ClientRegistry::new());
    let layout = Arc::new(Mutex::new(LayoutState::initial()));
    let config = Arc::new(Config::default());
    let state = AppState { layout, sessions, clients, config };
    let app = routes::build_router(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service()).await.unwrap();
    });
    (port, spawner)
}

async fn connect(port: u16) -> WsStream {
    let (stream, _) = tokio_tungstenite::connect_async(format!("ws://127.0.0.1:{port}/ws?mode=mux")).await.unwrap();
    stream
}

async fn send_inbound(stream: &mut WsStream, msg: &ControlInbound) {
    let text = serde_json::to_string(msg).unwrap();
    stream.send(Message::Text(text.into())).await.unwrap();
}

/// Read control frames until one matches `pred`, skipping anything else
/// (e.g. the leading `workspace_snapshot` every connection gets first).
async fn recv_control_matching(
    stream: &mut WsStream,
    pred: impl Fn(&ControlOutbound) -> bool,
) -> ControlOutbound {
    loop {
        match stream.next().await.unwrap().unwrap() {
            Message::Text(text) => {
                let msg: ControlOutbound = serde_json::from_str(&text).unwrap();
                if pred(&msg) {
                    return msg;
                }
            }
            Message::Binary(_) => {}
            other => panic!("unexpected message: {other:?}"),
        }
    }
}

#[tokio::test]
async fn create_attach_and_client_joined_notification() {
    let (port, _spawner) = spawn_server().await;

    let mut a = connect(port).await;
    // Drain a's own workspace_snapshot.
    recv_control_matching(&mut a, |m| matches!(m, ControlOutbound::WorkspaceSnapshot { .. })).await;

    send_inbound(&mut a, &ControlInbound::CreateSession { cols: 80, rows: 24 }).await;
    let created = recv_control_matching(&mut a, |m| matches!(m, ControlOutbound::SessionCreated { .. })).await;
    let session_id = match created {
        ControlOutbound::SessionCreated { session_id } => session_id,
        _ => unreachable!(),
    };

    send_inbound(&mut a, &ControlInbound::AttachSession { session_id, cols: 80, rows: 24 }).await;
    recv_control_matching(&mut a, |m| matches!(m, ControlOutbound::SessionAttached { .. })).await;

    let mut b = connect(port).await;
    recv_control_matching(&mut b, |m| matches!(m, ControlOutbound::WorkspaceSnapshot { .. })).await;

    // a is notified that b joined, since client_joined goes to everyone
    // already connected except the joiner itself.
    recv_control_matching(&mut a, |m| matches!(m, ControlOutbound::ClientJoined { .. })).await;

    send_inbound(&mut b, &ControlInbound::AttachSession { session_id, cols: 80, rows: 24 }).await;
    recv_control_matching(&mut b, |m| matches!(m, ControlOutbound::SessionAttached { .. })).await;
}

#[tokio::test]
async fn single_driver_mode_gates_input_and_hands_off_on_release() {
    let (port, spawner) = spawn_server().await;

    let mut a = connect(port).await;
    recv_control_matching(&mut a, |m| matches!(m, ControlOutbound::WorkspaceSnapshot { .. })).await;
    send_inbound(&mut a, &ControlInbound::CreateSession { cols: 80, rows: 24 }).await;
    let session_id = match recv_control_matching(&mut a, |m| matches!(m, ControlOutbound::SessionCreated { .. })).await
    {
        ControlOutbound::SessionCreated { session_id } => session_id,
        _ => unreachable!(),
    };
    send_inbound(&mut a, &ControlInbound::AttachSession { session_id, cols: 80, rows: 24 }).await;
    recv_control_matching(&mut a, |m| matches!(m, ControlOutbound::SessionAttached { .. })).await;

    let mut b = connect(port).await;
    recv_control_matching(&mut b, |m| matches!(m, ControlOutbound::WorkspaceSnapshot { .. })).await;
    recv_control_matching(&mut a, |m| matches!(m, ControlOutbound::ClientJoined { .. })).await;
    send_inbound(&mut b, &ControlInbound::AttachSession { session_id, cols: 80, rows: 24 }).await;
    recv_control_matching(&mut b, |m| matches!(m, ControlOutbound::SessionAttached { .. })).await;

    // a elects itself driver by switching the session to single_driver.
    send_inbound(&mut a, &ControlInbound::SetSessionMode { session_id, mode: SessionMode::SingleDriver }).await;
    let changed = recv_control_matching(&mut a, |m| matches!(m, ControlOutbound::DriverChanged { .. })).await;
    assert!(matches!(changed, ControlOutbound::DriverChanged { driver_id: Some(_), .. }));
    recv_control_matching(&mut b, |m| matches!(m, ControlOutbound::DriverChanged { .. })).await;

    // b is not driver: its input is silently dropped, not written to the pty.
    let frame = paneflow_core::wire::build_frame(session_id, b"echo hi\n");
    b.send(Message::Binary(frame.into())).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    assert!(spawner.process(0).writes.lock().is_empty());

    // a releases the driver role; the next request_driver from b succeeds.
    send_inbound(&mut a, &ControlInbound::ReleaseDriver { session_id }).await;
    recv_control_matching(&mut a, |m| matches!(m, ControlOutbound::DriverChanged { .. })).await;
    recv_control_matching(&mut b, |m| matches!(m, ControlOutbound::DriverChanged { .. })).await;

    send_inbound(&mut b, &ControlInbound::RequestDriver { session_id }).await;
    let changed = recv_control_matching(&mut b, |m| matches!(m, ControlOutbound::DriverChanged { .. })).await;
    assert!(matches!(changed, ControlOutbound::DriverChanged { driver_id: Some(_), .. }));

    let frame = paneflow_core::wire::build_frame(session_id, b"echo hi\n");
    b.send(Message::Binary(frame.into())).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    assert_eq!(spawner.process(0).writes.lock().len(), 1);
}
