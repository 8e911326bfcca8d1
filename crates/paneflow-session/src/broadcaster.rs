//! Broadcaster (component H, §4.H): for each session, a writer task
//! that carries pty output to every attached client, and a per-client
//! loop that carries one client's view of that output onward to its
//! outbox, resyncing from scrollback when it falls behind. One
//! `tokio::sync::broadcast` channel per session, rather than one channel
//! per client pair.

use crate::client::OutboundFrame;
use crate::pty::PtyEvent;
use crate::session::SessionTable;
use paneflow_core::ids::{ClientId, SessionId};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc};

/// Spawn the per-session task that reads pty events and feeds them into
/// the Session Table's scrollback + broadcast channel. One of these runs
/// for the lifetime of each session, started right after `create`.
pub fn spawn_session_writer(
    table: Arc<SessionTable>,
    session_id: SessionId,
    mut events: mpsc::UnboundedReceiver<PtyEvent>,
) {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                PtyEvent::Output(chunk) => table.on_pty_output(session_id, &chunk),
                PtyEvent::Exited => {
                    log::debug!("session {session_id} pty exited");
                    break;
                }
            }
        }
    });
}

/// Carry one client's view of a session's output to its outbox. A
/// `RecvError::Lagged` is handled exactly like a fresh `attach`: a
/// scrollback snapshot is resent before resuming from live traffic,
/// satisfying the ordering guarantee of §5.2 for the resynced client.
pub async fn run_subscriber_loop(
    table: Arc<SessionTable>,
    session_id: SessionId,
    client_id: ClientId,
    mut output: broadcast::Receiver<Arc<[u8]>>,
    outbox: mpsc::UnboundedSender<OutboundFrame>,
) {
    loop {
        match output.recv().await {
            Ok(chunk) => {
                if outbox.send(OutboundFrame::Binary(session_id, chunk)).is_err() {
                    break;
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                log::warn!("client {client_id} lagged {skipped} frames on session {session_id}, resyncing");
                let Some(snapshot) = table.scrollback_snapshot(session_id) else { break };
                if outbox.send(OutboundFrame::Binary(session_id, Arc::from(snapshot))).is_err() {
                    break;
                }
            }
            Err(RecvError::Closed) => break,
        }
    }
}
