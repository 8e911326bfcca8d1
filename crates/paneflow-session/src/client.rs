//! Client Registry (component F, §4.F): the set of connected viewing
//! clients, each with an attachment set, driver holdings, and an
//! outbound-frame sender so pushing a frame to one client never blocks
//! delivery to any other.

use paneflow_core::ids::{ClientId, SessionId};
use paneflow_core::wire::ControlOutbound;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::mpsc;

/// A frame queued for delivery to one client over its duplex channel
/// (§4.G): either a session-addressed binary payload or a JSON control
/// message.
#[derive(Debug, Clone)]
pub enum OutboundFrame {
    Binary(SessionId, Arc<[u8]>),
    Control(ControlOutbound),
}

struct ClientEntry {
    attached: HashSet<SessionId>,
    held_drivers: HashSet<SessionId>,
    outbox: mpsc::UnboundedSender<OutboundFrame>,
}

/// `{ id, transport, attached, heldDrivers }` (§3), minus `transport`
/// (represented here by the `outbox` sender; the transport loop itself
/// lives in the Mux Protocol Endpoint, component G).
pub struct ClientRegistry {
    clients: Mutex<HashMap<ClientId, ClientEntry>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self { clients: Mutex::new(HashMap::new()) }
    }

    /// Registration on handshake completion (§4.F).
    pub fn register(&self) -> (ClientId, mpsc::UnboundedReceiver<OutboundFrame>) {
        let id = ClientId::next();
        let (outbox, rx) = mpsc::unbounded_channel();
        self.clients.lock().insert(id, ClientEntry { attached: HashSet::new(), held_drivers: HashSet::new(), outbox });
        (id, rx)
    }

    /// Deregistration on transport drop (§4.F, §5 cancellation).
    pub fn deregister(&self, id: ClientId) {
        self.clients.lock().remove(&id);
    }

    pub fn mark_attached(&self, id: ClientId, session: SessionId) {
        if let Some(c) = self.clients.lock().get_mut(&id) {
            c.attached.insert(session);
        }
    }

    pub fn mark_detached(&self, id: ClientId, session: SessionId) {
        if let Some(c) = self.clients.lock().get_mut(&id) {
            c.attached.remove(&session);
        }
    }

    pub fn mark_driver(&self, id: ClientId, session: SessionId) {
        if let Some(c) = self.clients.lock().get_mut(&id) {
            c.held_drivers.insert(session);
        }
    }

    pub fn clear_driver(&self, id: ClientId, session: SessionId) {
        if let Some(c) = self.clients.lock().get_mut(&id) {
            c.held_drivers.remove(&session);
        }
    }

    pub fn send_to(&self, id: ClientId, frame: OutboundFrame) {
        if let Some(c) = self.clients.lock().get(&id) {
            let _ = c.outbox.send(frame);
        }
    }

    /// Clone of a registered client's outbox sender, so a task spawned
    /// later (e.g. the Broadcaster's per-attach subscriber loop,
    /// component H) can feed the same outbox `register` handed back at
    /// connect time.
    pub fn outbox_of(&self, id: ClientId) -> Option<mpsc::UnboundedSender<OutboundFrame>> {
        self.clients.lock().get(&id).map(|c| c.outbox.clone())
    }

    /// Send to every registered client except `exclude`, e.g. for
    /// `client_joined` delivered to all already-ready peers (§5.4).
    pub fn broadcast_except(&self, exclude: Option<ClientId>, frame: OutboundFrame) {
        for (id, entry) in self.clients.lock().iter() {
            if Some(*id) != exclude {
                let _ = entry.outbox.send(frame.clone());
            }
        }
    }

    pub fn ids(&self) -> Vec<ClientId> {
        self.clients.lock().keys().copied().collect()
    }

    pub fn is_registered(&self, id: ClientId) -> bool {
        self.clients.lock().contains_key(&id)
    }
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_then_deregister_removes_client() {
        let registry = ClientRegistry::new();
        let (id, _rx) = registry.register();
        assert!(registry.is_registered(id));
        registry.deregister(id);
        assert!(!registry.is_registered(id));
    }

    #[test]
    fn broadcast_except_skips_excluded_client() {
        let registry = ClientRegistry::new();
        let (a, mut a_rx) = registry.register();
        let (_b, mut b_rx) = registry.register();
        registry.broadcast_except(Some(a), OutboundFrame::Control(ControlOutbound::ClientJoined { client_id: a }));
        assert!(a_rx.try_recv().is_err());
        assert!(b_rx.try_recv().is_ok());
    }

    #[test]
    fn driver_holdings_track_mark_and_clear() {
        let registry = ClientRegistry::new();
        let (id, _rx) = registry.register();
        let session = SessionId::next();
        registry.mark_driver(id, session);
        registry.clear_driver(id, session);
        // No panics, and the entry is still registered throughout.
        assert!(registry.is_registered(id));
    }
}
