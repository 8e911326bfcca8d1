//! Session Table (component E, §4.E): the process-wide table of pty
//! sessions, protected by a `parking_lot::Mutex<HashMap<...>>`. Every
//! method here takes the lock for the duration of the operation and
//! never awaits while holding it.

use crate::pty::{PtyProcess, PtySpawner};
use crate::scrollback::Scrollback;
use paneflow_core::error::SessionError;
use paneflow_core::ids::{ClientId, SessionId};
use paneflow_core::wire::SessionMode;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;

const MAX_DIMENSION: u16 = 10_000;

struct Session {
    id: SessionId,
    pty: Arc<dyn PtyProcess>,
    scrollback: Scrollback,
    subscribers: HashSet<ClientId>,
    mode: SessionMode,
    driver: Option<ClientId>,
    cols: u16,
    rows: u16,
    output_tx: broadcast::Sender<Arc<[u8]>>,
}

pub struct SessionTable {
    sessions: Mutex<HashMap<SessionId, Session>>,
    spawner: Arc<dyn PtySpawner>,
    working_directory: Option<PathBuf>,
    scrollback_lines: u32,
    broadcast_capacity: usize,
}

fn check_dimensions(cols: u16, rows: u16) -> Result<(), SessionError> {
    if cols == 0 || rows == 0 || cols > MAX_DIMENSION || rows > MAX_DIMENSION {
        return Err(SessionError::PreconditionFailed("cols/rows out of range"));
    }
    Ok(())
}

impl SessionTable {
    pub fn new(
        spawner: Arc<dyn PtySpawner>,
        working_directory: Option<PathBuf>,
        scrollback_lines: u32,
        broadcast_capacity: usize,
    ) -> Self {
        Self { sessions: Mutex::new(HashMap::new()), spawner, working_directory, scrollback_lines, broadcast_capacity }
    }

    /// `create(cols, rows) -> SessionId` (§4.E). Returns the pty's event
    /// receiver too, so the caller (the Mux Protocol Endpoint, component
    /// G) can spawn the Broadcaster task (component H) over it.
    pub fn create(
        &self,
        cols: u16,
        rows: u16,
    ) -> Result<(SessionId, tokio::sync::mpsc::UnboundedReceiver<crate::pty::PtyEvent>), SessionError> {
        check_dimensions(cols, rows)?;
        let (pty, rx) = self
            .spawner
            .spawn(cols, rows, self.working_directory.as_deref())
            .map_err(SessionError::ResourceExhaustion)?;
        let id = SessionId::next();
        let (output_tx, _) = broadcast::channel(self.broadcast_capacity);
        let cap_bytes = cols as usize * self.scrollback_lines as usize;
        let session = Session {
            id,
            pty,
            scrollback: Scrollback::new(cap_bytes),
            subscribers: HashSet::new(),
            mode: SessionMode::Shared,
            driver: None,
            cols,
            rows,
            output_tx,
        };
        self.sessions.lock().insert(id, session);
        log::debug!("session {id} created ({cols}x{rows})");
        Ok((id, rx))
    }

    /// `destroy(id)` (§4.E): terminate pty, drop scrollback.
    pub fn destroy(&self, id: SessionId) -> Result<(), SessionError> {
        let session = self.sessions.lock().remove(&id).ok_or(SessionError::SessionNotFound(id))?;
        session.pty.kill();
        log::debug!("session {id} destroyed");
        Ok(())
    }

    /// `resize(id, cols, rows)` (§4.E). Returns the subscriber set to
    /// notify with `session_resized`, excluding `initiator`.
    pub fn resize(
        &self,
        id: SessionId,
        cols: u16,
        rows: u16,
        initiator: ClientId,
    ) -> Result<HashSet<ClientId>, SessionError> {
        check_dimensions(cols, rows)?;
        let mut sessions = self.sessions.lock();
        let session = sessions.get_mut(&id).ok_or(SessionError::SessionNotFound(id))?;
        session.pty.resize(cols, rows).map_err(SessionError::ResourceExhaustion)?;
        session.cols = cols;
        session.rows = rows;
        Ok(session.subscribers.iter().copied().filter(|&c| c != initiator).collect())
    }

    /// `attach(clientId, id, cols, rows) -> (scrollback snapshot,
    /// broadcast receiver)` (§4.E). Snapshot and subscription happen
    /// under the same lock, so no live output can interleave between
    /// the snapshot and the subscriber's first live message (§5.3).
    pub fn attach(
        &self,
        client: ClientId,
        id: SessionId,
        cols: u16,
        rows: u16,
    ) -> Result<(Vec<u8>, broadcast::Receiver<Arc<[u8]>>), SessionError> {
        check_dimensions(cols, rows)?;
        let mut sessions = self.sessions.lock();
        let session = sessions.get_mut(&id).ok_or(SessionError::SessionNotFound(id))?;
        session.subscribers.insert(client);
        Ok((session.scrollback.snapshot(), session.output_tx.subscribe()))
    }

    /// `detach(clientId, id)` (§4.E). Returns `true` if the client had
    /// been driver (caller must broadcast `driver_changed`).
    pub fn detach(&self, client: ClientId, id: SessionId) -> Result<bool, SessionError> {
        let mut sessions = self.sessions.lock();
        let session = sessions.get_mut(&id).ok_or(SessionError::SessionNotFound(id))?;
        session.subscribers.remove(&client);
        let was_driver = session.driver == Some(client);
        if was_driver {
            session.driver = None;
        }
        Ok(was_driver)
    }

    /// `setMode(id, mode)` (§4.E, §9 decision): setting `single_driver`
    /// with no driver elects `requester`; setting `shared` leaves the
    /// driver field untouched (it simply stops being enforced).
    pub fn set_mode(
        &self,
        requester: ClientId,
        id: SessionId,
        mode: SessionMode,
    ) -> Result<(SessionMode, Option<ClientId>), SessionError> {
        let mut sessions = self.sessions.lock();
        let session = sessions.get_mut(&id).ok_or(SessionError::SessionNotFound(id))?;
        session.mode = mode;
        if mode == SessionMode::SingleDriver && session.driver.is_none() {
            session.driver = Some(requester);
        }
        Ok((session.mode, session.driver))
    }

    /// `requestDriver(clientId, id)` (§4.E): succeeds if driver is none
    /// or already held by the requester.
    pub fn request_driver(&self, requester: ClientId, id: SessionId) -> Result<SessionMode, SessionError> {
        let mut sessions = self.sessions.lock();
        let session = sessions.get_mut(&id).ok_or(SessionError::SessionNotFound(id))?;
        match session.driver {
            None => {
                session.driver = Some(requester);
                Ok(session.mode)
            }
            Some(current) if current == requester => Ok(session.mode),
            Some(_) => Err(SessionError::PreconditionFailed("driver already held by another client")),
        }
    }

    /// `releaseDriver(clientId, id)` (§4.E): no-op unless the caller is
    /// driver.
    pub fn release_driver(&self, requester: ClientId, id: SessionId) -> Result<(), SessionError> {
        let mut sessions = self.sessions.lock();
        let session = sessions.get_mut(&id).ok_or(SessionError::SessionNotFound(id))?;
        if session.driver == Some(requester) {
            session.driver = None;
        }
        Ok(())
    }

    /// `input(clientId, id, bytes)` (§4.E): dropped (not an error) if
    /// `single_driver` and the caller isn't driver.
    pub fn input(&self, client: ClientId, id: SessionId, bytes: &[u8]) -> Result<(), SessionError> {
        let sessions = self.sessions.lock();
        let session = sessions.get(&id).ok_or(SessionError::SessionNotFound(id))?;
        if session.mode == SessionMode::SingleDriver && session.driver != Some(client) {
            return Ok(());
        }
        session.pty.write(bytes).map_err(SessionError::ResourceExhaustion)
    }

    /// Called by the Broadcaster task (component H) for each pty output
    /// chunk: append to scrollback (with eviction), then fan out.
    pub fn on_pty_output(&self, id: SessionId, chunk: &[u8]) {
        let mut sessions = self.sessions.lock();
        if let Some(session) = sessions.get_mut(&id) {
            session.scrollback.append(chunk);
            let _ = session.output_tx.send(Arc::from(chunk));
        }
    }

    /// A fresh scrollback snapshot, used by a lagged subscriber's
    /// resync (§4.H).
    pub fn scrollback_snapshot(&self, id: SessionId) -> Option<Vec<u8>> {
        self.sessions.lock().get(&id).map(|s| s.scrollback.snapshot())
    }

    pub fn mode_of(&self, id: SessionId) -> Option<SessionMode> {
        self.sessions.lock().get(&id).map(|s| s.mode)
    }

    pub fn driver_of(&self, id: SessionId) -> Option<Option<ClientId>> {
        self.sessions.lock().get(&id).map(|s| s.driver)
    }

    /// The current subscriber set, used to scope a `driver_changed`
    /// broadcast to "all subscribers" rather than every connected client
    /// (§4.G).
    pub fn subscribers_of(&self, id: SessionId) -> Option<HashSet<ClientId>> {
        self.sessions.lock().get(&id).map(|s| s.subscribers.clone())
    }

    /// Client disconnect cancellation sequence (§5): remove from every
    /// session's subscriber set and release every driver slot the
    /// client held. Returns, per affected session, whether the client
    /// had been its driver (caller must broadcast `driver_changed`).
    pub fn disconnect_client(&self, client: ClientId) -> Vec<(SessionId, bool)> {
        let mut affected = Vec::new();
        let mut sessions = self.sessions.lock();
        for session in sessions.values_mut() {
            let was_subscriber = session.subscribers.remove(&client);
            let was_driver = session.driver == Some(client);
            if was_driver {
                session.driver = None;
            }
            if was_subscriber || was_driver {
                affected.push((session.id, was_driver));
            }
        }
        affected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pty::fake::FakePtySpawner;

    fn table() -> (SessionTable, Arc<FakePtySpawner>) {
        let spawner = Arc::new(FakePtySpawner::new());
        (SessionTable::new(spawner.clone(), None, 1000, 16), spawner)
    }

    #[test]
    fn create_then_destroy_kills_pty() {
        let (table, spawner) = table();
        let (id, _rx) = table.create(80, 24).unwrap();
        table.destroy(id).unwrap();
        assert!(spawner.process(0).is_killed());
        assert!(matches!(table.destroy(id), Err(SessionError::SessionNotFound(_))));
    }

    #[test]
    fn attach_delivers_current_scrollback_and_subscribes() {
        let (table, _spawner) = table();
        let (id, _rx) = table.create(80, 24).unwrap();
        table.on_pty_output(id, b"hello");
        let (snapshot, mut receiver) = table.attach(ClientId::next(), id, 80, 24).unwrap();
        assert_eq!(snapshot, b"hello");
        table.on_pty_output(id, b" world");
        let chunk = receiver.try_recv().unwrap();
        assert_eq!(&*chunk, b" world");
    }

    #[test]
    fn single_driver_mode_drops_non_driver_input() {
        let (table, spawner) = table();
        let (id, _rx) = table.create(80, 24).unwrap();
        let driver = ClientId::next();
        let other = ClientId::next();
        table.set_mode(driver, id, SessionMode::SingleDriver).unwrap();
        table.input(other, id, b"not allowed").unwrap();
        table.input(driver, id, b"allowed").unwrap();
        let writes = spawner.process(0).writes.lock().clone();
        assert_eq!(writes, vec![b"allowed".to_vec()]);
    }

    #[test]
    fn set_mode_single_driver_elects_requester_when_none_held() {
        let (table, _spawner) = table();
        let (id, _rx) = table.create(80, 24).unwrap();
        let requester = ClientId::next();
        let (mode, driver) = table.set_mode(requester, id, SessionMode::SingleDriver).unwrap();
        assert_eq!(mode, SessionMode::SingleDriver);
        assert_eq!(driver, Some(requester));
    }

    #[test]
    fn request_driver_fails_when_held_by_another_client() {
        let (table, _spawner) = table();
        let (id, _rx) = table.create(80, 24).unwrap();
        let a = ClientId::next();
        let b = ClientId::next();
        table.request_driver(a, id).unwrap();
        let err = table.request_driver(b, id).unwrap_err();
        assert_eq!(err.kind(), paneflow_core::error::ErrorKind::PreconditionFailed);
    }

    #[test]
    fn driver_handoff_matches_scenario_6() {
        let (table, spawner) = table();
        let (id, _rx) = table.create(80, 24).unwrap();
        let client1 = ClientId::next();
        let client2 = ClientId::next();
        table.set_mode(client1, id, SessionMode::SingleDriver).unwrap();
        table.request_driver(client1, id).unwrap();

        table.input(client2, id, b"c2-dropped").unwrap();
        table.input(client1, id, b"c1-ok").unwrap();

        table.release_driver(client1, id).unwrap();
        table.request_driver(client2, id).unwrap();

        table.input(client2, id, b"c2-ok").unwrap();
        table.input(client1, id, b"c1-dropped").unwrap();

        let writes = spawner.process(0).writes.lock().clone();
        assert_eq!(writes, vec![b"c1-ok".to_vec(), b"c2-ok".to_vec()]);
    }

    #[test]
    fn disconnect_releases_driver_and_subscription() {
        let (table, _spawner) = table();
        let (id, _rx) = table.create(80, 24).unwrap();
        let client = ClientId::next();
        table.attach(client, id, 80, 24).unwrap();
        table.request_driver(client, id).unwrap();
        let affected = table.disconnect_client(client);
        assert_eq!(affected, vec![(id, true)]);
        assert_eq!(table.driver_of(id), Some(None));
    }

    #[test]
    fn scrollback_eviction_caps_at_cols_times_lines() {
        let spawner = Arc::new(FakePtySpawner::new());
        let table = SessionTable::new(spawner, None, 4, 32);
        let (id, _rx) = table.create(2, 24).unwrap();
        table.on_pty_output(id, b"abcdefgh");
        assert_eq!(table.scrollback_snapshot(id).unwrap(), b"efgh");
    }
}
