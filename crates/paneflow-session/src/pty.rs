//! The pty capability surface (§4.E, §9): a small trait so the Session
//! Table's logic is exercised in tests against a fake implementation and
//! in production against a real OS pty, rather than importing
//! `portable-pty`'s types directly into the table's own signatures. A
//! reader thread copies pty output into a `tokio::sync::mpsc` channel; writes
//! go straight through to the pty's master side; spawn failures are
//! reported rather than panicking.

use anyhow::{Context, Result};
use parking_lot::Mutex;
use portable_pty::{native_pty_system, CommandBuilder, MasterPty, PtySize};
use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;

/// An event surfaced by a running pty's output side.
#[derive(Debug, Clone)]
pub enum PtyEvent {
    Output(Vec<u8>),
    Exited,
}

/// The write/resize/kill half of the capability surface (§4.E: "create,
/// resize, write, kill").
pub trait PtyProcess: Send + Sync {
    fn write(&self, data: &[u8]) -> Result<()>;
    fn resize(&self, cols: u16, rows: u16) -> Result<()>;
    fn kill(&self);
}

/// The capability surface's `create`, producing a handle plus the
/// output/exit event stream.
pub trait PtySpawner: Send + Sync {
    fn spawn(
        &self,
        cols: u16,
        rows: u16,
        cwd: Option<&Path>,
    ) -> Result<(Arc<dyn PtyProcess>, mpsc::UnboundedReceiver<PtyEvent>)>;
}

struct RealPtyProcess {
    master: Mutex<Box<dyn MasterPty + Send>>,
    writer: Mutex<Box<dyn Write + Send>>,
    child: Mutex<Box<dyn portable_pty::Child + Send + Sync>>,
}

impl PtyProcess for RealPtyProcess {
    fn write(&self, data: &[u8]) -> Result<()> {
        self.writer.lock().write_all(data).context("pty write failed")
    }

    fn resize(&self, cols: u16, rows: u16) -> Result<()> {
        self.master
            .lock()
            .resize(PtySize { rows, cols, pixel_width: 0, pixel_height: 0 })
            .context("pty resize failed")
    }

    fn kill(&self) {
        let _ = self.child.lock().kill();
    }
}

/// Real pty backend: `portable_pty::native_pty_system()` plus a reader
/// thread, used in production.
pub struct PortablePtySpawner;

impl PtySpawner for PortablePtySpawner {
    fn spawn(
        &self,
        cols: u16,
        rows: u16,
        cwd: Option<&Path>,
    ) -> Result<(Arc<dyn PtyProcess>, mpsc::UnboundedReceiver<PtyEvent>)> {
        let pty_system = native_pty_system();
        let pair = pty_system
            .openpty(PtySize { rows, cols, pixel_width: 0, pixel_height: 0 })
            .context("failed to allocate pty")?;

        let mut cmd = CommandBuilder::new_default_prog();
        if let Some(cwd) = cwd {
            cmd.cwd(cwd);
        }
        cmd.env("TERM", "xterm-256color");

        let child = pair.slave.spawn_command(cmd).context("failed to spawn shell")?;
        drop(pair.slave);

        let mut reader = pair.master.try_clone_reader().context("failed to clone pty reader")?;
        let writer = pair.master.take_writer().context("failed to take pty writer")?;

        let (tx, rx) = mpsc::unbounded_channel();
        std::thread::Builder::new()
            .name("pty-reader".to_string())
            .spawn(move || {
                let mut buf = [0u8; 65536];
                loop {
                    match reader.read(&mut buf) {
                        Ok(0) => break,
                        Ok(n) => {
                            if tx.send(PtyEvent::Output(buf[..n].to_vec())).is_err() {
                                break;
                            }
                        }
                        Err(err) => {
                            log::warn!("pty read error: {err}");
                            break;
                        }
                    }
                }
                let _ = tx.send(PtyEvent::Exited);
            })
            .expect("failed to spawn pty reader thread");

        Ok((
            Arc::new(RealPtyProcess {
                master: Mutex::new(pair.master),
                writer: Mutex::new(writer),
                child: Mutex::new(child),
            }),
            rx,
        ))
    }
}

/// Test-only fake backend: every `spawn` hands back a process whose
/// writes/resizes/kills are recorded, and a sender the test holds onto
/// to inject fake pty output without touching a real OS pty.
#[cfg(any(test, feature = "test-util"))]
pub mod fake {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    pub struct FakePtyProcess {
        pub writes: Mutex<Vec<Vec<u8>>>,
        pub resizes: Mutex<Vec<(u16, u16)>>,
        pub killed: AtomicBool,
    }

    impl FakePtyProcess {
        fn new() -> Self {
            Self { writes: Mutex::new(Vec::new()), resizes: Mutex::new(Vec::new()), killed: AtomicBool::new(false) }
        }

        pub fn is_killed(&self) -> bool {
            self.killed.load(Ordering::SeqCst)
        }
    }

    impl PtyProcess for FakePtyProcess {
        fn write(&self, data: &[u8]) -> Result<()> {
            self.writes.lock().push(data.to_vec());
            Ok(())
        }

        fn resize(&self, cols: u16, rows: u16) -> Result<()> {
            self.resizes.lock().push((cols, rows));
            Ok(())
        }

        fn kill(&self) {
            self.killed.store(true, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    pub struct FakePtySpawner {
        pub processes: Mutex<Vec<Arc<FakePtyProcess>>>,
        pub senders: Mutex<Vec<mpsc::UnboundedSender<PtyEvent>>>,
    }

    impl FakePtySpawner {
        pub fn new() -> Self {
            Self::default()
        }

        /// Push a chunk of fake pty output to the `n`th session spawned.
        pub fn push_output(&self, spawn_index: usize, data: &[u8]) {
            let senders = self.senders.lock();
            let _ = senders[spawn_index].send(PtyEvent::Output(data.to_vec()));
        }

        pub fn process(&self, spawn_index: usize) -> Arc<FakePtyProcess> {
            self.processes.lock()[spawn_index].clone()
        }
    }

    impl PtySpawner for FakePtySpawner {
        fn spawn(
            &self,
            _cols: u16,
            _rows: u16,
            _cwd: Option<&Path>,
        ) -> Result<(Arc<dyn PtyProcess>, mpsc::UnboundedReceiver<PtyEvent>)> {
            let process = Arc::new(FakePtyProcess::new());
            let (tx, rx) = mpsc::unbounded_channel();
            self.processes.lock().push(process.clone());
            self.senders.lock().push(tx);
            Ok((process, rx))
        }
    }
}
