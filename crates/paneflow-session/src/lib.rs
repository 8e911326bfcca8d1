pub mod broadcaster;
pub mod client;
pub mod pty;
pub mod scrollback;
pub mod session;

pub use client::{ClientRegistry, OutboundFrame};
pub use pty::{PortablePtySpawner, PtyEvent, PtyProcess, PtySpawner};
pub use session::SessionTable;
