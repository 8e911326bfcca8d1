//! The five-kind error taxonomy (§7). These are kinds, not a single type:
//! the layout side and the session side each get their own enum so callers
//! can match on exactly the variants relevant to them, but both carry a
//! `kind()` that collapses onto the same taxonomy for logging.

use crate::ids::SessionId;
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    PreconditionFailed,
    ProtocolViolation,
    TransportFailure,
    ResourceExhaustion,
}

/// Errors raised by the tree algebra and reducer (component A/C).
///
/// The reducer itself never propagates these: a `not-found` or
/// `precondition-failed` result from the tree algebra is caught at the
/// reducer boundary and turned into a no-op (prior state returned
/// unchanged), per §5. This type exists so the tree algebra's internal
/// functions have something precise to fail with.
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("no such leaf in tree")]
    LeafNotFound,
    #[error("precondition failed: {0}")]
    PreconditionFailed(&'static str),
}

impl LayoutError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LayoutError::LeafNotFound => ErrorKind::NotFound,
            LayoutError::PreconditionFailed(_) => ErrorKind::PreconditionFailed,
        }
    }
}

/// Errors raised by the session router (components E/F/G/H).
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session {0} not found")]
    SessionNotFound(SessionId),

    #[error("precondition failed: {0}")]
    PreconditionFailed(&'static str),

    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("transport failure: {0}")]
    TransportFailure(String),

    #[error("failed to spawn pty")]
    ResourceExhaustion(#[source] anyhow::Error),
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::SessionNotFound(_) => ErrorKind::NotFound,
            SessionError::PreconditionFailed(_) => ErrorKind::PreconditionFailed,
            SessionError::ProtocolViolation(_) => ErrorKind::ProtocolViolation,
            SessionError::TransportFailure(_) => ErrorKind::TransportFailure,
            SessionError::ResourceExhaustion(_) => ErrorKind::ResourceExhaustion,
        }
    }

    /// Whether this error, per §7, should be surfaced by disconnecting the
    /// client rather than recovered locally.
    pub fn is_fatal_to_connection(&self) -> bool {
        matches!(self.kind(), ErrorKind::TransportFailure)
    }
}
