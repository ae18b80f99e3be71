use crate::pool::PoolKey;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the transport layer.
///
/// Variants are deliberately coarse: the full I/O detail is logged at the
/// failure site, and callers branch on the kind of failure rather than on
/// operating-system error codes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The socket could not be resolved or connected.
    #[error("cannot establish connection to {0}")]
    CannotEstablishConnection(String),
    /// The connection has been closed; the closed state is terminal.
    #[error("connection is closed")]
    ConnectionClosed,
    /// A frame read did not complete within its timeout.
    #[error("read timed out after {0:?}")]
    ReadTimeout(Duration),
    /// An unexpected socket failure other than closed or timed out.
    #[error("tcp error")]
    Tcp,
    /// The payload does not fit the 4-byte length prefix.
    #[error("payload of {0} bytes exceeds the maximum frame size")]
    PayloadTooLarge(usize),
    /// No pooled connection became available within the borrow timeout.
    #[error("connection pool exhausted for {0}: no connection became available within {1:?}")]
    PoolExhausted(PoolKey, Duration),
    /// The pool has been closed.
    #[error("connection pool is closed")]
    PoolClosed,
    /// A read loop already owns this connection's input stream.
    #[error("a read loop is already running for this connection")]
    ReadLoopAlreadyRunning,
}
