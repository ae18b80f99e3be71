use crate::diagnostic::DiagnosticEvent;
use crate::pool::PoolKey;
use crate::tcp::config_connection::TcpConnectionConfig;
use crate::tcp::tcp_connection_state::ConnectionState;
use crate::tcp::tcp_connection_stream::{ConnectionReader, ConnectionWriter};
use async_broadcast::{Receiver, Sender};
use crossbeam_utils::atomic::AtomicCell;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex as TokioMutex;
use tracing::error;

/// One pooled, reusable TCP connection to a single (host, port) destination.
///
/// The connection owns the socket's split halves behind separate async locks,
/// so frame reads and writes on the same connection never block each other.
/// All methods take `&self`; share the connection as `Arc<TcpConnection>`.
#[derive(Debug)]
pub struct TcpConnection {
    // Process-unique id, used to correlate log lines and pool bookkeeping.
    pub(crate) id: u64,
    pub(crate) host: String,
    pub(crate) port: u16,
    // TcpConnectionConfig is immutable thus no need for a lock.
    pub(crate) config: Arc<TcpConnectionConfig>,
    // AtomicCell allows lock-free reads of the cached socket addresses.
    pub(crate) local_address: AtomicCell<Option<SocketAddr>>,
    pub(crate) remote_address: AtomicCell<Option<SocketAddr>>,
    // The state is a simple enum that fits in an AtomicU8; the closed state
    // is monotonic and doubles as the read loop's termination signal.
    pub(crate) state: AtomicU8,
    // Set once by start_read_loop; a read loop is never restarted.
    pub(crate) read_loop_started: AtomicBool,
    pub(crate) reader: TokioMutex<Option<ConnectionReader>>,
    pub(crate) writer: TokioMutex<Option<ConnectionWriter>>,
    pub(crate) bytes_received: Arc<AtomicU64>,
    pub(crate) bytes_sent: Arc<AtomicU64>,
    pub(crate) events: (Sender<DiagnosticEvent>, Receiver<DiagnosticEvent>),
}

impl TcpConnection {
    /// The process-unique id of this connection.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// The pool key this connection belongs under.
    pub fn pool_key(&self) -> PoolKey {
        PoolKey::new(&self.host, self.port)
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from(self.state.load(Ordering::Relaxed))
    }

    /// Fast, non-blocking check whether the connection is closed.
    /// Never fails; a closed result is terminal.
    pub fn is_closed(&self) -> bool {
        self.state.load(Ordering::Relaxed) == ConnectionState::Closed as u8
    }

    /// The local address of the connected socket, if still known.
    pub fn local_address(&self) -> Option<SocketAddr> {
        self.local_address.load()
    }

    /// The resolved remote address of the connected socket, if still known.
    pub fn remote_address(&self) -> Option<SocketAddr> {
        self.remote_address.load()
    }

    /// Total payload and framing bytes read from the socket.
    pub fn bytes_received(&self) -> u64 {
        self.bytes_received.load(Ordering::Relaxed)
    }

    /// Total payload and framing bytes written to the socket.
    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent.load(Ordering::Relaxed)
    }

    /// Subscribes to this connection's lifecycle events.
    pub fn subscribe_events(&self) -> Receiver<DiagnosticEvent> {
        self.events.1.clone()
    }

    /// Gets the remote address as a string, or "Unknown" when the socket is
    /// gone, for log messages.
    pub(crate) fn remote_address_value(&self) -> String {
        if let Some(remote_address) = self.remote_address.load() {
            remote_address.to_string()
        } else {
            String::from("Unknown")
        }
    }

    /// Flips the state to closed. Returns true when this call performed the
    /// transition, false when the connection was closed already.
    pub(crate) fn mark_closed(&self) -> bool {
        let previous = self.state.swap(ConnectionState::Closed as u8, Ordering::AcqRel);
        previous != ConnectionState::Closed as u8
    }

    pub(crate) async fn publish_event(&self, event: DiagnosticEvent) {
        if let Err(error) = self.events.0.broadcast(event).await {
            error!("Failed to send a connection diagnostic event: {error}");
        }
    }
}
