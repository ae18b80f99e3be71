use derive_more::Display;

/// Lifecycle events a connection broadcasts to its subscribers.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Display)]
pub enum DiagnosticEvent {
    /// The socket connected.
    #[display("connected")]
    Connected,
    /// The connection was closed, locally or by the peer.
    #[display("disconnected")]
    Disconnected,
}
