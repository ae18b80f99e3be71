use crate::tcp::config_socket::TcpSocketConfig;
use socket2::SockRef;
use tokio::net::{TcpSocket, TcpStream};
use tracing::{debug, warn};

/// Applies the configured buffer sizes to a not-yet-connected socket.
///
/// Buffer sizes are set before connect so the kernel can negotiate the TCP
/// window from them. Failures are logged and tolerated: a connection with
/// default-sized buffers still works.
pub(crate) fn apply_socket_options(socket: &TcpSocket, config: &TcpSocketConfig) {
    if let Err(error) = socket.set_send_buffer_size(config.send_buffer_bytes) {
        warn!(
            "Failed to set SO_SNDBUF to {}: {error}, continuing...",
            config.send_buffer_bytes
        );
    }
    if let Err(error) = socket.set_recv_buffer_size(config.receive_buffer_bytes) {
        warn!(
            "Failed to set SO_RCVBUF to {}: {error}, continuing...",
            config.receive_buffer_bytes
        );
    }
}

/// Applies the configured stream-level options to a connected socket.
pub(crate) fn apply_stream_options(stream: &TcpStream, config: &TcpSocketConfig) {
    if let Err(error) = stream.set_nodelay(config.nodelay) {
        warn!(
            "Failed to set TCP_NODELAY to {}: {error}, continuing...",
            config.nodelay
        );
    }

    let socket = SockRef::from(stream);
    if let Err(error) = socket.set_keepalive(config.keepalive) {
        warn!(
            "Failed to set SO_KEEPALIVE to {}: {error}, continuing...",
            config.keepalive
        );
    }

    debug!(
        "Applied socket options: nodelay={}, keepalive={}, send_buffer={}, receive_buffer={}",
        config.nodelay, config.keepalive, config.send_buffer_bytes, config.receive_buffer_bytes
    );
}
