/// TCP socket configuration applied when a connection is opened.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TcpSocketConfig {
    /// Size of the socket send buffer in bytes (SO_SNDBUF).
    /// Default: 2 MiB (2097152 bytes).
    pub send_buffer_bytes: u32,

    /// Size of the socket receive buffer in bytes (SO_RCVBUF).
    /// Default: 2 MiB (2097152 bytes).
    pub receive_buffer_bytes: u32,

    /// Enable/disable TCP_NODELAY to disable Nagle's algorithm.
    /// Default: true (enabled) for lower latency.
    pub nodelay: bool,

    /// Enable/disable TCP keepalive (SO_KEEPALIVE).
    /// Default: true (enabled) to detect stale connections.
    pub keepalive: bool,
}

impl TcpSocketConfig {
    /// Configuration tuned for low-latency request/response traffic:
    /// small buffers, Nagle's algorithm disabled.
    pub fn for_low_latency() -> Self {
        Self {
            send_buffer_bytes: 64 * 1024,
            receive_buffer_bytes: 64 * 1024,
            nodelay: true,
            keepalive: true,
        }
    }

    /// Configuration tuned for bulk throughput: large buffers, Nagle's
    /// algorithm left on for better packet coalescing.
    pub fn for_high_throughput() -> Self {
        Self {
            send_buffer_bytes: 8 * 1024 * 1024,
            receive_buffer_bytes: 8 * 1024 * 1024,
            nodelay: false,
            keepalive: true,
        }
    }
}

impl Default for TcpSocketConfig {
    fn default() -> Self {
        Self {
            // 2 MiB for both directions: large enough that the OS socket
            // buffer, not this layer, provides the backpressure under load.
            send_buffer_bytes: 2 * 1024 * 1024,
            receive_buffer_bytes: 2 * 1024 * 1024,
            nodelay: true,
            keepalive: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_two_mebibyte_buffers() {
        let config = TcpSocketConfig::default();
        assert_eq!(config.send_buffer_bytes, 2 * 1024 * 1024);
        assert_eq!(config.receive_buffer_bytes, 2 * 1024 * 1024);
        assert!(config.nodelay);
        assert!(config.keepalive);
    }

    #[test]
    fn presets_differ_in_buffering_strategy() {
        let latency = TcpSocketConfig::for_low_latency();
        let throughput = TcpSocketConfig::for_high_throughput();
        assert!(latency.send_buffer_bytes < throughput.send_buffer_bytes);
        assert!(latency.nodelay);
        assert!(!throughput.nodelay);
    }
}
