use crate::tcp::config_socket::TcpSocketConfig;
use std::time::Duration;

/// Configuration for a single TCP connection.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TcpConnectionConfig {
    /// Socket options applied when the connection is opened.
    pub socket: TcpSocketConfig,

    /// Timeout applied to each read performed by `read_frame` and by the
    /// read loop. Default: 30 seconds.
    pub read_timeout: Duration,
}

impl Default for TcpConnectionConfig {
    fn default() -> Self {
        Self {
            socket: TcpSocketConfig::default(),
            read_timeout: Duration::from_secs(30),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_read_timeout_is_thirty_seconds() {
        assert_eq!(TcpConnectionConfig::default().read_timeout, Duration::from_secs(30));
    }
}
