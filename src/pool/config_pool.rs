use crate::tcp::config_connection::TcpConnectionConfig;
use std::time::Duration;

/// Configuration for the keyed connection pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Maximum number of connections per (host, port) key, idle and
    /// borrowed combined. Values below 1 are treated as 1.
    /// Default: 8.
    pub max_per_key: usize,

    /// Number of idle connections `prewarm` establishes per key.
    /// Default: 0 (lazy pool).
    pub min_idle_per_key: usize,

    /// How long a borrow waits for capacity before failing with
    /// `PoolExhausted`. Default: 30 seconds.
    pub borrow_timeout: Duration,

    /// Connection-level configuration forwarded to every `open`.
    pub connection: TcpConnectionConfig,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_per_key: 8,
            min_idle_per_key: 0,
            borrow_timeout: Duration::from_secs(30),
            connection: TcpConnectionConfig::default(),
        }
    }
}
