pub mod config_pool;
pub mod connection_pool;
pub mod pool_key;

pub use config_pool::PoolConfig;
pub use connection_pool::ConnectionPool;
pub use pool_key::PoolKey;
