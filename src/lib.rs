//! # framelink
//!
//! Pooled TCP transport with length-prefixed framing.
//!
//! A [`TcpConnection`] carries frames of the form `u32 big-endian length ||
//! payload` over a plain TCP stream. Frames can be read inline or delivered
//! to a [`FrameHandler`] by a background read loop. The [`ConnectionPool`]
//! reuses connections per destination under a per-key cap.
//!
//! ## Example
//!
//! ```ignore
//! use framelink::{ConnectionPool, Payload, PoolConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), framelink::TransportError> {
//!     let pool = ConnectionPool::new(PoolConfig::default());
//!     let connection = pool.borrow("localhost", 8090).await?;
//!     connection
//!         .write_frame(&Payload::Text("hello world".to_owned()), true)
//!         .await?;
//!     let reply = connection.read_frame().await?;
//!     println!("received {} bytes", reply.len());
//!     pool.release("localhost", 8090, connection).await;
//!     pool.close().await;
//!     Ok(())
//! }
//! ```

pub mod diagnostic;
pub mod error;
pub mod payload;
pub mod pool;
pub mod tcp;

pub use diagnostic::DiagnosticEvent;
pub use error::TransportError;
pub use payload::Payload;
pub use pool::{ConnectionPool, PoolConfig, PoolKey};
pub use tcp::config_connection::TcpConnectionConfig;
pub use tcp::config_socket::TcpSocketConfig;
pub use tcp::tcp_connection::TcpConnection;
pub use tcp::{ConnectionState, FrameHandler};
