pub mod config_connection;
pub mod config_socket;
mod socket_options;
pub mod tcp_connection;
mod tcp_connection_close;
mod tcp_connection_fields;
mod tcp_connection_open;
mod tcp_connection_read;
mod tcp_connection_read_loop;
mod tcp_connection_state;
mod tcp_connection_stream;
mod tcp_connection_write;

pub use tcp_connection_read_loop::FrameHandler;
pub use tcp_connection_state::ConnectionState;
