use crate::diagnostic::DiagnosticEvent;
use crate::error::TransportError;
use crate::tcp::config_connection::TcpConnectionConfig;
use crate::tcp::socket_options::{apply_socket_options, apply_stream_options};
use crate::tcp::tcp_connection::TcpConnection;
use crate::tcp::tcp_connection_fields::{EVENT_CHANNEL_CAPACITY, NAME, NEXT_CONNECTION_ID};
use crate::tcp::tcp_connection_state::ConnectionState;
use crate::tcp::tcp_connection_stream::split_stream;
use async_broadcast::broadcast;
use crossbeam_utils::atomic::AtomicCell;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use tokio::net::{lookup_host, TcpSocket};
use tokio::sync::Mutex as TokioMutex;
use tracing::{error, info};

impl TcpConnection {
    /// Opens a connection to `host:port`, applying the configured socket
    /// options, and wraps the stream in buffered, byte-counting halves.
    ///
    /// Awaits until the socket connects. Fails with
    /// [`TransportError::CannotEstablishConnection`] when the address cannot
    /// be resolved or the connect fails.
    pub async fn open(
        host: &str,
        port: u16,
        config: Arc<TcpConnectionConfig>,
    ) -> Result<Self, TransportError> {
        let address = format!("{host}:{port}");
        info!("{NAME} client is connecting to server: {address}...");

        let remote_address = lookup_host((host, port))
            .await
            .map_err(|err| {
                error!("Failed to resolve server address: {address}. {err}");
                TransportError::CannotEstablishConnection(address.clone())
            })?
            .next()
            .ok_or_else(|| {
                error!("Server address: {address} resolved to no usable address.");
                TransportError::CannotEstablishConnection(address.clone())
            })?;

        let socket = match remote_address {
            SocketAddr::V4(_) => TcpSocket::new_v4(),
            SocketAddr::V6(_) => TcpSocket::new_v6(),
        }
        .map_err(|err| {
            error!("Failed to create a TCP socket for {address}: {err}");
            TransportError::CannotEstablishConnection(address.clone())
        })?;

        // Buffer sizes must be in place before the handshake.
        apply_socket_options(&socket, &config.socket);

        let stream = socket.connect(remote_address).await.map_err(|err| {
            error!("Failed to establish TCP connection to the server: {address}. {err}");
            TransportError::CannotEstablishConnection(address.clone())
        })?;
        let local_address = stream.local_addr().map_err(|err| {
            error!("Failed to get the local address of the connection to {address}: {err}");
            TransportError::CannotEstablishConnection(address.clone())
        })?;

        apply_stream_options(&stream, &config.socket);

        let bytes_received = Arc::new(AtomicU64::new(0));
        let bytes_sent = Arc::new(AtomicU64::new(0));
        let (reader, writer) = split_stream(
            remote_address,
            stream,
            bytes_received.clone(),
            bytes_sent.clone(),
        );

        let (mut events_sender, events_receiver) = broadcast(EVENT_CHANNEL_CAPACITY);
        // The receiver kept inside the connection never consumes; overflow
        // mode keeps publishing from blocking on it.
        events_sender.set_overflow(true);

        let connection = Self {
            id: NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
            host: host.to_owned(),
            port,
            config,
            local_address: AtomicCell::new(Some(local_address)),
            remote_address: AtomicCell::new(Some(remote_address)),
            state: AtomicU8::new(ConnectionState::Open as u8),
            read_loop_started: AtomicBool::new(false),
            reader: TokioMutex::new(Some(reader)),
            writer: TokioMutex::new(Some(writer)),
            bytes_received,
            bytes_sent,
            events: (events_sender, events_receiver),
        };

        info!(
            "{NAME} client: {local_address} has connected to server: {remote_address} as connection: {}",
            connection.id
        );
        connection.publish_event(DiagnosticEvent::Connected).await;
        Ok(connection)
    }
}
