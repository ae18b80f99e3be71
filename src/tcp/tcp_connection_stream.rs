use crate::error::TransportError;
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::{error, trace};

/// Error kinds that mean the peer or the OS tore the connection down.
pub(crate) fn is_closed_error(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::UnexpectedEof
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
            | ErrorKind::NotConnected
    )
}

/// Buffered, byte-counting input half of a connection.
#[derive(Debug)]
pub(crate) struct ConnectionReader {
    peer_address: SocketAddr,
    reader: BufReader<OwnedReadHalf>,
    bytes_received: Arc<AtomicU64>,
}

/// Buffered, byte-counting output half of a connection.
#[derive(Debug)]
pub(crate) struct ConnectionWriter {
    peer_address: SocketAddr,
    writer: BufWriter<OwnedWriteHalf>,
    bytes_sent: Arc<AtomicU64>,
}

/// Splits a connected stream into counting reader and writer halves.
pub(crate) fn split_stream(
    peer_address: SocketAddr,
    stream: TcpStream,
    bytes_received: Arc<AtomicU64>,
    bytes_sent: Arc<AtomicU64>,
) -> (ConnectionReader, ConnectionWriter) {
    let (read_half, write_half) = stream.into_split();
    (
        ConnectionReader {
            peer_address,
            reader: BufReader::new(read_half),
            bytes_received,
        },
        ConnectionWriter {
            peer_address,
            writer: BufWriter::new(write_half),
            bytes_sent,
        },
    )
}

impl ConnectionReader {
    pub async fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), TransportError> {
        self.reader.read_exact(buf).await.map_err(|error| {
            if is_closed_error(error.kind()) {
                trace!(
                    "Connection to {} was closed while reading: {error}",
                    self.peer_address
                );
                TransportError::ConnectionClosed
            } else {
                error!(
                    "Failed to read data from the TCP connection to {}: {error}",
                    self.peer_address
                );
                TransportError::Tcp
            }
        })?;
        self.bytes_received.fetch_add(buf.len() as u64, Ordering::Relaxed);
        Ok(())
    }
}

impl ConnectionWriter {
    pub async fn write(&mut self, buf: &[u8]) -> Result<(), TransportError> {
        self.writer.write_all(buf).await.map_err(|error| {
            if is_closed_error(error.kind()) {
                trace!(
                    "Connection to {} was closed while writing: {error}",
                    self.peer_address
                );
                TransportError::ConnectionClosed
            } else {
                error!(
                    "Failed to write data to the TCP connection to {}: {error}",
                    self.peer_address
                );
                TransportError::Tcp
            }
        })?;
        self.bytes_sent.fetch_add(buf.len() as u64, Ordering::Relaxed);
        Ok(())
    }

    pub async fn flush(&mut self) -> Result<(), TransportError> {
        self.writer.flush().await.map_err(|error| {
            if is_closed_error(error.kind()) {
                trace!(
                    "Connection to {} was closed while flushing: {error}",
                    self.peer_address
                );
                TransportError::ConnectionClosed
            } else {
                error!(
                    "Failed to flush data to the TCP connection to {}: {error}",
                    self.peer_address
                );
                TransportError::Tcp
            }
        })
    }

    pub async fn shutdown(&mut self) -> Result<(), TransportError> {
        self.writer.shutdown().await.map_err(|error| {
            error!(
                "Failed to shut down the TCP connection to {}: {error}",
                self.peer_address
            );
            TransportError::Tcp
        })
    }
}
