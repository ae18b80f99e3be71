use crate::diagnostic::DiagnosticEvent;
use crate::error::TransportError;
use crate::tcp::tcp_connection::TcpConnection;
use crate::tcp::tcp_connection_fields::FRAME_HEADER_BYTES;
use crate::tcp::tcp_connection_stream::ConnectionReader;
use bytes::{Bytes, BytesMut};
use std::time::Duration;
use tokio::time::timeout;

impl TcpConnection {
    /// Reads one frame using the configured default read timeout.
    pub async fn read_frame(&self) -> Result<Bytes, TransportError> {
        self.read_frame_with_timeout(self.config.read_timeout).await
    }

    /// Reads one frame: a 4-byte big-endian payload length, then exactly
    /// that many payload bytes. Each of the two reads is bounded by
    /// `read_timeout` independently.
    ///
    /// Fails with [`TransportError::ReadTimeout`] when a read exceeds the
    /// timeout, [`TransportError::ConnectionClosed`] when the connection is
    /// or becomes closed, and [`TransportError::Tcp`] on other socket
    /// failures.
    pub async fn read_frame_with_timeout(
        &self,
        read_timeout: Duration,
    ) -> Result<Bytes, TransportError> {
        if self.is_closed() {
            return Err(TransportError::ConnectionClosed);
        }

        let mut reader_guard = self.reader.lock().await;
        let Some(reader) = reader_guard.as_mut() else {
            // The reader is gone either because the connection closed or
            // because a read loop took ownership of it.
            return if self.is_closed() {
                Err(TransportError::ConnectionClosed)
            } else {
                Err(TransportError::ReadLoopAlreadyRunning)
            };
        };
        let result = read_frame_from(reader, read_timeout).await;
        drop(reader_guard);

        // A closed stream is terminal: flip the flag so the pool's liveness
        // check stops handing this connection out.
        if matches!(result, Err(TransportError::ConnectionClosed)) && self.mark_closed() {
            self.publish_event(DiagnosticEvent::Disconnected).await;
        }
        result
    }
}

/// Decodes one frame from the reader. Shared between the direct read path
/// and the read loop, which owns its reader outright.
pub(crate) async fn read_frame_from(
    reader: &mut ConnectionReader,
    read_timeout: Duration,
) -> Result<Bytes, TransportError> {
    let mut header = [0u8; FRAME_HEADER_BYTES];
    read_exact_timed(reader, &mut header, read_timeout).await?;
    let length = u32::from_be_bytes(header);

    // Empty frames are legal and carry no payload bytes.
    if length == 0 {
        return Ok(Bytes::new());
    }

    let mut payload = BytesMut::zeroed(length as usize);
    read_exact_timed(reader, &mut payload, read_timeout).await?;
    Ok(payload.freeze())
}

async fn read_exact_timed(
    reader: &mut ConnectionReader,
    buf: &mut [u8],
    read_timeout: Duration,
) -> Result<(), TransportError> {
    match timeout(read_timeout, reader.read_exact(buf)).await {
        Ok(result) => result,
        Err(_) => Err(TransportError::ReadTimeout(read_timeout)),
    }
}
