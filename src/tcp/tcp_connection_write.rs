use crate::diagnostic::DiagnosticEvent;
use crate::error::TransportError;
use crate::payload::Payload;
use crate::tcp::tcp_connection::TcpConnection;
use crate::tcp::tcp_connection_fields::FRAME_HEADER_BYTES;
use bytes::{BufMut, BytesMut};
use tracing::trace;

impl TcpConnection {
    /// Writes the payload's bytes to the output stream verbatim.
    ///
    /// This is the byte sink underneath framing: no length prefix is added,
    /// so callers composing frames by hand are responsible for their own
    /// boundaries. When `flush` is true the buffered writer is flushed
    /// before returning.
    pub async fn write(&self, payload: &Payload, flush: bool) -> Result<(), TransportError> {
        if self.is_closed() {
            trace!("Cannot write data. Connection: {} is closed.", self.id);
            return Err(TransportError::ConnectionClosed);
        }

        let mut writer_guard = self.writer.lock().await;
        let Some(writer) = writer_guard.as_mut() else {
            return Err(TransportError::ConnectionClosed);
        };
        let mut result = writer.write(payload.as_bytes()).await;
        if result.is_ok() && flush {
            result = writer.flush().await;
        }
        drop(writer_guard);
        self.observe_write_result(result).await
    }

    /// Writes the payload as one frame: a 4-byte big-endian length prefix
    /// followed by the payload bytes, assembled into a single buffer and
    /// written with one call.
    pub async fn write_frame(&self, payload: &Payload, flush: bool) -> Result<(), TransportError> {
        if self.is_closed() {
            trace!("Cannot send a frame. Connection: {} is closed.", self.id);
            return Err(TransportError::ConnectionClosed);
        }

        let body = payload.as_bytes();
        let length = u32::try_from(body.len())
            .map_err(|_| TransportError::PayloadTooLarge(body.len()))?;

        let mut frame = BytesMut::with_capacity(FRAME_HEADER_BYTES + body.len());
        frame.put_u32(length);
        frame.extend_from_slice(body);

        if tracing::enabled!(tracing::Level::TRACE) {
            trace!(
                "Sending a frame with payload size: {length} on connection: {}",
                self.id
            );
        }

        let mut writer_guard = self.writer.lock().await;
        let Some(writer) = writer_guard.as_mut() else {
            return Err(TransportError::ConnectionClosed);
        };
        let mut result = writer.write(&frame).await;
        if result.is_ok() && flush {
            result = writer.flush().await;
        }
        drop(writer_guard);
        self.observe_write_result(result).await
    }

    /// A closed stream is terminal: flip the flag so the pool's liveness
    /// check stops handing this connection out.
    async fn observe_write_result(
        &self,
        result: Result<(), TransportError>,
    ) -> Result<(), TransportError> {
        if matches!(result, Err(TransportError::ConnectionClosed)) && self.mark_closed() {
            self.publish_event(DiagnosticEvent::Disconnected).await;
        }
        result
    }
}
