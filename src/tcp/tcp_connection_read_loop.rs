use crate::diagnostic::DiagnosticEvent;
use crate::error::TransportError;
use crate::tcp::tcp_connection::TcpConnection;
use crate::tcp::tcp_connection_read::read_frame_from;
use crate::tcp::tcp_connection_stream::ConnectionReader;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

/// Receives the payload of every frame a read loop decodes.
///
/// Implemented for any `Fn(Bytes)` closure; implement the trait directly
/// when the handler needs to await.
#[async_trait]
pub trait FrameHandler: Send + Sync + 'static {
    async fn on_frame(&self, payload: Bytes);
}

#[async_trait]
impl<F> FrameHandler for F
where
    F: Fn(Bytes) + Send + Sync + 'static,
{
    async fn on_frame(&self, payload: Bytes) {
        (self)(payload)
    }
}

impl TcpConnection {
    /// Spawns the background task that decodes inbound frames and hands
    /// their payloads to `handler` until the connection is closed.
    ///
    /// At most one read loop may ever be started per connection; a second
    /// call fails with [`TransportError::ReadLoopAlreadyRunning`]. The loop
    /// takes ownership of the buffered reader, so direct `read_frame` calls
    /// fail while it runs. There is no restart: a fresh connection requires
    /// a fresh read loop.
    ///
    /// The returned handle resolves when the loop terminates.
    pub async fn start_read_loop<H: FrameHandler>(
        self: Arc<Self>,
        handler: H,
    ) -> Result<JoinHandle<()>, TransportError> {
        if self.read_loop_started.swap(true, Ordering::AcqRel) {
            return Err(TransportError::ReadLoopAlreadyRunning);
        }

        // None when the connection already closed; the task then observes
        // the closed state and terminates without invoking the handler.
        let reader = self.reader.lock().await.take();
        Ok(tokio::spawn(run_read_loop(self, reader, handler)))
    }
}

async fn run_read_loop<H: FrameHandler>(
    connection: Arc<TcpConnection>,
    reader: Option<ConnectionReader>,
    handler: H,
) {
    let Some(mut reader) = reader else {
        trace!(
            "Read loop for connection: {} has no input to read; the connection is closed.",
            connection.id
        );
        return;
    };

    let read_timeout = connection.config.read_timeout;
    while !connection.is_closed() {
        match read_frame_from(&mut reader, read_timeout).await {
            Ok(payload) => handler.on_frame(payload).await,
            Err(TransportError::ReadTimeout(_)) => {
                debug!(
                    "Read loop for connection: {} timed out waiting for a frame, retrying...",
                    connection.id
                );
            }
            Err(TransportError::ConnectionClosed) => {
                // The expected shutdown path: either close() flipped the
                // state or the peer went away mid-read.
                if connection.mark_closed() {
                    connection.publish_event(DiagnosticEvent::Disconnected).await;
                }
                break;
            }
            Err(error) => {
                warn!(
                    "Read loop for connection: {} failed to read a frame: {error}, continuing...",
                    connection.id
                );
            }
        }
    }
    trace!("Read loop for connection: {} has stopped.", connection.id);
}
