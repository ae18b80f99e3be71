use crate::diagnostic::DiagnosticEvent;
use crate::tcp::tcp_connection::TcpConnection;
use crate::tcp::tcp_connection_fields::NAME;
use tracing::{debug, info, warn};

impl TcpConnection {
    /// Closes the connection: best-effort, idempotent, never fails.
    ///
    /// The closed state is set first so concurrent operations fail fast and
    /// the read loop observes it. Teardown then attempts each step
    /// independently: flush the output, shut down the output half, drop the
    /// input half, drop the output half. A failing step is logged and the
    /// remaining steps still run. Teardown also runs when the flag was
    /// already set, since a failed read or write flips the flag without
    /// releasing the stream halves.
    pub async fn close(&self) {
        let transitioned = self.mark_closed();

        let remote_address = self.remote_address_value();
        if transitioned {
            info!(
                "{NAME} client is closing connection: {} to server: {remote_address}...",
                self.id
            );
        }

        {
            let mut writer_guard = self.writer.lock().await;
            if let Some(writer) = writer_guard.as_mut() {
                if let Err(error) = writer.flush().await {
                    warn!(
                        "Failed to flush connection: {} to server: {remote_address}: {error}",
                        self.id
                    );
                }
                if let Err(error) = writer.shutdown().await {
                    warn!(
                        "Failed to shut down the output of connection: {} to server: {remote_address}: {error}",
                        self.id
                    );
                }
            }
            writer_guard.take();
        }

        // A running read loop has already taken the input half out of its
        // slot; the lock is only busy when a direct read is in flight, and
        // then the half drops with the connection instead of here.
        match self.reader.try_lock() {
            Ok(mut reader_guard) => {
                reader_guard.take();
            }
            Err(_) => {
                debug!(
                    "Input of connection: {} is busy; it will be dropped with the connection.",
                    self.id
                );
            }
        }

        self.local_address.store(None);
        if transitioned {
            self.publish_event(DiagnosticEvent::Disconnected).await;
            info!(
                "{NAME} client has closed connection: {} to server: {remote_address}.",
                self.id
            );
        }
    }
}
