use std::sync::atomic::AtomicU64;

pub(crate) const NAME: &str = "Framelink";

/// A frame is a 4-byte big-endian payload length followed by the payload.
pub(crate) const FRAME_HEADER_BYTES: usize = 4;

/// Capacity of the per-connection diagnostic event channel.
pub(crate) const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Source of process-unique connection ids, used for log correlation.
pub(crate) static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);
