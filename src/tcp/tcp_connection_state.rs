use derive_more::Display;

/// The state of a connection.
///
/// The state is monotonic: a connection starts open and can only move to
/// closed, never back.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Display)]
#[repr(u8)]
pub enum ConnectionState {
    /// The connection is open and usable.
    #[display("open")]
    Open = 0,
    /// The connection has been closed; every further operation fails.
    #[display("closed")]
    Closed = 1,
}

impl From<ConnectionState> for u8 {
    fn from(value: ConnectionState) -> Self {
        value as u8
    }
}

impl From<u8> for ConnectionState {
    fn from(value: u8) -> Self {
        match value {
            0 => ConnectionState::Open,
            1 => ConnectionState::Closed,
            // Closed is the safe fallback for values outside the enum range.
            _ => ConnectionState::Closed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_u8() {
        assert_eq!(ConnectionState::from(u8::from(ConnectionState::Open)), ConnectionState::Open);
        assert_eq!(
            ConnectionState::from(u8::from(ConnectionState::Closed)),
            ConnectionState::Closed
        );
    }

    #[test]
    fn unknown_discriminants_fall_back_to_closed() {
        assert_eq!(ConnectionState::from(42), ConnectionState::Closed);
    }
}
