#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Handshake in progress
    Handshaking,

    /// Handshake done, waiting for `connect`
    Connecting,

    /// Connected, neither publishing nor playing
    Connected,

    /// Publishing stream
    Publishing,

    /// Playing stream
    Playing,

    /// Session stopped
    Closed,
}

impl SessionState {
    /// Check if connected
    pub fn is_connected(&self) -> bool {
        matches!(self,
            SessionState::Connected |
            SessionState::Publishing |
            SessionState::Playing)
    }

    pub fn is_closed(&self) -> bool {
        *self == SessionState::Closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connected_states() {
        assert!(!SessionState::Handshaking.is_connected());
        assert!(!SessionState::Connecting.is_connected());
        assert!(SessionState::Publishing.is_connected());
        assert!(SessionState::Closed.is_closed());
    }
}
