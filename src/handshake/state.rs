/// Server-side handshake progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HandshakeState {
    /// Waiting for C0
    #[default]
    Uninitialized,

    /// Have C0, waiting for the 1536-byte C1
    C0Received,

    /// Sent S0+S1+S2, waiting for C2
    C1Received,

    /// Received C2, chunk data follows
    Complete,
}

impl HandshakeState {
    /// Initial state
    pub fn new() -> Self {
        HandshakeState::Uninitialized
    }

    /// Check if handshake is complete
    pub fn is_complete(&self) -> bool {
        *self == HandshakeState::Complete
    }

    /// Number of buffered bytes required to leave this state
    pub fn bytes_needed(&self) -> usize {
        match self {
            HandshakeState::Uninitialized => 1,
            HandshakeState::C0Received | HandshakeState::C1Received => crate::HANDSHAKE_SIZE,
            HandshakeState::Complete => 0,
        }
    }
}
