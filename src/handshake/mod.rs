mod packets;
mod state;

pub use packets::*;
pub use state::*;

use log::{debug, warn};
use crate::protocol::{HANDSHAKE_SIZE, RTMP_VERSION};
use crate::{Error, InputBuffer, Result};

/// Simple (non-digest) server handshake.
///
/// Each stage waits until its whole block is buffered; nothing is consumed
/// from the input before that.
#[derive(Debug, Default)]
pub struct Handshake {
    state: HandshakeState,
}

impl Handshake {
    pub fn new() -> Self {
        Handshake::default()
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    pub fn is_complete(&self) -> bool {
        self.state.is_complete()
    }

    /// Advance through as many stages as the buffered input allows.
    /// S0+S1+S2 is appended to `output` when C1 has arrived.
    pub fn process(&mut self, input: &mut InputBuffer, output: &mut Vec<u8>) -> Result<HandshakeState> {
        loop {
            if self.state.is_complete() || !input.has(self.state.bytes_needed()) {
                return Ok(self.state);
            }

            match self.state {
                HandshakeState::Uninitialized => {
                    let c0 = input.take(1)?[0];
                    if c0 != RTMP_VERSION {
                        warn!("Client requested RTMP version {}, answering with {}", c0, RTMP_VERSION);
                    }
                    self.state = HandshakeState::C0Received;
                }
                HandshakeState::C0Received => {
                    let c1 = HandshakeBlock::parse(&input.take(HANDSHAKE_SIZE)?)?;
                    debug!("Received C1 (timestamp {})", c1.timestamp);
                    output.extend_from_slice(&generate_s0s1s2(&c1));
                    self.state = HandshakeState::C1Received;
                }
                HandshakeState::C1Received => {
                    input.consume(HANDSHAKE_SIZE);
                    debug!("Received C2, handshake complete");
                    self.state = HandshakeState::Complete;
                }
                HandshakeState::Complete => {
                    return Err(Error::invalid_state("Handshake already complete"));
                }
            }
        }
    }
}
