use byteorder::{BigEndian, ByteOrder};
use rand::RngCore;
use crate::protocol::{HANDSHAKE_SIZE, RTMP_VERSION};
use crate::utils::current_timestamp;
use crate::{Error, Result};

/// Length of the random/echo section of C1/S1/C2/S2
pub const HANDSHAKE_RANDOM_SIZE: usize = HANDSHAKE_SIZE - 8;

/// Fill a buffer of `len` random bytes
pub fn generate_random_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    rand::rng().fill_bytes(&mut bytes);
    bytes
}

/// One 1536-byte handshake block: timestamp, second word, random/echo bytes.
///
/// In C1/S1 the second word is zero; in C2/S2 it carries the sender's own
/// timestamp and the random section echoes the peer's block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeBlock {
    pub timestamp: u32,
    pub timestamp2: u32,
    pub random: Vec<u8>,
}

impl HandshakeBlock {
    /// Parse a block from exactly 1536 bytes
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() != HANDSHAKE_SIZE {
            return Err(Error::handshake(format!(
                "Handshake block must be {} bytes, got {}",
                HANDSHAKE_SIZE,
                data.len()
            )));
        }

        Ok(HandshakeBlock {
            timestamp: BigEndian::read_u32(&data[0..4]),
            timestamp2: BigEndian::read_u32(&data[4..8]),
            random: data[8..].to_vec(),
        })
    }

    /// Fresh C1/S1 with our timestamp and new random bytes
    pub fn generate() -> Self {
        HandshakeBlock {
            timestamp: current_timestamp(),
            timestamp2: 0,
            random: generate_random_bytes(HANDSHAKE_RANDOM_SIZE),
        }
    }

    /// C2/S2 answering the peer's C1/S1
    pub fn echo(peer: &HandshakeBlock) -> Self {
        HandshakeBlock {
            timestamp: peer.timestamp,
            timestamp2: current_timestamp(),
            random: peer.random.clone(),
        }
    }

    pub fn write_to(&self, out: &mut Vec<u8>) {
        let mut words = [0u8; 8];
        BigEndian::write_u32(&mut words[0..4], self.timestamp);
        BigEndian::write_u32(&mut words[4..8], self.timestamp2);
        out.extend_from_slice(&words);
        out.extend_from_slice(&self.random);
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HANDSHAKE_SIZE);
        self.write_to(&mut out);
        out
    }
}

/// Build the single S0+S1+S2 write answering C1
pub fn generate_s0s1s2(c1: &HandshakeBlock) -> Vec<u8> {
    let s1 = HandshakeBlock::generate();
    let s2 = HandshakeBlock::echo(c1);

    let mut out = Vec::with_capacity(1 + HANDSHAKE_SIZE * 2);
    out.push(RTMP_VERSION);
    s1.write_to(&mut out);
    s2.write_to(&mut out);
    out
}
