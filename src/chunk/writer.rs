use byteorder::{BigEndian, ByteOrder, LittleEndian};
use crate::protocol::{RtmpMessage, DEFAULT_CHUNK_SIZE, EXTENDED_TIMESTAMP};

/// Splits messages into chunks: a format 0 header on the first slice and
/// a format 3 header before every following slice.
#[derive(Debug, Clone)]
pub struct ChunkEncoder {
    /// Current chunk size for writing
    chunk_size_out: usize,
}

impl Default for ChunkEncoder {
    fn default() -> Self {
        ChunkEncoder::new()
    }
}

impl ChunkEncoder {
    /// Create new chunk encoder at the protocol default chunk size
    pub fn new() -> Self {
        ChunkEncoder::with_chunk_size(DEFAULT_CHUNK_SIZE)
    }

    pub fn with_chunk_size(size: u32) -> Self {
        ChunkEncoder {
            chunk_size_out: size.max(1) as usize,
        }
    }

    /// Set outgoing chunk size
    pub fn set_chunk_size(&mut self, size: u32) {
        self.chunk_size_out = size.max(1) as usize;
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size_out
    }

    /// Encode a message into a fresh buffer
    pub fn encode(&self, message: &RtmpMessage) -> Vec<u8> {
        let slices = message.payload.len().div_ceil(self.chunk_size_out).max(1);
        let mut out = Vec::with_capacity(message.payload.len() + 16 + slices * 8);
        self.encode_into(message, &mut out);
        out
    }

    /// Append the chunks of a message to `out`
    pub fn encode_into(&self, message: &RtmpMessage, out: &mut Vec<u8>) {
        let header = &message.header;
        let csid = header.chunk_stream_id;
        let extended = header.has_extended_timestamp();

        let mut extended_bytes = [0u8; 4];
        BigEndian::write_u32(&mut extended_bytes, header.timestamp);

        // Format 0 message header (11 bytes)
        let mut fields = [0u8; 11];
        BigEndian::write_u24(&mut fields[0..3], header.wire_timestamp());
        BigEndian::write_u24(&mut fields[3..6], message.payload.len() as u32);
        fields[6] = header.message_type;
        LittleEndian::write_u32(&mut fields[7..11], header.message_stream_id);

        write_basic_header(out, 0, csid);
        out.extend_from_slice(&fields);
        if extended {
            out.extend_from_slice(&extended_bytes);
        }

        let mut slices = message.payload.chunks(self.chunk_size_out);
        if let Some(first) = slices.next() {
            out.extend_from_slice(first);
        }
        for slice in slices {
            write_basic_header(out, 3, csid);
            if extended {
                out.extend_from_slice(&extended_bytes);
            }
            out.extend_from_slice(slice);
        }
    }
}

/// Encode basic header
pub fn write_basic_header(out: &mut Vec<u8>, fmt: u8, cs_id: u32) {
    if cs_id <= 63 {
        // 1-byte header
        out.push((fmt << 6) | (cs_id as u8));
    } else if cs_id <= 319 {
        // 2-byte header
        out.push(fmt << 6);
        out.push((cs_id - 64) as u8);
    } else {
        // 3-byte header
        let id = (cs_id - 64) as u16;
        out.push((fmt << 6) | 1);
        out.extend_from_slice(&id.to_le_bytes());
    }
}
