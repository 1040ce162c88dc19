use log::warn;
use crate::protocol::{MessageHeader, RtmpMessage};

/// Reassembly context for one chunk stream id.
///
/// Keeps the last header seen on the id so that format 1-3 chunks can
/// inherit the fields they omit, plus the partial payload of the message
/// currently being assembled.
#[derive(Debug, Clone)]
pub struct ChunkStreamState {
    /// Format of the last chunk header on this id
    pub format: u8,

    /// Last full header; timestamp is absolute
    pub header: MessageHeader,

    /// Timestamp delta carried by the last format 1/2 header
    pub timestamp_delta: u32,

    /// Whether the last header used the extended timestamp field
    pub extended_timestamp: bool,

    /// Partial message being assembled
    payload: Vec<u8>,

    /// Bytes still missing from the current message
    bytes_remaining: usize,
}

impl ChunkStreamState {
    /// Create new context for a chunk stream id
    pub fn new(chunk_stream_id: u32) -> Self {
        ChunkStreamState {
            format: 0,
            header: MessageHeader {
                chunk_stream_id,
                ..MessageHeader::default()
            },
            timestamp_delta: 0,
            extended_timestamp: false,
            payload: Vec::new(),
            bytes_remaining: 0,
        }
    }

    /// Check if currently assembling a message
    pub fn is_assembling(&self) -> bool {
        self.bytes_remaining > 0
    }

    pub fn bytes_remaining(&self) -> usize {
        self.bytes_remaining
    }

    /// Start new message with the given header
    pub fn start_message(&mut self, header: MessageHeader) {
        if self.is_assembling() {
            warn!(
                "Chunk stream {}: new message header with {} bytes of the previous message missing, discarding it",
                header.chunk_stream_id, self.bytes_remaining
            );
        }
        self.header = header;
        self.bytes_remaining = header.message_length as usize;
        self.payload.clear();
        // Length comes from the peer; grow as slices arrive past 64 KiB
        self.payload.reserve(self.bytes_remaining.min(64 * 1024));
    }

    /// Append one chunk slice; returns the message once complete
    pub fn add_chunk_data(&mut self, data: &[u8]) -> Option<RtmpMessage> {
        let take = data.len().min(self.bytes_remaining);
        self.payload.extend_from_slice(&data[..take]);
        self.bytes_remaining -= take;

        if self.bytes_remaining == 0 {
            Some(RtmpMessage::new(self.header, std::mem::take(&mut self.payload)))
        } else {
            None
        }
    }

    /// Drop the partial message (abort message)
    pub fn abort(&mut self) {
        self.payload.clear();
        self.bytes_remaining = 0;
    }
}
