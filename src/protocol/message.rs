use crate::protocol::constants::*;

/// A fully reassembled logical message
#[derive(Debug, Clone, PartialEq)]
pub struct RtmpMessage {
    pub header: MessageHeader,
    pub payload: Vec<u8>,
}

impl RtmpMessage {
    /// Create new message; the header length is taken from the payload
    pub fn new(mut header: MessageHeader, payload: Vec<u8>) -> Self {
        header.message_length = payload.len() as u32;
        RtmpMessage { header, payload }
    }

    /// Get message type
    pub fn message_type(&self) -> u8 {
        self.header.message_type
    }

    /// Get message stream ID
    pub fn message_stream_id(&self) -> u32 {
        self.header.message_stream_id
    }

    /// Get timestamp
    pub fn timestamp(&self) -> u32 {
        self.header.timestamp
    }

    /// Check if this is an audio message
    pub fn is_audio(&self) -> bool {
        self.header.message_type == MSG_TYPE_AUDIO
    }

    /// Check if this is a video message
    pub fn is_video(&self) -> bool {
        self.header.message_type == MSG_TYPE_VIDEO
    }

    /// Check if this is a command message (types 20 and 17 share one decode path)
    pub fn is_command(&self) -> bool {
        self.header.message_type == MSG_TYPE_COMMAND_AMF0
            || self.header.message_type == MSG_TYPE_COMMAND_AMF3
    }

    /// Check if this is a data message (types 18 and 15 share one decode path)
    pub fn is_data(&self) -> bool {
        self.header.message_type == MSG_TYPE_DATA_AMF0
            || self.header.message_type == MSG_TYPE_DATA_AMF3
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MessageHeader {
    pub timestamp: u32,
    pub message_length: u32,
    pub message_type: u8,
    pub message_stream_id: u32,
    pub chunk_stream_id: u32,
}

impl MessageHeader {
    /// Create new header
    pub fn new(
        timestamp: u32,
        message_length: u32,
        message_type: u8,
        message_stream_id: u32,
        chunk_stream_id: u32,
    ) -> Self {
        MessageHeader {
            timestamp,
            message_length,
            message_type,
            message_stream_id,
            chunk_stream_id,
        }
    }

    /// Create header for a protocol control message
    pub fn control(message_type: u8) -> Self {
        MessageHeader::new(0, 0, message_type, 0, CHUNK_STREAM_PROTOCOL)
    }

    /// Create header for audio message
    pub fn audio(timestamp: u32, stream_id: u32) -> Self {
        MessageHeader::new(timestamp, 0, MSG_TYPE_AUDIO, stream_id, CHUNK_STREAM_AUDIO)
    }

    /// Create header for video message
    pub fn video(timestamp: u32, stream_id: u32) -> Self {
        MessageHeader::new(timestamp, 0, MSG_TYPE_VIDEO, stream_id, CHUNK_STREAM_VIDEO)
    }

    /// Create header for command message
    pub fn command(stream_id: u32) -> Self {
        MessageHeader::new(0, 0, MSG_TYPE_COMMAND_AMF0, stream_id, CHUNK_STREAM_COMMAND)
    }

    /// Create header for data message
    pub fn data(timestamp: u32, stream_id: u32) -> Self {
        MessageHeader::new(timestamp, 0, MSG_TYPE_DATA_AMF0, stream_id, CHUNK_STREAM_DATA)
    }

    /// Check if timestamp needs the extended field (>= 0xFFFFFF)
    pub fn has_extended_timestamp(&self) -> bool {
        self.timestamp >= EXTENDED_TIMESTAMP
    }

    /// Get timestamp for wire format
    pub fn wire_timestamp(&self) -> u32 {
        if self.has_extended_timestamp() {
            EXTENDED_TIMESTAMP
        } else {
            self.timestamp
        }
    }
}
