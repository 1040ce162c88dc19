use crate::protocol::constants::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    /// Protocol control messages (1-6)
    Control,

    /// Audio data
    Audio,

    /// Video data
    Video,

    /// Command (AMF0, and type 17 read the same way)
    Command,

    /// Data (AMF0, and type 15 read the same way)
    Data,

    /// Aggregate message
    Aggregate,

    /// Shared object (AMF0/AMF3)
    SharedObject,

    /// Unknown type
    Unknown(u8),
}

impl MessageType {
    /// Create from message type ID
    pub fn from_id(id: u8) -> Self {
        match id {
            MSG_TYPE_SET_CHUNK_SIZE..=MSG_TYPE_SET_PEER_BW => MessageType::Control,
            MSG_TYPE_AUDIO => MessageType::Audio,
            MSG_TYPE_VIDEO => MessageType::Video,
            MSG_TYPE_COMMAND_AMF0 | MSG_TYPE_COMMAND_AMF3 => MessageType::Command,
            MSG_TYPE_DATA_AMF0 | MSG_TYPE_DATA_AMF3 => MessageType::Data,
            MSG_TYPE_AGGREGATE => MessageType::Aggregate,
            MSG_TYPE_SHARED_OBJECT_AMF0 | MSG_TYPE_SHARED_OBJECT_AMF3 => MessageType::SharedObject,
            _ => MessageType::Unknown(id),
        }
    }

    /// Check if this is a media message (audio/video)
    pub fn is_media(&self) -> bool {
        matches!(self, MessageType::Audio | MessageType::Video)
    }
}
