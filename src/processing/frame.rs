use crate::processing::audio::AudioFrame;
use crate::processing::video::VideoFrame;
use crate::protocol::{MessageHeader, RtmpMessage};

/// Role of a frame in decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// Codec configuration (sequence header) or stream metadata
    Config,
    Key,
    Inter,
}

/// Stream metadata, already encoded as an `onMetaData` data message payload
#[derive(Debug, Clone, PartialEq)]
pub struct MetaDataFrame {
    pub timestamp: u32,
    pub data: Vec<u8>,
}

/// A unit of media produced by a publisher and fanned out to players
#[derive(Debug, Clone, PartialEq)]
pub enum MediaFrame {
    Video(VideoFrame),
    Audio(AudioFrame),
    MetaData(MetaDataFrame),
}

impl MediaFrame {
    pub fn timestamp(&self) -> u32 {
        match self {
            MediaFrame::Video(frame) => frame.timestamp,
            MediaFrame::Audio(frame) => frame.timestamp,
            MediaFrame::MetaData(frame) => frame.timestamp,
        }
    }

    pub fn payload(&self) -> &[u8] {
        match self {
            MediaFrame::Video(frame) => &frame.data,
            MediaFrame::Audio(frame) => &frame.data,
            MediaFrame::MetaData(frame) => &frame.data,
        }
    }

    pub fn kind(&self) -> FrameKind {
        match self {
            MediaFrame::MetaData(_) => FrameKind::Config,
            _ if self.is_sequence_header() => FrameKind::Config,
            MediaFrame::Video(frame) if frame.is_keyframe() => FrameKind::Key,
            _ => FrameKind::Inter,
        }
    }

    pub fn is_video(&self) -> bool {
        matches!(self, MediaFrame::Video(_))
    }

    pub fn is_audio(&self) -> bool {
        matches!(self, MediaFrame::Audio(_))
    }

    pub fn is_sequence_header(&self) -> bool {
        match self {
            MediaFrame::Video(frame) => frame.is_sequence_header(),
            MediaFrame::Audio(frame) => frame.is_sequence_header(),
            MediaFrame::MetaData(_) => false,
        }
    }

    /// Video key frame that is not a sequence header
    pub fn is_keyframe(&self) -> bool {
        self.kind() == FrameKind::Key
    }

    /// Build the message that carries this frame on `stream_id`
    pub fn to_message(&self, stream_id: u32) -> RtmpMessage {
        let timestamp = self.timestamp();
        let header = match self {
            MediaFrame::Video(_) => MessageHeader::video(timestamp, stream_id),
            MediaFrame::Audio(_) => MessageHeader::audio(timestamp, stream_id),
            MediaFrame::MetaData(_) => MessageHeader::data(timestamp, stream_id),
        };
        RtmpMessage::new(header, self.payload().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{CHUNK_STREAM_VIDEO, MSG_TYPE_DATA_AMF0, MSG_TYPE_VIDEO};

    #[test]
    fn test_frame_kinds() {
        let key = MediaFrame::Video(VideoFrame::parse(0, vec![0x17, 0x01, 0, 0, 0]));
        let inter = MediaFrame::Video(VideoFrame::parse(40, vec![0x27, 0x01, 0, 0, 0]));
        let header = MediaFrame::Video(VideoFrame::parse(0, vec![0x17, 0x00, 0, 0, 0]));
        let audio = MediaFrame::Audio(AudioFrame::parse(0, vec![0xAF, 0x01, 0x00]));
        let meta = MediaFrame::MetaData(MetaDataFrame { timestamp: 0, data: vec![0x02] });

        assert_eq!(key.kind(), FrameKind::Key);
        assert_eq!(inter.kind(), FrameKind::Inter);
        assert_eq!(header.kind(), FrameKind::Config);
        assert_eq!(audio.kind(), FrameKind::Inter);
        assert_eq!(meta.kind(), FrameKind::Config);
        assert!(!header.is_keyframe());
    }

    #[test]
    fn test_to_message() {
        let frame = MediaFrame::Video(VideoFrame::parse(1234, vec![0x27, 0x01, 0, 0, 0, 0xAA]));
        let message = frame.to_message(1);
        assert_eq!(message.message_type(), MSG_TYPE_VIDEO);
        assert_eq!(message.header.chunk_stream_id, CHUNK_STREAM_VIDEO);
        assert_eq!(message.timestamp(), 1234);
        assert_eq!(message.message_stream_id(), 1);
        assert_eq!(message.payload, frame.payload());

        let meta = MediaFrame::MetaData(MetaDataFrame { timestamp: 0, data: vec![0x05] });
        assert_eq!(meta.to_message(1).message_type(), MSG_TYPE_DATA_AMF0);
    }
}
