use log::debug;
use crate::processing::avc::{AvcDecoderConfig, SequenceParameterSet};
use crate::ByteReader;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoCodec {
    /// JPEG (unused)
    Jpeg,
    /// Sorenson H.263
    H263,
    /// Screen video
    ScreenVideo,
    /// On2 VP6
    VP6,
    /// On2 VP6 with alpha
    VP6Alpha,
    /// Screen video v2
    ScreenVideo2,
    /// H.264 AVC
    H264,
    /// H.265 HEVC
    H265,
    /// Unknown
    Unknown(u8),
}

impl VideoCodec {
    /// Parse from codec ID
    pub fn from_codec_id(id: u8) -> Self {
        match id {
            1 => VideoCodec::Jpeg,
            2 => VideoCodec::H263,
            3 => VideoCodec::ScreenVideo,
            4 => VideoCodec::VP6,
            5 => VideoCodec::VP6Alpha,
            6 => VideoCodec::ScreenVideo2,
            7 => VideoCodec::H264,
            12 => VideoCodec::H265,
            _ => VideoCodec::Unknown(id),
        }
    }

    pub fn id(&self) -> u8 {
        match self {
            VideoCodec::Jpeg => 1,
            VideoCodec::H263 => 2,
            VideoCodec::ScreenVideo => 3,
            VideoCodec::VP6 => 4,
            VideoCodec::VP6Alpha => 5,
            VideoCodec::ScreenVideo2 => 6,
            VideoCodec::H264 => 7,
            VideoCodec::H265 => 12,
            VideoCodec::Unknown(id) => *id,
        }
    }

    /// Get codec name
    pub fn name(&self) -> &'static str {
        match self {
            VideoCodec::Jpeg => "Jpeg",
            VideoCodec::H263 => "Sorenson-H263",
            VideoCodec::ScreenVideo => "ScreenVideo",
            VideoCodec::VP6 => "On2-VP6",
            VideoCodec::VP6Alpha => "On2-VP6-Alpha",
            VideoCodec::ScreenVideo2 => "ScreenVideo2",
            VideoCodec::H264 => "H264",
            VideoCodec::H265 => "H265",
            VideoCodec::Unknown(_) => "Unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    /// Keyframe (I-frame)
    Keyframe,
    /// Inter-frame (P-frame)
    InterFrame,
    /// Disposable inter-frame
    DisposableInterFrame,
    /// Generated keyframe
    GeneratedKeyframe,
    /// Video info/command frame
    VideoInfo,
}

impl FrameType {
    pub fn from_bits(bits: u8) -> Self {
        match bits {
            1 => FrameType::Keyframe,
            2 => FrameType::InterFrame,
            3 => FrameType::DisposableInterFrame,
            4 => FrameType::GeneratedKeyframe,
            5 => FrameType::VideoInfo,
            _ => FrameType::InterFrame,
        }
    }

    pub fn is_keyframe(&self) -> bool {
        matches!(self, FrameType::Keyframe | FrameType::GeneratedKeyframe)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvcPacketType {
    SequenceHeader,
    Nalu,
    EndOfSequence,
    Unknown(u8),
}

impl AvcPacketType {
    pub fn from_byte(b: u8) -> Self {
        match b {
            0 => AvcPacketType::SequenceHeader,
            1 => AvcPacketType::Nalu,
            2 => AvcPacketType::EndOfSequence,
            other => AvcPacketType::Unknown(other),
        }
    }
}

/// A video message payload with its tag header decoded
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFrame {
    pub timestamp: u32,
    pub frame_type: FrameType,
    pub codec: VideoCodec,
    /// Present for AVC only
    pub avc_packet_type: Option<AvcPacketType>,
    /// Composition time offset in ms (AVC only)
    pub composition_time: i32,
    /// Decoded parameters of an AVC sequence header
    pub sequence_parameters: Option<SequenceParameterSet>,
    /// Whole message payload, tag header included
    pub data: Vec<u8>,
}

impl VideoFrame {
    /// Decode a video message payload. Unknown codecs and short payloads
    /// yield an opaque frame with default fields.
    pub fn parse(timestamp: u32, data: Vec<u8>) -> Self {
        let mut frame = VideoFrame {
            timestamp,
            frame_type: FrameType::InterFrame,
            codec: VideoCodec::Unknown(0),
            avc_packet_type: None,
            composition_time: 0,
            sequence_parameters: None,
            data,
        };

        let mut reader = ByteReader::new(&frame.data);
        let Ok(tag) = reader.read_u8() else {
            return frame;
        };
        frame.frame_type = FrameType::from_bits(tag >> 4);
        frame.codec = VideoCodec::from_codec_id(tag & 0x0F);

        if frame.codec == VideoCodec::H264 {
            let (Ok(packet_type), Ok(composition_time)) = (reader.read_u8(), reader.read_i24_be()) else {
                debug!("AVC video tag too short ({} bytes)", frame.data.len());
                return frame;
            };
            let packet_type = AvcPacketType::from_byte(packet_type);
            frame.avc_packet_type = Some(packet_type);
            frame.composition_time = composition_time;

            if packet_type == AvcPacketType::SequenceHeader {
                frame.sequence_parameters = AvcDecoderConfig::parse(reader.rest())
                    .and_then(|config| config.sequence_parameters())
                    .map_err(|e| debug!("Could not parse AVC sequence header: {}", e))
                    .ok();
            }
        }

        frame
    }

    /// Codec configuration frame (AVC sequence header)
    pub fn is_sequence_header(&self) -> bool {
        self.avc_packet_type == Some(AvcPacketType::SequenceHeader)
    }

    /// Key frame that starts a new GOP (sequence headers excluded)
    pub fn is_keyframe(&self) -> bool {
        self.frame_type.is_keyframe() && !self.is_sequence_header()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::avc::tests::{build_config_record, build_sps};

    #[test]
    fn test_avc_sequence_header() {
        let mut data = vec![0x17, 0x00, 0x00, 0x00, 0x00];
        data.extend_from_slice(&build_config_record(&build_sps(100, 40, 120, 68, 4)));

        let frame = VideoFrame::parse(0, data);
        assert_eq!(frame.codec, VideoCodec::H264);
        assert!(frame.is_sequence_header());
        assert!(!frame.is_keyframe());

        let sps = frame.sequence_parameters.unwrap();
        assert_eq!((sps.width, sps.height), (1920, 1080));
    }

    #[test]
    fn test_avc_nalu_composition_time() {
        let frame = VideoFrame::parse(40, vec![0x27, 0x01, 0xFF, 0xFF, 0xD8, 0x00, 0x00]);
        assert_eq!(frame.frame_type, FrameType::InterFrame);
        assert_eq!(frame.avc_packet_type, Some(AvcPacketType::Nalu));
        assert_eq!(frame.composition_time, -40);
        assert!(!frame.is_keyframe());
    }

    #[test]
    fn test_unknown_codec_is_opaque() {
        let frame = VideoFrame::parse(0, vec![0x1E, 0xAB, 0xCD]);
        assert_eq!(frame.codec, VideoCodec::Unknown(14));
        assert!(frame.is_keyframe());
        assert_eq!(frame.avc_packet_type, None);
        assert_eq!(frame.data, vec![0x1E, 0xAB, 0xCD]);
    }

    #[test]
    fn test_broken_sequence_header_still_forwarded() {
        let frame = VideoFrame::parse(0, vec![0x17, 0x00, 0x00, 0x00, 0x00, 0x01]);
        assert!(frame.is_sequence_header());
        assert!(frame.sequence_parameters.is_none());
    }

    #[test]
    fn test_empty_payload() {
        let frame = VideoFrame::parse(0, Vec::new());
        assert!(!frame.is_keyframe());
        assert_eq!(frame.codec, VideoCodec::Unknown(0));
    }
}
