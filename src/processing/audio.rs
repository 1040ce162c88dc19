use log::debug;
use crate::processing::bits::BitReader;
use crate::{ByteReader, Error, Result};

/// Sample rates indexed by the 2-bit rate field of the audio tag
pub const SOUND_RATES: [u32; 4] = [5512, 11025, 22050, 44100];

/// Sample rates indexed by the AudioSpecificConfig frequency index
pub const AAC_SAMPLE_RATES: [u32; 13] = [
    96000, 88200, 64000, 48000, 44100, 32000, 24000, 22050, 16000, 12000, 11025, 8000, 7350,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioCodec {
    /// Linear PCM, platform endian
    PCM,
    /// ADPCM
    ADPCM,
    /// MP3
    MP3,
    /// Linear PCM, little endian
    PCMLittleEndian,
    /// Nellymoser 16kHz mono
    Nellymoser16kHz,
    /// Nellymoser 8kHz mono
    Nellymoser8kHz,
    /// Nellymoser
    Nellymoser,
    /// G.711 A-law
    G711ALaw,
    /// G.711 mu-law
    G711MuLaw,
    /// AAC
    AAC,
    /// Speex
    Speex,
    /// MP3 8kHz
    MP38kHz,
    /// Device specific
    DeviceSpecific,
    /// Reserved or unassigned
    Unknown(u8),
}

impl AudioCodec {
    /// Parse from sound format field
    pub fn from_sound_format(format: u8) -> Self {
        match format {
            0 => AudioCodec::PCM,
            1 => AudioCodec::ADPCM,
            2 => AudioCodec::MP3,
            3 => AudioCodec::PCMLittleEndian,
            4 => AudioCodec::Nellymoser16kHz,
            5 => AudioCodec::Nellymoser8kHz,
            6 => AudioCodec::Nellymoser,
            7 => AudioCodec::G711ALaw,
            8 => AudioCodec::G711MuLaw,
            10 => AudioCodec::AAC,
            11 => AudioCodec::Speex,
            14 => AudioCodec::MP38kHz,
            15 => AudioCodec::DeviceSpecific,
            other => AudioCodec::Unknown(other),
        }
    }

    pub fn id(&self) -> u8 {
        match self {
            AudioCodec::PCM => 0,
            AudioCodec::ADPCM => 1,
            AudioCodec::MP3 => 2,
            AudioCodec::PCMLittleEndian => 3,
            AudioCodec::Nellymoser16kHz => 4,
            AudioCodec::Nellymoser8kHz => 5,
            AudioCodec::Nellymoser => 6,
            AudioCodec::G711ALaw => 7,
            AudioCodec::G711MuLaw => 8,
            AudioCodec::AAC => 10,
            AudioCodec::Speex => 11,
            AudioCodec::MP38kHz => 14,
            AudioCodec::DeviceSpecific => 15,
            AudioCodec::Unknown(id) => *id,
        }
    }

    /// Get codec name
    pub fn name(&self) -> &'static str {
        match self {
            AudioCodec::PCM => "PCM",
            AudioCodec::ADPCM => "ADPCM",
            AudioCodec::MP3 => "MP3",
            AudioCodec::PCMLittleEndian => "PCM-LE",
            AudioCodec::Nellymoser16kHz => "Nellymoser-16kHz",
            AudioCodec::Nellymoser8kHz => "Nellymoser-8kHz",
            AudioCodec::Nellymoser => "Nellymoser",
            AudioCodec::G711ALaw => "G.711-A",
            AudioCodec::G711MuLaw => "G.711-mu",
            AudioCodec::AAC => "AAC",
            AudioCodec::Speex => "Speex",
            AudioCodec::MP38kHz => "MP3-8kHz",
            AudioCodec::DeviceSpecific => "Device",
            AudioCodec::Unknown(_) => "Unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AacPacketType {
    SequenceHeader,
    Raw,
    Unknown(u8),
}

impl AacPacketType {
    pub fn from_byte(b: u8) -> Self {
        match b {
            0 => AacPacketType::SequenceHeader,
            1 => AacPacketType::Raw,
            other => AacPacketType::Unknown(other),
        }
    }
}

/// AudioSpecificConfig carried by an AAC sequence header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AacConfig {
    pub object_type: u32,
    pub sample_rate: u32,
    pub channels: u32,
}

impl AacConfig {
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut bits = BitReader::new(data);

        let mut object_type = bits.read_bits(5)?;
        if object_type == 31 {
            object_type = 32 + bits.read_bits(6)?;
        }

        let sample_rate = match bits.read_bits(4)? {
            15 => bits.read_bits(24)?,
            index => *AAC_SAMPLE_RATES
                .get(index as usize)
                .ok_or_else(|| Error::protocol(format!("Invalid AAC sampling index {}", index)))?,
        };

        let channels = bits.read_bits(4)?;

        Ok(AacConfig {
            object_type,
            sample_rate,
            channels,
        })
    }

    pub fn profile_name(&self) -> &'static str {
        aac_profile_name(self.object_type)
    }
}

pub fn aac_profile_name(object_type: u32) -> &'static str {
    match object_type {
        1 => "Main",
        2 => "LC",
        3 => "SSR",
        4 => "LTP",
        5 => "HE",
        29 => "HE-v2",
        _ => "",
    }
}

/// An audio message payload with its tag header decoded
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    pub timestamp: u32,
    pub codec: AudioCodec,
    pub sample_rate: u32,
    /// 8 or 16
    pub sample_size: u8,
    pub channels: u32,
    /// Present for AAC only
    pub aac_packet_type: Option<AacPacketType>,
    /// Decoded AudioSpecificConfig of an AAC sequence header
    pub aac_config: Option<AacConfig>,
    /// Whole message payload, tag header included
    pub data: Vec<u8>,
}

impl AudioFrame {
    /// Decode an audio message payload. Never fails; fields that cannot be
    /// read keep their defaults and the payload is kept as is.
    pub fn parse(timestamp: u32, data: Vec<u8>) -> Self {
        let mut frame = AudioFrame {
            timestamp,
            codec: AudioCodec::Unknown(9),
            sample_rate: 0,
            sample_size: 0,
            channels: 0,
            aac_packet_type: None,
            aac_config: None,
            data,
        };

        let mut reader = ByteReader::new(&frame.data);
        let Ok(tag) = reader.read_u8() else {
            return frame;
        };
        frame.codec = AudioCodec::from_sound_format(tag >> 4);
        frame.sample_rate = SOUND_RATES[((tag >> 2) & 0x03) as usize];
        frame.sample_size = if tag & 0x02 != 0 { 16 } else { 8 };
        frame.channels = (tag & 0x01) as u32 + 1;

        if frame.codec == AudioCodec::AAC {
            let Ok(packet_type) = reader.read_u8() else {
                debug!("AAC audio tag without packet type");
                return frame;
            };
            let packet_type = AacPacketType::from_byte(packet_type);
            frame.aac_packet_type = Some(packet_type);

            if packet_type == AacPacketType::SequenceHeader {
                match AacConfig::parse(reader.rest()) {
                    Ok(config) => {
                        frame.sample_rate = config.sample_rate;
                        frame.channels = config.channels;
                        frame.aac_config = Some(config);
                    }
                    Err(e) => debug!("Could not parse AAC sequence header: {}", e),
                }
            }
        }

        frame
    }

    /// Codec configuration frame (AAC sequence header)
    pub fn is_sequence_header(&self) -> bool {
        self.aac_packet_type == Some(AacPacketType::SequenceHeader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aac_lc_sequence_header() {
        // LC, 44100 Hz (index 4), stereo
        let frame = AudioFrame::parse(0, vec![0xAF, 0x00, 0x12, 0x10]);
        assert_eq!(frame.codec, AudioCodec::AAC);
        assert!(frame.is_sequence_header());

        let config = frame.aac_config.unwrap();
        assert_eq!(config.profile_name(), "LC");
        assert_eq!((config.sample_rate, config.channels), (44100, 2));
        assert_eq!((frame.sample_rate, frame.channels), (44100, 2));
    }

    #[test]
    fn test_escaped_object_type_and_explicit_rate() {
        // object type 31 + 6 bits (=> 32), index 15, 24-bit rate 12345, mono
        let mut w = crate::processing::avc::tests::BitWriter::default();
        w.put(31, 5);
        w.put(0, 6);
        w.put(15, 4);
        w.put(12345, 24);
        w.put(1, 4);
        let config = AacConfig::parse(&w.finish()).unwrap();

        assert_eq!(config.object_type, 32);
        assert_eq!(config.sample_rate, 12345);
        assert_eq!(config.channels, 1);
        assert_eq!(config.profile_name(), "");
    }

    #[test]
    fn test_aac_raw_frame() {
        let frame = AudioFrame::parse(23, vec![0xAF, 0x01, 0x21, 0x00]);
        assert_eq!(frame.aac_packet_type, Some(AacPacketType::Raw));
        assert!(!frame.is_sequence_header());
        assert_eq!(frame.sample_rate, 44100);
        assert_eq!(frame.sample_size, 16);
    }

    #[test]
    fn test_legacy_codec_tag_fields() {
        // MP3, 22050 Hz, 16 bit, mono
        let frame = AudioFrame::parse(0, vec![0x2A, 0xFF]);
        assert_eq!(frame.codec.name(), "MP3");
        assert_eq!(frame.sample_rate, 22050);
        assert_eq!(frame.channels, 1);
        assert!(frame.aac_packet_type.is_none());
    }

    #[test]
    fn test_invalid_sampling_index() {
        // index 13 is reserved
        assert!(AacConfig::parse(&[0x16, 0x90]).is_err());
        let frame = AudioFrame::parse(0, vec![0xAF, 0x00, 0x16, 0x90]);
        assert!(frame.is_sequence_header());
        assert!(frame.aac_config.is_none());
    }
}
