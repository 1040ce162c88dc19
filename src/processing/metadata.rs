use crate::amf::Amf0Object;
use crate::processing::audio::{AudioCodec, AudioFrame};
use crate::processing::video::{VideoCodec, VideoFrame};

/// Codec and format facts a publishing session has learned about its stream
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamMetadata {
    pub video_codec: Option<VideoCodec>,
    pub video_width: u32,
    pub video_height: u32,
    pub video_profile: &'static str,
    pub video_level: f64,
    /// Frames per second, 0 until announced or sampled
    pub video_fps: u32,
    /// Video frames received since publishing started
    pub video_count: u64,

    pub audio_codec: Option<AudioCodec>,
    pub audio_sample_rate: u32,
    pub audio_channels: u32,
    pub audio_profile: &'static str,

    /// An AVC sequence header has been decoded
    pub avc_config_seen: bool,
    /// An AAC sequence header has been decoded
    pub aac_config_seen: bool,
}

impl StreamMetadata {
    pub fn new() -> Self {
        StreamMetadata {
            audio_channels: 1,
            ..Default::default()
        }
    }

    /// Take the values an encoder announces with `@setDataFrame`.
    /// Keys that are absent keep their current value.
    pub fn apply_data_frame(&mut self, object: &Amf0Object) {
        if let Some(rate) = object.number("audiosamplerate") {
            self.audio_sample_rate = rate as u32;
        }
        if let Some(stereo) = object.get("stereo").and_then(|v| v.as_boolean()) {
            self.audio_channels = if stereo { 2 } else { 1 };
        }
        if let Some(width) = object.number("width") {
            self.video_width = width as u32;
        }
        if let Some(height) = object.number("height") {
            self.video_height = height as u32;
        }
        if let Some(fps) = object.number("framerate") {
            self.video_fps = fps as u32;
        }
    }

    /// Record a video frame. Returns true for the first frame of a stream
    /// whose frame rate is still unknown, which starts fps sampling.
    pub fn apply_video(&mut self, frame: &VideoFrame) -> bool {
        if self.video_codec.is_none() {
            self.video_codec = Some(frame.codec);
        }

        if !self.avc_config_seen {
            if let Some(sps) = &frame.sequence_parameters {
                self.video_width = sps.width;
                self.video_height = sps.height;
                self.video_profile = sps.profile_name();
                self.video_level = sps.level();
                self.avc_config_seen = true;
            }
        }

        let first = self.video_count == 0;
        self.video_count += 1;
        first && self.video_fps == 0
    }

    /// Fix the frame rate from the number of frames seen in `window_secs`
    pub fn sample_fps(&mut self, window_secs: u64) {
        if window_secs > 0 {
            self.video_fps = self.video_count.div_ceil(window_secs) as u32;
        }
    }

    pub fn apply_audio(&mut self, frame: &AudioFrame) {
        if self.audio_codec.is_none() {
            self.audio_codec = Some(frame.codec);
            self.audio_sample_rate = frame.sample_rate;
            self.audio_channels = frame.channels;
        }

        if !self.aac_config_seen {
            if let Some(config) = &frame.aac_config {
                self.audio_sample_rate = config.sample_rate;
                self.audio_channels = config.channels;
                self.audio_profile = config.profile_name();
                self.aac_config_seen = true;
            }
        }
    }

    pub fn video_codec_name(&self) -> &'static str {
        self.video_codec.map(|c| c.name()).unwrap_or("")
    }

    pub fn audio_codec_name(&self) -> &'static str {
        self.audio_codec.map(|c| c.name()).unwrap_or("")
    }
}
