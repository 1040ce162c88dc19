use std::collections::VecDeque;
use std::sync::Arc;
use crate::processing::MediaFrame;

/// Frames a late joiner needs to start decoding at once: the stream
/// metadata, the latest sequence header of each media type and every frame
/// since the last video key frame.
pub struct GopCache {
    /// Maximum frames kept in the current GOP
    max_frames: usize,

    metadata: Option<Arc<MediaFrame>>,
    video_header: Option<Arc<MediaFrame>>,
    audio_header: Option<Arc<MediaFrame>>,

    /// Frames since the last key frame, key frame first. Emptied when the
    /// GOP outgrows `max_frames`.
    frames: VecDeque<Arc<MediaFrame>>,

    /// A video key frame has been seen
    has_keyframe: bool,
}

impl GopCache {
    /// Create new GOP cache
    pub fn new(max_frames: usize) -> Self {
        GopCache {
            max_frames,
            metadata: None,
            video_header: None,
            audio_header: None,
            frames: VecDeque::new(),
            has_keyframe: false,
        }
    }

    /// Add a produced frame. Configuration frames go to their slots and
    /// never into the frame list.
    pub fn push(&mut self, frame: Arc<MediaFrame>) {
        if matches!(frame.as_ref(), MediaFrame::MetaData(_)) {
            self.metadata = Some(frame);
            return;
        }
        if frame.is_sequence_header() {
            if frame.is_video() {
                self.video_header = Some(frame);
            } else {
                self.audio_header = Some(frame);
            }
            return;
        }

        if frame.is_keyframe() {
            // Start a new GOP
            self.frames.clear();
            self.has_keyframe = true;
        } else if frame.is_video() && !self.has_keyframe {
            // Not decodable without a preceding key frame
            return;
        }

        if self.frames.len() >= self.max_frames {
            // Trimming the front would lose the key frame; wait for the next one
            self.frames.clear();
            self.has_keyframe = false;
            if frame.is_video() {
                return;
            }
        }
        self.frames.push_back(frame);
    }

    /// Frames for a new subscriber, in send order
    pub fn join_frames(&self) -> Vec<Arc<MediaFrame>> {
        let mut out = Vec::with_capacity(self.frames.len() + 3);
        out.extend(self.metadata.iter().cloned());
        out.extend(self.video_header.iter().cloned());
        out.extend(self.audio_header.iter().cloned());
        out.extend(self.frames.iter().cloned());
        out
    }

    pub fn metadata(&self) -> Option<&Arc<MediaFrame>> {
        self.metadata.as_ref()
    }

    pub fn video_header(&self) -> Option<&Arc<MediaFrame>> {
        self.video_header.as_ref()
    }

    pub fn audio_header(&self) -> Option<&Arc<MediaFrame>> {
        self.audio_header.as_ref()
    }

    /// Number of cached frames, configuration slots excluded
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Drop everything, slots included
    pub fn clear(&mut self) {
        self.frames.clear();
        self.metadata = None;
        self.video_header = None;
        self.audio_header = None;
        self.has_keyframe = false;
    }
}
