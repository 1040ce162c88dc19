use std::time::Instant;
use log::{debug, trace};
use crate::connection::Session;
use crate::message::types::MessageType;
use crate::processing::{AudioFrame, MediaFrame, MetaDataFrame, VideoFrame};
use crate::protocol::{ControlMessage, RtmpCommand, RtmpData, RtmpMessage, UserControlEvent};
use crate::Result;

/// Routing of reassembled messages by type
impl Session {
    pub(crate) fn dispatch(&mut self, message: RtmpMessage) -> Result<()> {
        let message_type = MessageType::from_id(message.message_type());
        trace!(
            "Session {} message {:?} ({} bytes, ts {}, stream {})",
            self.id,
            message_type,
            message.payload.len(),
            message.timestamp(),
            message.message_stream_id()
        );

        match message_type {
            MessageType::Control => {
                let control = ControlMessage::decode(message.message_type(), &message.payload)?;
                self.handle_control(control);
                Ok(())
            }
            MessageType::Command => {
                let command = RtmpCommand::decode(&message.payload)?;
                let handlers = self.context.handlers().clone();
                handlers.handle(self, command, message.message_stream_id())
            }
            MessageType::Data => self.handle_data(message),
            MessageType::Audio => self.handle_audio(message),
            MessageType::Video => self.handle_video(message),
            other => {
                debug!("Session {} ignoring {:?} message", self.id, other);
                Ok(())
            }
        }
    }

    fn handle_control(&mut self, control: ControlMessage) {
        match control {
            ControlMessage::SetChunkSize(size) => {
                debug!("Session {} peer chunk size {}", self.id, size);
                self.decoder.set_chunk_size(size);
            }
            ControlMessage::Abort(chunk_stream_id) => {
                self.decoder.abort(chunk_stream_id);
            }
            ControlMessage::WindowAckSize(window) => {
                debug!("Session {} peer window ack size {}", self.id, window);
                self.ack.set_window(window);
            }
            ControlMessage::Acknowledgement(sequence) => {
                trace!("Session {} peer acknowledged {}", self.id, sequence);
            }
            ControlMessage::SetPeerBandwidth { size, limit_type } => {
                debug!("Session {} peer bandwidth {} (limit type {})", self.id, size, limit_type);
            }
            ControlMessage::UserControl(UserControlEvent::PingResponse(timestamp)) => {
                trace!("Session {} ping response {}", self.id, timestamp);
            }
            ControlMessage::UserControl(event) => {
                debug!("Session {} user control {:?}", self.id, event);
            }
        }
    }

    fn handle_data(&mut self, message: RtmpMessage) -> Result<()> {
        let data = RtmpData::decode(&message.payload)?;

        match data.name.as_str() {
            "@setDataFrame" | "onMetaData" => {
                let Some(value) = data.metadata().cloned() else {
                    debug!("Session {} {} without metadata object", self.id, data.name);
                    return Ok(());
                };
                if let Some(object) = value.as_object() {
                    self.metadata.apply_data_frame(object);
                }

                let frame = MetaDataFrame {
                    timestamp: message.timestamp(),
                    data: RtmpData::on_metadata(value).encode()?,
                };
                self.publish_frame(MediaFrame::MetaData(frame));
            }
            other => debug!("Session {} ignoring data message {}", self.id, other),
        }
        Ok(())
    }

    fn handle_audio(&mut self, message: RtmpMessage) -> Result<()> {
        if self.publish.is_none() {
            debug!("Session {} sent audio without publishing", self.id);
            return Ok(());
        }

        let frame = AudioFrame::parse(message.timestamp(), message.payload);
        self.metadata.apply_audio(&frame);
        self.publish_frame(MediaFrame::Audio(frame));
        Ok(())
    }

    fn handle_video(&mut self, message: RtmpMessage) -> Result<()> {
        if self.publish.is_none() {
            debug!("Session {} sent video without publishing", self.id);
            return Ok(());
        }

        let frame = VideoFrame::parse(message.timestamp(), message.payload);
        if self.metadata.apply_video(&frame) {
            self.start_fps_sampling(Instant::now());
        }
        self.publish_frame(MediaFrame::Video(frame));
        Ok(())
    }

    /// Hand a frame to listeners, the GOP cache and subscribers
    fn publish_frame(&mut self, frame: MediaFrame) {
        let Some(path) = self.publish.as_ref().map(|b| b.path.path.clone()) else {
            return;
        };

        self.context.listener().on_frame(self.id, &path, &frame);
        let cache = self.context.config().gop_cache_enabled;
        self.context.registry().broadcast(&path, self.id, frame, cache);
    }
}
