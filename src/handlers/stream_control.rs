use log::debug;
use crate::amf::Amf0Value;
use crate::connection::Session;
use crate::handlers::CommandHandler;
use crate::protocol::RtmpCommand;
use crate::Result;

/// Live streams cannot be paused; the command is accepted and dropped.
pub struct PauseHandler;

impl CommandHandler for PauseHandler {
    fn command_name(&self) -> &str {
        "pause"
    }

    fn handle(&self, session: &mut Session, command: RtmpCommand, stream_id: u32) -> Result<()> {
        let paused = command.arguments.first().and_then(Amf0Value::as_boolean);
        debug!("Session {} pause({:?}) on stream {} ignored", session.id(), paused, stream_id);
        Ok(())
    }
}

fn flag_argument(command: &RtmpCommand) -> Option<bool> {
    command.arguments.first().and_then(Amf0Value::as_boolean)
}

pub struct ReceiveAudioHandler;

impl CommandHandler for ReceiveAudioHandler {
    fn command_name(&self) -> &str {
        "receiveAudio"
    }

    fn handle(&self, session: &mut Session, command: RtmpCommand, _stream_id: u32) -> Result<()> {
        if let Some(flag) = flag_argument(&command) {
            session.receive_audio = flag;
            debug!("Session {} receiveAudio {}", session.id(), flag);
        }
        Ok(())
    }
}

pub struct ReceiveVideoHandler;

impl CommandHandler for ReceiveVideoHandler {
    fn command_name(&self) -> &str {
        "receiveVideo"
    }

    fn handle(&self, session: &mut Session, command: RtmpCommand, _stream_id: u32) -> Result<()> {
        if let Some(flag) = flag_argument(&command) {
            session.receive_video = flag;
            debug!("Session {} receiveVideo {}", session.id(), flag);
        }
        Ok(())
    }
}

/// Accepted without a reply (`releaseStream`, `FCPublish`, ...)
pub struct IgnoredCommand(pub &'static str);

impl CommandHandler for IgnoredCommand {
    fn command_name(&self) -> &str {
        self.0
    }

    fn handle(&self, session: &mut Session, _command: RtmpCommand, _stream_id: u32) -> Result<()> {
        debug!("Session {} ignoring {}", session.id(), self.0);
        Ok(())
    }
}
