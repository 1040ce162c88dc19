use log::{debug, info};
use crate::amf::Amf0Value;
use crate::connection::Session;
use crate::handlers::CommandHandler;
use crate::protocol::RtmpCommand;
use crate::Result;

/// Release whatever publish or play is bound to `stream_id`
fn close_stream(session: &mut Session, stream_id: u32) {
    let registry = session.context.registry().clone();

    if session.publish.as_ref().is_some_and(|b| b.stream_id == stream_id) {
        if let Some(binding) = session.publish.take() {
            registry.unpublish(&binding.path.path, session.id());
            info!("Session {} stopped publishing {}", session.id(), binding.path);
        }
    }

    if session.play.as_ref().is_some_and(|b| b.stream_id == stream_id) {
        if let Some(binding) = session.play.take() {
            registry.unsubscribe(&binding.path.path, session.id());
            info!("Session {} stopped playing {}", session.id(), binding.path);
        }
    }
}

pub struct DeleteStreamHandler;

impl CommandHandler for DeleteStreamHandler {
    fn command_name(&self) -> &str {
        "deleteStream"
    }

    fn handle(&self, session: &mut Session, command: RtmpCommand, _stream_id: u32) -> Result<()> {
        // Stream id travels as the first argument
        let Some(stream_id) = command.arguments.first().and_then(Amf0Value::as_number) else {
            debug!("Session {} deleteStream without stream id", session.id());
            return Ok(());
        };

        close_stream(session, stream_id as u32);
        Ok(())
    }
}

/// `closeStream` arrives on the message stream it closes
pub struct CloseStreamHandler;

impl CommandHandler for CloseStreamHandler {
    fn command_name(&self) -> &str {
        "closeStream"
    }

    fn handle(&self, session: &mut Session, _command: RtmpCommand, stream_id: u32) -> Result<()> {
        close_stream(session, stream_id);
        Ok(())
    }
}
