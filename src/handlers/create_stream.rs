use log::debug;
use crate::amf::Amf0Value;
use crate::connection::Session;
use crate::handlers::CommandHandler;
use crate::protocol::RtmpCommand;
use crate::Result;

pub struct CreateStreamHandler;

impl CommandHandler for CreateStreamHandler {
    fn command_name(&self) -> &str {
        "createStream"
    }

    fn handle(&self, session: &mut Session, command: RtmpCommand, _stream_id: u32) -> Result<()> {
        // Stream ids start at 1, 0 is the control stream
        session.streams += 1;
        let stream_id = session.streams;
        debug!("Session {} created stream {}", session.id(), stream_id);

        let response = RtmpCommand::result(command.transaction_id, Amf0Value::Number(stream_id as f64));
        session.send_command(0, &response)
    }
}
