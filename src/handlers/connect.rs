use std::time::Instant;
use log::info;
use crate::amf::{Amf0Object, Amf0Value};
use crate::connection::Session;
use crate::handlers::CommandHandler;
use crate::protocol::{ControlMessage, RtmpCommand, PEER_BW_LIMIT_DYNAMIC};
use crate::stream::normalize_app_name;
use crate::Result;

const FMS_VERSION: &str = "FMS/3,0,1,123";
const CAPABILITIES: f64 = 31.0;

pub struct ConnectHandler;

impl ConnectHandler {
    fn create_connect_result(transaction_id: f64, object_encoding: f64) -> RtmpCommand {
        let props = Amf0Object::new()
            .with("fmsVer", FMS_VERSION)
            .with("capabilities", CAPABILITIES);

        let info = Amf0Object::new()
            .with("level", "status")
            .with("code", "NetConnection.Connect.Success")
            .with("description", "Connection succeeded.")
            .with("objectEncoding", object_encoding);

        RtmpCommand::new("_result", transaction_id)
            .with_object(props)
            .with_argument(info)
    }

    /// Window, bandwidth and chunk size announced before the result
    fn send_server_bandwidth(session: &mut Session) -> Result<()> {
        let config = session.context.config().clone();

        session.send_control(ControlMessage::WindowAckSize(config.window_ack_size))?;
        session.send_control(ControlMessage::SetPeerBandwidth {
            size: config.peer_bandwidth,
            limit_type: PEER_BW_LIMIT_DYNAMIC,
        })?;
        session.set_out_chunk_size(config.out_chunk_size)
    }
}

impl CommandHandler for ConnectHandler {
    fn command_name(&self) -> &str {
        "connect"
    }

    fn handle(&self, session: &mut Session, command: RtmpCommand, _stream_id: u32) -> Result<()> {
        let app = command
            .command_object
            .get_property("app")
            .and_then(Amf0Value::as_string)
            .map(normalize_app_name)
            .unwrap_or_default();

        let listener = session.context.listener().clone();
        if !listener.on_pre_connect(session.id(), &command.command_object) {
            info!("Session {} connect to '{}' refused", session.id(), app);
            session.stop();
            return Ok(());
        }

        let object_encoding = command
            .command_object
            .get_property("objectEncoding")
            .and_then(Amf0Value::as_number)
            .unwrap_or(0.0);

        let now = Instant::now();
        session.app = app;
        session.object_encoding = object_encoding;
        session.connect_object = command.command_object;
        session.connected_at = Some(now);
        session.start_keep_alive(now);

        Self::send_server_bandwidth(session)?;
        session.send_command(0, &Self::create_connect_result(command.transaction_id, object_encoding))?;

        info!("Session {} connected to app '{}'", session.id(), session.app);
        Ok(())
    }
}
