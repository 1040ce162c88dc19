use log::{debug, info};
use crate::connection::{Session, StreamBinding};
use crate::handlers::CommandHandler;
use crate::processing::StreamMetadata;
use crate::protocol::RtmpCommand;
use crate::server::{AuthAction, PublishResult};
use crate::stream::StreamPath;
use crate::Result;

pub struct PublishHandler;

impl PublishHandler {
    fn reject_bad_name(session: &mut Session, path: &StreamPath, stream_id: u32) -> Result<()> {
        info!("Session {} publish rejected, {} already has a publisher", session.id(), path);
        session.send_status(stream_id, "error", "NetStream.Publish.BadName", "Stream already publishing")
    }
}

impl CommandHandler for PublishHandler {
    fn command_name(&self) -> &str {
        "publish"
    }

    fn handle(&self, session: &mut Session, command: RtmpCommand, stream_id: u32) -> Result<()> {
        let Some(stream_name) = command.string_argument(0) else {
            debug!("Session {} publish without stream name", session.id());
            return Ok(());
        };
        let path = StreamPath::parse(&session.app, stream_name);

        if !session.authorize(AuthAction::Publish, &path, &command, stream_id)? {
            return Ok(());
        }

        let registry = session.context.registry().clone();
        if registry.is_publishing(&path.path) {
            return Self::reject_bad_name(session, &path, stream_id);
        }
        if session.publish.is_some() {
            info!("Session {} publish rejected, already publishing", session.id());
            return session.send_status(
                stream_id,
                "error",
                "NetStream.Publish.BadConnection",
                "Connection already publishing",
            );
        }
        if registry.publish(&path.path, session.id()) == PublishResult::PathTaken {
            return Self::reject_bad_name(session, &path, stream_id);
        }

        info!("Session {} publishing {} on stream {}", session.id(), path, stream_id);
        let description = format!("{} is now published.", path);
        session.metadata = StreamMetadata::new();
        session.publish = Some(StreamBinding {
            path: path.clone(),
            stream_id,
        });
        session.send_status(stream_id, "status", "NetStream.Publish.Start", &description)?;

        let listener = session.context.listener().clone();
        listener.on_publish_ready(session.id(), &path.path);
        Ok(())
    }
}
