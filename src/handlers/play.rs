use log::{debug, info};
use crate::connection::{Session, StreamBinding};
use crate::handlers::CommandHandler;
use crate::protocol::{ControlMessage, RtmpCommand, RtmpData, UserControlEvent};
use crate::server::AuthAction;
use crate::stream::StreamPath;
use crate::Result;

pub struct PlayHandler;

impl PlayHandler {
    fn send_play_start(session: &mut Session, stream_id: u32) -> Result<()> {
        session.send_control(ControlMessage::UserControl(UserControlEvent::StreamBegin(stream_id)))?;
        session.send_status(stream_id, "status", "NetStream.Play.Reset", "Playing and resetting stream.")?;
        session.send_status(stream_id, "status", "NetStream.Play.Start", "Started playing stream.")?;
        session.send_data(stream_id, &RtmpData::sample_access(false, false))
    }
}

impl CommandHandler for PlayHandler {
    fn command_name(&self) -> &str {
        "play"
    }

    fn handle(&self, session: &mut Session, command: RtmpCommand, stream_id: u32) -> Result<()> {
        let Some(stream_name) = command.string_argument(0) else {
            debug!("Session {} play without stream name", session.id());
            return Ok(());
        };
        let path = StreamPath::parse(&session.app, stream_name);

        if !session.authorize(AuthAction::Play, &path, &command, stream_id)? {
            return Ok(());
        }

        if session.play.is_some() {
            info!("Session {} play rejected, already playing", session.id());
            return session.send_status(
                stream_id,
                "error",
                "NetStream.Play.BadConnection",
                "Connection already playing",
            );
        }

        Self::send_play_start(session, stream_id)?;
        session.play = Some(StreamBinding {
            path: path.clone(),
            stream_id,
        });

        // Cached frames first, live frames arrive on the event channel after
        let registry = session.context.registry().clone();
        let join_frames = registry.subscribe(&path.path, session.id(), session.events.clone());
        if join_frames.is_empty() && !registry.is_publishing(&path.path) {
            info!("Session {} waiting for a publisher on {}", session.id(), path);
        } else {
            info!(
                "Session {} playing {} on stream {} ({} cached frames)",
                session.id(),
                path,
                stream_id,
                join_frames.len()
            );
        }

        for frame in join_frames {
            session.send_frame(&frame, stream_id)?;
        }
        Ok(())
    }
}
