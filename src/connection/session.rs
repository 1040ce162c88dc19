use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use log::{debug, info, warn};
use tokio::sync::mpsc::Sender;
use tokio::sync::oneshot;
use uuid::Uuid;
use crate::amf::Amf0Value;
use crate::chunk::{ChunkDecoder, ChunkEncoder};
use crate::connection::flow::AckWindow;
use crate::connection::state::SessionState;
use crate::connection::timers::{SessionTimers, TimerKind, TimerToken};
use crate::handshake::Handshake;
use crate::processing::{MediaFrame, StreamMetadata};
use crate::protocol::{ControlMessage, RtmpCommand, RtmpData, RtmpMessage, UserControlEvent, MessageHeader};
use crate::server::{AuthAction, AuthDecision, AuthRequest, ServerContext, StreamEvent};
use crate::stream::StreamPath;
use crate::utils::elapsed_ms;
use crate::{InputBuffer, Result};

/// Unique id of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        SessionId(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        SessionId::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A publish or play bound to a message stream
#[derive(Debug, Clone)]
pub struct StreamBinding {
    pub path: StreamPath,
    pub stream_id: u32,
}

/// A publish or play command waiting on the authorizer
#[derive(Debug)]
pub(crate) struct PendingAuthorization {
    pub(crate) command: RtmpCommand,
    pub(crate) stream_id: u32,
    pub(crate) receiver: Option<oneshot::Receiver<std::result::Result<(), String>>>,
}

/// Protocol state of one peer connection.
///
/// Pure state machine: bytes go in through [`feed`](Self::feed), bytes to
/// send come out of [`take_output`](Self::take_output), and time only moves
/// when the driver calls [`poll_timers`](Self::poll_timers).
pub struct Session {
    pub(crate) id: SessionId,
    pub(crate) context: Arc<ServerContext>,
    /// Where the registry delivers frames for this session when it plays
    pub(crate) events: Sender<StreamEvent>,

    pub(crate) active: bool,
    pub(crate) created_at: Instant,
    pub(crate) connected_at: Option<Instant>,

    handshake: Handshake,
    input: InputBuffer,
    pub(crate) decoder: ChunkDecoder,
    pub(crate) encoder: ChunkEncoder,
    output: Vec<u8>,
    pub(crate) ack: AckWindow,
    pub(crate) timers: SessionTimers,
    pub(crate) fps_timer: Option<TimerToken>,

    pub(crate) app: String,
    pub(crate) object_encoding: f64,
    pub(crate) connect_object: Amf0Value,
    /// Message streams created so far
    pub(crate) streams: u32,

    pub(crate) publish: Option<StreamBinding>,
    pub(crate) play: Option<StreamBinding>,
    pub(crate) receive_audio: bool,
    pub(crate) receive_video: bool,

    pub(crate) metadata: StreamMetadata,
    /// Average inbound bytes per second since the session started
    pub(crate) inbound_rate: f64,

    pub(crate) pending_auth: Option<PendingAuthorization>,
    /// Verdict handed to a handler being re-run after a pending decision
    pub(crate) resolved_auth: Option<std::result::Result<(), String>>,
}

impl Session {
    pub fn new(context: Arc<ServerContext>, events: Sender<StreamEvent>) -> Self {
        let now = Instant::now();
        let mut timers = SessionTimers::new();
        timers.schedule_periodic(
            TimerKind::ThroughputSample,
            context.config().throughput_sample_interval,
            now,
        );

        Session {
            id: SessionId::new(),
            encoder: ChunkEncoder::new(),
            events,
            active: true,
            created_at: now,
            connected_at: None,
            handshake: Handshake::new(),
            input: InputBuffer::new(),
            decoder: ChunkDecoder::new(),
            output: Vec::new(),
            ack: AckWindow::new(),
            timers,
            fps_timer: None,
            app: String::new(),
            object_encoding: 0.0,
            connect_object: Amf0Value::Null,
            streams: 0,
            publish: None,
            play: None,
            receive_audio: true,
            receive_video: true,
            metadata: StreamMetadata::new(),
            inbound_rate: 0.0,
            pending_auth: None,
            resolved_auth: None,
            context,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> SessionState {
        if !self.active {
            SessionState::Closed
        } else if !self.handshake.is_complete() {
            SessionState::Handshaking
        } else if self.connected_at.is_none() {
            SessionState::Connecting
        } else if self.publish.is_some() {
            SessionState::Publishing
        } else if self.play.is_some() {
            SessionState::Playing
        } else {
            SessionState::Connected
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_publishing(&self) -> bool {
        self.publish.is_some()
    }

    pub fn is_playing(&self) -> bool {
        self.play.is_some()
    }

    /// Application name from `connect`
    pub fn app(&self) -> &str {
        &self.app
    }

    pub fn publish_path(&self) -> Option<&StreamPath> {
        self.publish.as_ref().map(|b| &b.path)
    }

    pub fn play_path(&self) -> Option<&StreamPath> {
        self.play.as_ref().map(|b| &b.path)
    }

    pub fn metadata(&self) -> &StreamMetadata {
        &self.metadata
    }

    /// Bytes received after the handshake
    pub fn bytes_received(&self) -> u64 {
        self.ack.total()
    }

    pub fn inbound_rate(&self) -> f64 {
        self.inbound_rate
    }

    /// Process bytes read from the peer. A framing error stops the session
    /// and is returned.
    pub fn feed(&mut self, data: &[u8]) -> Result<()> {
        if !self.active {
            return Ok(());
        }

        match self.process_input(data) {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!("Session {} failed: {}", self.id, e);
                self.stop();
                Err(e)
            }
        }
    }

    fn process_input(&mut self, data: &[u8]) -> Result<()> {
        self.input.push(data);

        let counted = if self.handshake.is_complete() {
            data.len()
        } else {
            self.handshake.process(&mut self.input, &mut self.output)?;
            if !self.handshake.is_complete() {
                return Ok(());
            }
            debug!("Session {} handshake complete", self.id);
            // Whatever followed C2 in this read
            self.input.len()
        };
        self.ack.record(counted);

        while self.active {
            let Some(message) = self.decoder.decode(&mut self.input)? else {
                break;
            };
            if let Err(e) = self.dispatch(message) {
                if e.is_fatal() {
                    return Err(e);
                }
                warn!("Session {} dropped message: {}", self.id, e);
            }
        }

        if self.active {
            if let Some(sequence) = self.ack.take_ack() {
                self.send_control(ControlMessage::Acknowledgement(sequence))?;
            }
        }
        Ok(())
    }

    /// Bytes queued for the peer since the last call
    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.output)
    }

    pub fn has_output(&self) -> bool {
        !self.output.is_empty()
    }

    /// Earliest time [`poll_timers`](Self::poll_timers) has work to do
    pub fn next_deadline(&self) -> Option<Instant> {
        if self.active {
            self.timers.next_deadline()
        } else {
            None
        }
    }

    /// Run every timer due at `now`
    pub fn poll_timers(&mut self, now: Instant) -> Result<()> {
        if !self.active {
            return Ok(());
        }

        for kind in self.timers.expired(now) {
            match kind {
                TimerKind::KeepAlive => {
                    let since_connect = elapsed_ms(self.connected_at.unwrap_or(self.created_at), now);
                    self.send_control(ControlMessage::UserControl(UserControlEvent::PingRequest(since_connect)))?;
                }
                TimerKind::FrameRateSample => {
                    self.fps_timer = None;
                    let window = self.context.config().fps_sample_window.as_secs();
                    self.metadata.sample_fps(window);
                    info!("Session {} video fps {}", self.id, self.metadata.video_fps);
                }
                TimerKind::ThroughputSample => {
                    let secs = now.saturating_duration_since(self.created_at).as_secs_f64();
                    if secs > 0.0 {
                        self.inbound_rate = self.ack.total() as f64 / secs;
                    }
                    debug!(
                        "Session {} read {} bytes, {:.0} B/s",
                        self.id,
                        self.ack.total(),
                        self.inbound_rate
                    );
                }
            }
        }
        Ok(())
    }

    /// Deliver a registry event to this session as a player
    pub fn handle_stream_event(&mut self, event: StreamEvent) -> Result<()> {
        if !self.active {
            return Ok(());
        }
        let Some(stream_id) = self.play.as_ref().map(|b| b.stream_id) else {
            return Ok(());
        };

        match event {
            StreamEvent::Frame(frame) => self.send_frame(&frame, stream_id),
            StreamEvent::PublishStart => {
                self.send_control(ControlMessage::UserControl(UserControlEvent::StreamBegin(stream_id)))?;
                self.send_status(stream_id, "status", "NetStream.Play.PublishNotify", "Now published.")
            }
            StreamEvent::PublishStop => {
                self.send_status(stream_id, "status", "NetStream.Play.UnpublishNotify", "Now unpublished.")?;
                self.send_control(ControlMessage::UserControl(UserControlEvent::StreamEof(stream_id)))
            }
        }
    }

    /// Authorization decision the driver has to wait for, if any
    pub fn take_pending_authorization(
        &mut self,
    ) -> Option<oneshot::Receiver<std::result::Result<(), String>>> {
        self.pending_auth.as_mut().and_then(|p| p.receiver.take())
    }

    pub fn has_pending_authorization(&self) -> bool {
        self.pending_auth.is_some()
    }

    /// Re-run the publish or play that was waiting on the authorizer
    pub fn resolve_authorization(&mut self, result: std::result::Result<(), String>) -> Result<()> {
        if !self.active {
            return Ok(());
        }
        let Some(pending) = self.pending_auth.take() else {
            return Ok(());
        };

        self.resolved_auth = Some(result);
        let handlers = self.context.handlers().clone();
        let outcome = handlers.handle(self, pending.command, pending.stream_id);
        self.resolved_auth = None;
        outcome
    }

    /// Tear the session down. Safe to call any number of times.
    pub fn stop(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;

        let registry = self.context.registry().clone();
        if let Some(binding) = self.publish.take() {
            registry.unpublish(&binding.path.path, self.id);
        }
        if let Some(binding) = self.play.take() {
            registry.unsubscribe(&binding.path.path, self.id);
        }

        self.timers.cancel_all();
        self.fps_timer = None;
        self.pending_auth = None;

        self.context.listener().on_close(self.id);
        info!("Session {} closed", self.id);
    }

    // Output helpers used by the dispatcher and command handlers

    pub(crate) fn send_message(&mut self, message: &RtmpMessage) {
        self.encoder.encode_into(message, &mut self.output);
    }

    pub(crate) fn send_control(&mut self, control: ControlMessage) -> Result<()> {
        let message = control.to_message()?;
        self.send_message(&message);
        Ok(())
    }

    pub(crate) fn send_command(&mut self, stream_id: u32, command: &RtmpCommand) -> Result<()> {
        let message = RtmpMessage::new(MessageHeader::command(stream_id), command.encode()?);
        self.send_message(&message);
        Ok(())
    }

    pub(crate) fn send_data(&mut self, stream_id: u32, data: &RtmpData) -> Result<()> {
        let message = RtmpMessage::new(MessageHeader::data(0, stream_id), data.encode()?);
        self.send_message(&message);
        Ok(())
    }

    pub(crate) fn send_status(&mut self, stream_id: u32, level: &str, code: &str, description: &str) -> Result<()> {
        self.send_command(stream_id, &RtmpCommand::on_status(level, code, description))
    }

    /// Send a media frame to this player, honoring receiveAudio/receiveVideo
    pub(crate) fn send_frame(&mut self, frame: &MediaFrame, stream_id: u32) -> Result<()> {
        if (frame.is_audio() && !self.receive_audio) || (frame.is_video() && !self.receive_video) {
            return Ok(());
        }
        self.send_message(&frame.to_message(stream_id));
        Ok(())
    }

    /// Announce and switch the outgoing chunk size
    pub(crate) fn set_out_chunk_size(&mut self, size: u32) -> Result<()> {
        self.send_control(ControlMessage::SetChunkSize(size))?;
        self.encoder.set_chunk_size(size);
        Ok(())
    }

    /// Consult the authorizer for a publish or play. Returns true when the
    /// handler may go on; otherwise a rejection was sent or the command is
    /// parked until the decision arrives.
    pub(crate) fn authorize(
        &mut self,
        action: AuthAction,
        path: &StreamPath,
        command: &RtmpCommand,
        stream_id: u32,
    ) -> Result<bool> {
        let decision = match self.resolved_auth.take() {
            Some(Ok(())) => AuthDecision::Allow,
            Some(Err(reason)) => AuthDecision::Deny(reason),
            None => {
                let request = AuthRequest {
                    session_id: self.id,
                    action,
                    app: self.app.clone(),
                    path: path.path.clone(),
                    args: path.args.clone(),
                };
                self.context.authorizer().authorize(&request)
            }
        };

        match decision {
            AuthDecision::Allow => Ok(true),
            AuthDecision::Deny(reason) => {
                info!("Session {} unauthorized for {}: {}", self.id, path, reason);
                let description = if reason.is_empty() {
                    "Authorization required."
                } else {
                    reason.as_str()
                };
                self.send_status(stream_id, "error", action.unauthorized_code(), description)?;
                Ok(false)
            }
            AuthDecision::Pending(receiver) => {
                debug!("Session {} waiting for authorization of {}", self.id, path);
                self.pending_auth = Some(PendingAuthorization {
                    command: command.clone(),
                    stream_id,
                    receiver: Some(receiver),
                });
                Ok(false)
            }
        }
    }

    /// Start counting video frames to estimate the frame rate
    pub(crate) fn start_fps_sampling(&mut self, now: Instant) {
        if self.fps_timer.is_none() {
            let window = self.context.config().fps_sample_window;
            self.fps_timer = Some(self.timers.schedule_once(TimerKind::FrameRateSample, window, now));
        }
    }

    pub(crate) fn start_keep_alive(&mut self, now: Instant) {
        let interval = self.context.config().ping_interval;
        if !interval.is_zero() && !self.timers.is_scheduled(TimerKind::KeepAlive) {
            self.timers.schedule_periodic(TimerKind::KeepAlive, interval, now);
        }
    }

    /// Time since `connect`
    pub fn uptime(&self, now: Instant) -> Duration {
        self.connected_at
            .map(|at| now.saturating_duration_since(at))
            .unwrap_or_default()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("app", &self.app)
            .field("publish", &self.publish)
            .field("play", &self.play)
            .finish()
    }
}
