// Session-level tests: a full client conversation against an in-memory
// session, without sockets.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use common::*;
use rtmp::{
    AuthDecision, AuthRequest, ControlMessage, MessageHeader, RtmpCommand, RtmpData, RtmpMessage,
    ServerContext, SessionId, SessionListener, SessionState, UserControlEvent, MediaFrame,
    MSG_TYPE_DATA_AMF0,
};
use tokio::sync::oneshot;

fn controls(messages: &[RtmpMessage]) -> Vec<ControlMessage> {
    messages
        .iter()
        .filter(|m| ControlMessage::is_control_type(m.message_type()))
        .filter_map(|m| ControlMessage::decode(m.message_type(), &m.payload).ok())
        .collect()
}

fn set_data_frame(stream_id: u32) -> RtmpMessage {
    let data = RtmpData::set_data_frame(metadata_object());
    RtmpMessage::new(MessageHeader::data(0, stream_id), data.encode().unwrap())
}

/// Publisher on `/live/<name>` that has sent metadata, both sequence
/// headers, one key frame and two inter frames
fn start_publisher(context: &Arc<ServerContext>, name: &str) -> (TestPeer, u32) {
    let mut publisher = TestPeer::connected(context.clone());
    let stream_id = publisher.open_stream("live");
    let statuses = status_codes(&publisher.publish(stream_id, name));
    assert_eq!(statuses, vec!["NetStream.Publish.Start"]);

    publisher.send(&set_data_frame(stream_id));
    publisher.send(&video_message(0, stream_id, avc_sequence_header()));
    publisher.send(&audio_message(0, stream_id, aac_sequence_header()));
    publisher.send(&video_message(0, stream_id, avc_frame(true, 1)));
    publisher.send(&video_message(40, stream_id, avc_frame(false, 2)));
    publisher.send(&video_message(80, stream_id, avc_frame(false, 3)));
    (publisher, stream_id)
}

#[test]
fn test_connect_reply_sequence() {
    let mut peer = TestPeer::connected(test_context());
    assert_eq!(peer.session.state(), SessionState::Connecting);

    let messages = peer.connect("live/");
    assert_eq!(peer.session.app(), "live");
    assert_eq!(peer.session.state(), SessionState::Connected);

    let types: Vec<u8> = messages.iter().map(|m| m.message_type()).collect();
    assert_eq!(types, vec![5, 6, 1, 20]);

    let control = controls(&messages);
    assert_eq!(control[0], ControlMessage::WindowAckSize(test_config().window_ack_size));
    assert_eq!(control[2], ControlMessage::SetChunkSize(test_config().out_chunk_size));

    let result = decode_command(&messages[3]).unwrap();
    assert_eq!(result.name, "_result");
    assert_eq!(result.transaction_id, 1.0);
    assert_eq!(
        result.command_object.get_property("fmsVer").and_then(|v| v.as_string()),
        Some("FMS/3,0,1,123")
    );
    assert_eq!(result.status_code(), Some("NetConnection.Connect.Success"));
}

#[test]
fn test_create_stream_ids_increase() {
    let mut peer = TestPeer::connected(test_context());
    peer.connect("live");
    assert_eq!(peer.create_stream(), 1);
    assert_eq!(peer.create_stream(), 2);
}

#[test]
fn test_refused_connect_stops_session() {
    struct Refuse;
    impl SessionListener for Refuse {
        fn on_pre_connect(&self, _id: SessionId, _object: &rtmp::Amf0Value) -> bool {
            false
        }
    }

    let context = Arc::new(ServerContext::new(test_config()).with_listener(Arc::new(Refuse)));
    let mut peer = TestPeer::connected(context);
    let messages = peer.connect("live");
    assert!(messages.is_empty());
    assert!(!peer.session.is_active());
}

#[test]
fn test_player_joins_with_gop_then_live() {
    let context = test_context();
    let (mut publisher, publish_stream) = start_publisher(&context, "mystream");
    assert!(context.registry().is_publishing("/live/mystream"));

    let mut player = TestPeer::connected(context.clone());
    let play_stream = player.open_stream("live");
    let messages = player.play(play_stream, "mystream");

    assert_eq!(
        status_codes(&messages),
        vec!["NetStream.Play.Reset", "NetStream.Play.Start"]
    );
    assert_eq!(
        controls(&messages),
        vec![ControlMessage::UserControl(UserControlEvent::StreamBegin(play_stream))]
    );

    // Sample access, then the cached metadata
    let data: Vec<RtmpData> = messages
        .iter()
        .filter(|m| m.message_type() == MSG_TYPE_DATA_AMF0)
        .map(|m| RtmpData::decode(&m.payload).unwrap())
        .collect();
    assert_eq!(data[0].name, "|RtmpSampleAccess");
    assert_eq!(data[1].name, "onMetaData");

    let media = media_messages(&messages);
    let payloads: Vec<Vec<u8>> = media.iter().map(|m| m.payload.clone()).collect();
    assert_eq!(
        payloads,
        vec![
            avc_sequence_header(),
            aac_sequence_header(),
            avc_frame(true, 1),
            avc_frame(false, 2),
            avc_frame(false, 3),
        ]
    );
    assert!(media.iter().all(|m| m.message_stream_id() == play_stream));
    assert_eq!(media[4].timestamp(), 80);

    // Live frames follow the cached ones
    publisher.send(&video_message(120, publish_stream, avc_frame(false, 4)));
    publisher.send(&audio_message(120, publish_stream, aac_frame(9)));
    player.pump_events();
    let live = player.receive();
    let live_payloads: Vec<Vec<u8>> = live.iter().map(|m| m.payload.clone()).collect();
    assert_eq!(live_payloads, vec![avc_frame(false, 4), aac_frame(9)]);
}

/// Media payloads and onMetaData bodies a player received, in order
fn stream_content(messages: &[RtmpMessage]) -> Vec<Vec<u8>> {
    messages
        .iter()
        .filter(|m| {
            m.is_audio()
                || m.is_video()
                || (m.message_type() == MSG_TYPE_DATA_AMF0
                    && RtmpData::decode(&m.payload).is_ok_and(|d| d.name == "onMetaData"))
        })
        .map(|m| m.payload.clone())
        .collect()
}

#[test]
fn test_early_and_late_players_see_same_stream() {
    let context = test_context();

    let mut early = TestPeer::connected(context.clone());
    let early_stream = early.open_stream("live");
    early.play(early_stream, "same");

    let (mut publisher, publish_stream) = start_publisher(&context, "same");
    early.pump_events();
    let mut early_messages = early.receive();

    let mut late = TestPeer::connected(context.clone());
    let late_stream = late.open_stream("live");
    let mut late_messages = late.play(late_stream, "same");

    publisher.send(&video_message(120, publish_stream, avc_frame(false, 4)));
    for player in [&mut early, &mut late] {
        player.pump_events();
    }
    early_messages.extend(early.receive());
    late_messages.extend(late.receive());

    let early_content = stream_content(&early_messages);
    assert_eq!(early_content.len(), 7);
    assert_eq!(early_content, stream_content(&late_messages));
}

#[test]
fn test_publisher_metadata() {
    let context = test_context();
    let (publisher, _) = start_publisher(&context, "meta");

    let metadata = publisher.session.metadata();
    assert_eq!(metadata.video_codec_name(), "H264");
    assert_eq!(metadata.audio_codec_name(), "AAC");
    assert_eq!(metadata.video_fps, 30);
    assert_eq!(metadata.audio_sample_rate, 44100);
    assert_eq!(metadata.audio_channels, 2);
    assert_eq!(metadata.audio_profile, "LC");
    assert!(metadata.aac_config_seen);
    assert_eq!(metadata.video_count, 4);
}

#[test]
fn test_publish_path_is_exclusive() {
    let context = test_context();
    let (_publisher, _) = start_publisher(&context, "taken");

    let mut second = TestPeer::connected(context.clone());
    let stream_id = second.open_stream("live");
    assert_eq!(
        status_codes(&second.publish(stream_id, "taken")),
        vec!["NetStream.Publish.BadName"]
    );
    assert!(!second.session.is_publishing());

    // Query arguments are not part of the path
    assert_eq!(
        status_codes(&second.publish(stream_id, "taken?key=1")),
        vec!["NetStream.Publish.BadName"]
    );
}

#[test]
fn test_session_publishes_once() {
    let context = test_context();
    let mut peer = TestPeer::connected(context.clone());
    let stream_id = peer.open_stream("live");
    assert_eq!(status_codes(&peer.publish(stream_id, "a")), vec!["NetStream.Publish.Start"]);

    let other_stream = peer.create_stream();
    assert_eq!(
        status_codes(&peer.publish(other_stream, "b")),
        vec!["NetStream.Publish.BadConnection"]
    );
    assert!(!context.registry().is_publishing("/live/b"));
}

#[test]
fn test_session_plays_once() {
    let context = test_context();
    let mut peer = TestPeer::connected(context);
    let stream_id = peer.open_stream("live");
    peer.play(stream_id, "a");
    assert_eq!(
        status_codes(&peer.play(stream_id, "b")),
        vec!["NetStream.Play.BadConnection"]
    );
}

#[test]
fn test_waiting_player_is_notified() {
    let context = test_context();
    let mut player = TestPeer::connected(context.clone());
    let play_stream = player.open_stream("live");
    let messages = player.play(play_stream, "later");
    assert!(media_messages(&messages).is_empty());
    assert!(player.session.is_playing());

    let (mut publisher, _) = start_publisher(&context, "later");
    player.pump_events();
    let messages = player.receive();
    assert_eq!(
        controls(&messages)[0],
        ControlMessage::UserControl(UserControlEvent::StreamBegin(play_stream))
    );
    assert_eq!(status_codes(&messages), vec!["NetStream.Play.PublishNotify"]);
    // Everything published after the notice arrives live
    assert_eq!(media_messages(&messages).len(), 5);

    publisher.session.stop();
    player.pump_events();
    let messages = player.receive();
    assert_eq!(status_codes(&messages), vec!["NetStream.Play.UnpublishNotify"]);
    assert_eq!(
        controls(&messages),
        vec![ControlMessage::UserControl(UserControlEvent::StreamEof(play_stream))]
    );
    assert!(!context.registry().is_publishing("/live/later"));
}

#[test]
fn test_receive_video_false_filters_video() {
    let context = test_context();
    let (mut publisher, publish_stream) = start_publisher(&context, "audio-only");

    let mut player = TestPeer::connected(context.clone());
    let play_stream = player.open_stream("live");
    player.send_command(
        play_stream,
        &RtmpCommand::new("receiveVideo", 0.0).with_argument(false),
    );
    let joined = player.play(play_stream, "audio-only");
    assert!(media_messages(&joined).iter().all(|m| m.is_audio()));

    publisher.send(&video_message(120, publish_stream, avc_frame(false, 4)));
    publisher.send(&audio_message(120, publish_stream, aac_frame(5)));
    player.pump_events();
    let live = player.receive();
    assert_eq!(live.len(), 1);
    assert!(live[0].is_audio());
}

#[test]
fn test_delete_stream_releases_path() {
    let context = test_context();
    let (mut publisher, stream_id) = start_publisher(&context, "gone");

    publisher.send_command(
        0,
        &RtmpCommand::new("deleteStream", 0.0).with_argument(stream_id as f64),
    );
    assert!(!publisher.session.is_publishing());
    assert!(!context.registry().is_publishing("/live/gone"));
    assert_eq!(context.registry().cached_frames("/live/gone"), 0);

    let mut next = TestPeer::connected(context.clone());
    let next_stream = next.open_stream("live");
    assert_eq!(status_codes(&next.publish(next_stream, "gone")), vec!["NetStream.Publish.Start"]);
}

#[test]
fn test_media_without_publish_is_ignored() {
    let context = test_context();
    let mut peer = TestPeer::connected(context.clone());
    let stream_id = peer.open_stream("live");
    peer.send(&video_message(0, stream_id, avc_frame(true, 1)));
    assert_eq!(peer.session.metadata().video_count, 0);
    assert!(context.registry().summaries().is_empty());
}

#[test]
fn test_acknowledgement_after_window() {
    let mut peer = TestPeer::connected(test_context());
    peer.connect("live");

    let window = ControlMessage::WindowAckSize(4096).to_message().unwrap();
    peer.send(&window);
    assert!(controls(&peer.receive()).is_empty());

    peer.send(&video_message(0, 1, vec![0x27; 5000]));
    let acks: Vec<ControlMessage> = controls(&peer.receive());
    assert_eq!(
        acks,
        vec![ControlMessage::Acknowledgement(peer.session.bytes_received() as u32)]
    );
}

#[test]
fn test_authorizer_denies_without_token() {
    let authorizer = |request: &AuthRequest| {
        if request.args.get("token").map(String::as_str) == Some("secret") {
            AuthDecision::Allow
        } else {
            AuthDecision::Deny(String::new())
        }
    };
    let context = Arc::new(ServerContext::new(test_config()).with_authorizer(Arc::new(authorizer)));

    let mut peer = TestPeer::connected(context.clone());
    let stream_id = peer.open_stream("live");
    let messages = peer.publish(stream_id, "cam");
    assert_eq!(status_codes(&messages), vec!["NetStream.Publish.Unauthorized"]);
    let reply = messages.iter().find_map(decode_command).unwrap();
    assert_eq!(
        reply.arguments[0].get_property("description").and_then(|v| v.as_string()),
        Some("Authorization required.")
    );

    assert_eq!(
        status_codes(&peer.publish(stream_id, "cam?token=secret")),
        vec!["NetStream.Publish.Start"]
    );
    assert_eq!(
        peer.session.publish_path().and_then(|p| p.arg("token")),
        Some("secret")
    );
    assert!(context.registry().is_publishing("/live/cam"));
}

#[test]
fn test_pending_authorization_resumes_publish() {
    let parked: Arc<Mutex<Vec<oneshot::Sender<Result<(), String>>>>> = Arc::new(Mutex::new(Vec::new()));
    let parked_in = parked.clone();
    let authorizer = move |_request: &AuthRequest| {
        let (sender, receiver) = oneshot::channel();
        parked_in.lock().unwrap().push(sender);
        AuthDecision::Pending(receiver)
    };
    let context = Arc::new(ServerContext::new(test_config()).with_authorizer(Arc::new(authorizer)));

    let mut peer = TestPeer::connected(context.clone());
    let stream_id = peer.open_stream("live");
    assert!(status_codes(&peer.publish(stream_id, "slow")).is_empty());
    assert!(peer.session.has_pending_authorization());
    assert!(!context.registry().is_publishing("/live/slow"));

    let mut receiver = peer.session.take_pending_authorization().unwrap();
    parked.lock().unwrap().pop().unwrap().send(Ok(())).unwrap();
    let verdict = receiver.try_recv().unwrap();
    peer.session.resolve_authorization(verdict).unwrap();

    assert_eq!(status_codes(&peer.receive()), vec!["NetStream.Publish.Start"]);
    assert!(!peer.session.has_pending_authorization());
    assert!(context.registry().is_publishing("/live/slow"));
}

#[test]
fn test_pending_authorization_denied() {
    let authorizer = |_request: &AuthRequest| {
        let (sender, receiver) = oneshot::channel();
        sender.send(Err("banned".to_string())).unwrap();
        AuthDecision::Pending(receiver)
    };
    let context = Arc::new(ServerContext::new(test_config()).with_authorizer(Arc::new(authorizer)));

    let mut peer = TestPeer::connected(context);
    let stream_id = peer.open_stream("live");
    peer.play(stream_id, "vip");

    let mut receiver = peer.session.take_pending_authorization().unwrap();
    let verdict = receiver.try_recv().unwrap();
    peer.session.resolve_authorization(verdict).unwrap();

    let messages = peer.receive();
    assert_eq!(status_codes(&messages), vec!["NetStream.Play.Unauthorized"]);
    let reply = messages.iter().find_map(decode_command).unwrap();
    assert_eq!(
        reply.arguments[0].get_property("description").and_then(|v| v.as_string()),
        Some("banned")
    );
    assert!(!peer.session.is_playing());
}

#[derive(Default)]
struct CountingListener {
    frames: AtomicUsize,
    closes: AtomicUsize,
    ready: Mutex<Vec<String>>,
}

impl SessionListener for CountingListener {
    fn on_publish_ready(&self, _session_id: SessionId, path: &str) {
        self.ready.lock().unwrap().push(path.to_string());
    }

    fn on_frame(&self, _session_id: SessionId, _path: &str, _frame: &MediaFrame) {
        self.frames.fetch_add(1, Ordering::SeqCst);
    }

    fn on_close(&self, _session_id: SessionId) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_stop_is_idempotent() {
    let listener = Arc::new(CountingListener::default());
    let context = Arc::new(ServerContext::new(test_config()).with_listener(listener.clone()));

    let (mut publisher, _) = start_publisher(&context, "once");
    assert_eq!(*listener.ready.lock().unwrap(), vec!["/live/once".to_string()]);
    // Metadata, two sequence headers and three frames
    assert_eq!(listener.frames.load(Ordering::SeqCst), 6);

    publisher.session.stop();
    publisher.session.stop();
    assert_eq!(listener.closes.load(Ordering::SeqCst), 1);
    assert_eq!(publisher.session.state(), SessionState::Closed);
    assert!(!context.registry().is_publishing("/live/once"));

    // A stopped session ignores further input
    publisher.session.feed(&[0u8; 64]).unwrap();
    assert!(!publisher.session.has_output());

    drop(publisher);
    assert_eq!(listener.closes.load(Ordering::SeqCst), 1);
}

#[test]
fn test_malformed_chunk_stops_session() {
    let context = test_context();
    let (mut publisher, _) = start_publisher(&context, "broken");

    // Command whose payload is not AMF0
    let garbage = RtmpMessage::new(MessageHeader::command(0), vec![0xFF, 0x00]);
    let bytes = rtmp::ChunkEncoder::new().encode(&garbage);
    assert!(publisher.session.feed(&bytes).is_err());
    assert!(!publisher.session.is_active());
    assert!(!context.registry().is_publishing("/live/broken"));
}

#[test]
fn test_keep_alive_ping() {
    let mut peer = TestPeer::connected(test_context());
    peer.connect("live");

    let now = Instant::now();
    peer.session.poll_timers(now).unwrap();
    assert!(controls(&peer.receive()).is_empty());

    peer.session.poll_timers(now + test_config().ping_interval + Duration::from_secs(1)).unwrap();
    let pings: Vec<ControlMessage> = controls(&peer.receive());
    assert_eq!(pings.len(), 1);
    assert!(matches!(
        pings[0],
        ControlMessage::UserControl(UserControlEvent::PingRequest(ms)) if ms >= 60_000
    ));
}

#[test]
fn test_frame_rate_sampled_without_metadata() {
    let context = test_context();
    let mut publisher = TestPeer::connected(context);
    let stream_id = publisher.open_stream("live");
    publisher.publish(stream_id, "fps");

    for i in 0..50u32 {
        publisher.send(&video_message(i * 40, stream_id, avc_frame(i == 0, i as u8)));
    }
    assert_eq!(publisher.session.metadata().video_fps, 0);

    let later = Instant::now() + test_config().fps_sample_window + Duration::from_secs(1);
    publisher.session.poll_timers(later).unwrap();
    // 50 frames over a 5 second window
    assert_eq!(publisher.session.metadata().video_fps, 10);
}
