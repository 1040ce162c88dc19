// Common test utilities and helper functions
//
// `TestPeer` plays the client side of a session in memory: it performs the
// handshake, chunks outgoing messages and decodes whatever the session
// writes back.

#![allow(dead_code)]

use std::sync::Arc;
use rtmp::{
    Amf0Object, ChunkDecoder, ChunkEncoder, ControlMessage, HandshakeBlock,
    InputBuffer, MessageHeader, RtmpCommand, RtmpMessage, ServerConfig, ServerContext, Session,
    StreamEvent, HANDSHAKE_SIZE, MSG_TYPE_COMMAND_AMF0, MSG_TYPE_SET_CHUNK_SIZE,
};
use tokio::sync::mpsc::{self, Receiver};

pub struct TestPeer {
    pub session: Session,
    pub events: Receiver<StreamEvent>,
    encoder: ChunkEncoder,
    decoder: ChunkDecoder,
    input: InputBuffer,
    transaction_id: f64,
}

impl TestPeer {
    pub fn new(context: Arc<ServerContext>) -> Self {
        let (events_tx, events) = mpsc::channel(context.config().subscriber_queue_size);
        TestPeer {
            session: Session::new(context, events_tx),
            events,
            encoder: ChunkEncoder::new(),
            decoder: ChunkDecoder::new(),
            input: InputBuffer::new(),
            transaction_id: 1.0,
        }
    }

    /// New peer with the handshake already done
    pub fn connected(context: Arc<ServerContext>) -> Self {
        let mut peer = TestPeer::new(context);
        peer.handshake();
        peer
    }

    pub fn handshake(&mut self) {
        let mut c0c1 = vec![3u8];
        c0c1.extend_from_slice(&HandshakeBlock::generate().encode());
        self.session.feed(&c0c1).unwrap();

        let reply = self.session.take_output();
        assert_eq!(reply.len(), 1 + 2 * HANDSHAKE_SIZE);
        assert_eq!(reply[0], 3);

        let s1 = HandshakeBlock::parse(&reply[1..1 + HANDSHAKE_SIZE]).unwrap();
        self.session.feed(&HandshakeBlock::echo(&s1).encode()).unwrap();
        assert!(!self.session.has_output());
    }

    pub fn send(&mut self, message: &RtmpMessage) {
        let bytes = self.encoder.encode(message);
        self.session.feed(&bytes).unwrap();
    }

    pub fn send_command(&mut self, stream_id: u32, command: &RtmpCommand) {
        let message = RtmpMessage::new(MessageHeader::command(stream_id), command.encode().unwrap());
        self.send(&message);
    }

    fn next_transaction_id(&mut self) -> f64 {
        self.transaction_id += 1.0;
        self.transaction_id
    }

    /// Decode every message the session has written so far
    pub fn receive(&mut self) -> Vec<RtmpMessage> {
        let output = self.session.take_output();
        self.input.push(&output);

        let mut messages = Vec::new();
        while let Some(message) = self.decoder.decode(&mut self.input).unwrap() {
            if message.message_type() == MSG_TYPE_SET_CHUNK_SIZE {
                if let Ok(ControlMessage::SetChunkSize(size)) =
                    ControlMessage::decode(message.message_type(), &message.payload)
                {
                    self.decoder.set_chunk_size(size);
                }
            }
            messages.push(message);
        }
        messages
    }

    /// Hand queued registry events to the session, as the connection task does
    pub fn pump_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            self.session.handle_stream_event(event).unwrap();
        }
    }

    pub fn connect(&mut self, app: &str) -> Vec<RtmpMessage> {
        let command = RtmpCommand::connect(app, &format!("rtmp://localhost/{}", app));
        self.send_command(0, &command);
        self.receive()
    }

    pub fn create_stream(&mut self) -> u32 {
        let transaction_id = self.next_transaction_id();
        self.send_command(0, &RtmpCommand::create_stream(transaction_id));

        let reply = self
            .receive()
            .into_iter()
            .filter_map(|m| decode_command(&m))
            .find(|c| c.name == "_result" && c.transaction_id == transaction_id)
            .expect("createStream result");
        reply.arguments[0].as_number().unwrap() as u32
    }

    pub fn publish(&mut self, stream_id: u32, name: &str) -> Vec<RtmpMessage> {
        self.send_command(stream_id, &RtmpCommand::publish(name, "live"));
        self.receive()
    }

    pub fn play(&mut self, stream_id: u32, name: &str) -> Vec<RtmpMessage> {
        self.send_command(stream_id, &RtmpCommand::play(name, -2.0));
        self.receive()
    }

    /// Connect to `app` and open one message stream
    pub fn open_stream(&mut self, app: &str) -> u32 {
        self.connect(app);
        self.create_stream()
    }
}

pub fn test_context() -> Arc<ServerContext> {
    Arc::new(ServerContext::new(test_config()))
}

pub fn test_config() -> ServerConfig {
    ServerConfig::builder()
        .host("127.0.0.1")
        .port(1935)
        .max_connections(10)
        .build()
        .expect("Failed to create test server config")
}

pub fn decode_command(message: &RtmpMessage) -> Option<RtmpCommand> {
    if message.message_type() == MSG_TYPE_COMMAND_AMF0 {
        RtmpCommand::decode(&message.payload).ok()
    } else {
        None
    }
}

/// `code` of every onStatus message, in order
pub fn status_codes(messages: &[RtmpMessage]) -> Vec<String> {
    messages
        .iter()
        .filter_map(decode_command)
        .filter(|c| c.name == "onStatus")
        .filter_map(|c| c.status_code().map(str::to_string))
        .collect()
}

pub fn media_messages(messages: &[RtmpMessage]) -> Vec<&RtmpMessage> {
    messages.iter().filter(|m| m.is_audio() || m.is_video()).collect()
}

pub fn video_message(timestamp: u32, stream_id: u32, payload: Vec<u8>) -> RtmpMessage {
    RtmpMessage::new(MessageHeader::video(timestamp, stream_id), payload)
}

pub fn audio_message(timestamp: u32, stream_id: u32, payload: Vec<u8>) -> RtmpMessage {
    RtmpMessage::new(MessageHeader::audio(timestamp, stream_id), payload)
}

/// AVC sequence header carrying a 1280x720 baseline SPS
pub fn avc_sequence_header() -> Vec<u8> {
    let sps = [
        0x67, 0x42, 0xC0, 0x1F, 0xDA, 0x01, 0x40, 0x16, 0xEC, 0x04, 0x40, 0x00, 0x00, 0x03, 0x00,
        0x40, 0x00, 0x00, 0x0C, 0x83, 0xC6, 0x0C, 0xA8,
    ];
    let pps = [0x68, 0xCE, 0x3C, 0x80];

    let mut payload = vec![0x17, 0x00, 0x00, 0x00, 0x00];
    payload.extend_from_slice(&[0x01, sps[1], sps[2], sps[3], 0xFF, 0xE1]);
    payload.extend_from_slice(&(sps.len() as u16).to_be_bytes());
    payload.extend_from_slice(&sps);
    payload.push(0x01);
    payload.extend_from_slice(&(pps.len() as u16).to_be_bytes());
    payload.extend_from_slice(&pps);
    payload
}

pub fn avc_frame(keyframe: bool, marker: u8) -> Vec<u8> {
    let tag = if keyframe { 0x17 } else { 0x27 };
    vec![tag, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x02, 0x65, marker]
}

/// AAC-LC, 44.1 kHz, stereo
pub fn aac_sequence_header() -> Vec<u8> {
    vec![0xAF, 0x00, 0x12, 0x10]
}

pub fn aac_frame(marker: u8) -> Vec<u8> {
    vec![0xAF, 0x01, 0x21, marker]
}

pub fn metadata_object() -> Amf0Object {
    Amf0Object::new()
        .with("width", 1280.0)
        .with("height", 720.0)
        .with("framerate", 30.0)
        .with("audiosamplerate", 44100.0)
        .with("stereo", true)
}
