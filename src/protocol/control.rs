use byteorder::{BigEndian, WriteBytesExt};
use crate::protocol::constants::*;
use crate::protocol::{MessageHeader, RtmpMessage};
use crate::{ByteReader, Error, Result};

/// Protocol control messages (types 1-6)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMessage {
    SetChunkSize(u32),
    Abort(u32),
    Acknowledgement(u32),
    UserControl(UserControlEvent),
    WindowAckSize(u32),
    SetPeerBandwidth { size: u32, limit_type: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserControlEvent {
    StreamBegin(u32),
    StreamEof(u32),
    StreamDry(u32),
    SetBufferLength { stream_id: u32, buffer_ms: u32 },
    StreamIsRecorded(u32),
    PingRequest(u32),
    PingResponse(u32),
    Unknown(u16),
}

impl ControlMessage {
    /// Check whether a message type is a control message
    pub fn is_control_type(message_type: u8) -> bool {
        (MSG_TYPE_SET_CHUNK_SIZE..=MSG_TYPE_SET_PEER_BW).contains(&message_type)
    }

    /// Parse a control message payload
    pub fn decode(message_type: u8, payload: &[u8]) -> Result<Self> {
        let mut reader = ByteReader::new(payload);
        let truncated =
            |_| Error::protocol(format!("Truncated control message of type {}", message_type));

        match message_type {
            MSG_TYPE_SET_CHUNK_SIZE => {
                let size = reader.read_u32_be().map_err(truncated)? & MAX_CHUNK_SIZE;
                if size == 0 {
                    return Err(Error::protocol("Set chunk size of zero"));
                }
                Ok(ControlMessage::SetChunkSize(size))
            }
            MSG_TYPE_ABORT => Ok(ControlMessage::Abort(reader.read_u32_be().map_err(truncated)?)),
            MSG_TYPE_ACK => Ok(ControlMessage::Acknowledgement(
                reader.read_u32_be().map_err(truncated)?,
            )),
            MSG_TYPE_USER_CONTROL => {
                let event_type = reader.read_u16_be().map_err(truncated)?;
                let event = match event_type {
                    EVENT_STREAM_BEGIN => {
                        UserControlEvent::StreamBegin(reader.read_u32_be().map_err(truncated)?)
                    }
                    EVENT_STREAM_EOF => {
                        UserControlEvent::StreamEof(reader.read_u32_be().map_err(truncated)?)
                    }
                    EVENT_STREAM_DRY => {
                        UserControlEvent::StreamDry(reader.read_u32_be().map_err(truncated)?)
                    }
                    EVENT_SET_BUFFER_LENGTH => UserControlEvent::SetBufferLength {
                        stream_id: reader.read_u32_be().map_err(truncated)?,
                        buffer_ms: reader.read_u32_be().map_err(truncated)?,
                    },
                    EVENT_STREAM_IS_RECORDED => {
                        UserControlEvent::StreamIsRecorded(reader.read_u32_be().map_err(truncated)?)
                    }
                    EVENT_PING_REQUEST => {
                        UserControlEvent::PingRequest(reader.read_u32_be().map_err(truncated)?)
                    }
                    EVENT_PING_RESPONSE => {
                        UserControlEvent::PingResponse(reader.read_u32_be().map_err(truncated)?)
                    }
                    other => UserControlEvent::Unknown(other),
                };
                Ok(ControlMessage::UserControl(event))
            }
            MSG_TYPE_WINDOW_ACK => Ok(ControlMessage::WindowAckSize(
                reader.read_u32_be().map_err(truncated)?,
            )),
            MSG_TYPE_SET_PEER_BW => Ok(ControlMessage::SetPeerBandwidth {
                size: reader.read_u32_be().map_err(truncated)?,
                // Some peers leave out the limit type
                limit_type: reader.read_u8().unwrap_or(PEER_BW_LIMIT_DYNAMIC),
            }),
            other => Err(Error::protocol(format!("Not a control message type: {}", other))),
        }
    }

    /// Build the wire message
    pub fn to_message(&self) -> Result<RtmpMessage> {
        let mut payload = Vec::with_capacity(10);
        let message_type = match *self {
            ControlMessage::SetChunkSize(size) => {
                payload.write_u32::<BigEndian>(size & MAX_CHUNK_SIZE)?;
                MSG_TYPE_SET_CHUNK_SIZE
            }
            ControlMessage::Abort(csid) => {
                payload.write_u32::<BigEndian>(csid)?;
                MSG_TYPE_ABORT
            }
            ControlMessage::Acknowledgement(sequence) => {
                payload.write_u32::<BigEndian>(sequence)?;
                MSG_TYPE_ACK
            }
            ControlMessage::UserControl(event) => {
                event.write_to(&mut payload)?;
                MSG_TYPE_USER_CONTROL
            }
            ControlMessage::WindowAckSize(size) => {
                payload.write_u32::<BigEndian>(size)?;
                MSG_TYPE_WINDOW_ACK
            }
            ControlMessage::SetPeerBandwidth { size, limit_type } => {
                payload.write_u32::<BigEndian>(size)?;
                payload.write_u8(limit_type)?;
                MSG_TYPE_SET_PEER_BW
            }
        };
        Ok(RtmpMessage::new(MessageHeader::control(message_type), payload))
    }
}

impl UserControlEvent {
    fn write_to(&self, payload: &mut Vec<u8>) -> Result<()> {
        let (event_type, value) = match *self {
            UserControlEvent::StreamBegin(id) => (EVENT_STREAM_BEGIN, id),
            UserControlEvent::StreamEof(id) => (EVENT_STREAM_EOF, id),
            UserControlEvent::StreamDry(id) => (EVENT_STREAM_DRY, id),
            UserControlEvent::SetBufferLength { stream_id, buffer_ms } => {
                payload.write_u16::<BigEndian>(EVENT_SET_BUFFER_LENGTH)?;
                payload.write_u32::<BigEndian>(stream_id)?;
                payload.write_u32::<BigEndian>(buffer_ms)?;
                return Ok(());
            }
            UserControlEvent::StreamIsRecorded(id) => (EVENT_STREAM_IS_RECORDED, id),
            UserControlEvent::PingRequest(ms) => (EVENT_PING_REQUEST, ms),
            UserControlEvent::PingResponse(ms) => (EVENT_PING_RESPONSE, ms),
            UserControlEvent::Unknown(event_type) => {
                return Err(Error::protocol(format!(
                    "Cannot encode unknown user control event {}",
                    event_type
                )));
            }
        };
        payload.write_u16::<BigEndian>(event_type)?;
        payload.write_u32::<BigEndian>(value)?;
        Ok(())
    }
}
