use crate::{Error, Result};
use crate::amf::{Amf0Decoder, Amf0Encoder, Amf0Object, Amf0Value};

/// Decoded AMF0 invoke: name, transaction id, command object, then
/// positional arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct RtmpCommand {
    pub name: String,
    pub transaction_id: f64,
    pub command_object: Amf0Value,
    pub arguments: Vec<Amf0Value>,
}

impl RtmpCommand {
    /// Create new command with a null command object
    pub fn new(name: impl Into<String>, transaction_id: f64) -> Self {
        RtmpCommand {
            name: name.into(),
            transaction_id,
            command_object: Amf0Value::Null,
            arguments: Vec::new(),
        }
    }

    pub fn with_object(mut self, object: impl Into<Amf0Value>) -> Self {
        self.command_object = object.into();
        self
    }

    pub fn with_argument(mut self, argument: impl Into<Amf0Value>) -> Self {
        self.arguments.push(argument.into());
        self
    }

    /// Create connect command
    pub fn connect(app: &str, tc_url: &str) -> Self {
        let obj = Amf0Object::new()
            .with("app", app)
            .with("type", "nonprivate")
            .with("flashVer", "FMLE/3.0")
            .with("tcUrl", tc_url);

        RtmpCommand::new("connect", 1.0).with_object(obj)
    }

    /// Create createStream command
    pub fn create_stream(transaction_id: f64) -> Self {
        RtmpCommand::new("createStream", transaction_id)
    }

    /// Create publish command
    pub fn publish(stream_name: &str, publish_type: &str) -> Self {
        RtmpCommand::new("publish", 0.0)
            .with_argument(stream_name)
            .with_argument(publish_type)
    }

    /// Create play command
    pub fn play(stream_name: &str, start: f64) -> Self {
        RtmpCommand::new("play", 0.0)
            .with_argument(stream_name)
            .with_argument(start)
    }

    /// Create result response
    pub fn result(transaction_id: f64, result: impl Into<Amf0Value>) -> Self {
        RtmpCommand::new("_result", transaction_id).with_argument(result)
    }

    /// Create error response
    pub fn error(transaction_id: f64, error_obj: impl Into<Amf0Value>) -> Self {
        RtmpCommand::new("_error", transaction_id).with_argument(error_obj)
    }

    /// Create onStatus event
    pub fn on_status(level: &str, code: &str, description: &str) -> Self {
        let info = Amf0Object::new()
            .with("level", level)
            .with("code", code)
            .with("description", description);

        RtmpCommand::new("onStatus", 0.0).with_argument(info)
    }

    /// Positional argument as a string
    pub fn string_argument(&self, index: usize) -> Option<&str> {
        self.arguments.get(index).and_then(Amf0Value::as_string)
    }

    /// `code` field of an `onStatus` info object
    pub fn status_code(&self) -> Option<&str> {
        self.arguments
            .first()
            .and_then(|info| info.get_property("code"))
            .and_then(Amf0Value::as_string)
    }

    /// Encode command to bytes
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut encoder = Amf0Encoder::new();
        encoder.encode(&Amf0Value::String(self.name.clone()))?;
        encoder.encode(&Amf0Value::Number(self.transaction_id))?;
        encoder.encode(&self.command_object)?;
        for arg in &self.arguments {
            encoder.encode(arg)?;
        }
        Ok(encoder.into_bytes())
    }

    /// Decode command from bytes
    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut decoder = Amf0Decoder::new(data);

        let name = match decoder.decode()? {
            Amf0Value::String(s) | Amf0Value::LongString(s) => s,
            other => {
                return Err(Error::amf_decode(format!(
                    "Command name must be string, got {:?}",
                    other
                )));
            }
        };

        // Some encoders omit everything after the name
        let transaction_id = if decoder.has_remaining() {
            decoder.decode()?.as_number().unwrap_or(0.0)
        } else {
            0.0
        };

        let command_object = if decoder.has_remaining() {
            decoder.decode()?
        } else {
            Amf0Value::Null
        };

        let arguments = decoder.decode_all()?;

        Ok(RtmpCommand {
            name,
            transaction_id,
            command_object,
            arguments,
        })
    }
}
