use crate::{Error, Result};
use crate::amf::{Amf0Decoder, Amf0Encoder, Amf0Object, Amf0Value};

/// AMF0 data message: a handler name followed by values, no transaction id
#[derive(Debug, Clone, PartialEq)]
pub struct RtmpData {
    pub name: String,
    pub values: Vec<Amf0Value>,
}

impl RtmpData {
    /// Create new data message
    pub fn new(name: impl Into<String>) -> Self {
        RtmpData {
            name: name.into(),
            values: Vec::new(),
        }
    }

    pub fn with_value(mut self, value: impl Into<Amf0Value>) -> Self {
        self.values.push(value.into());
        self
    }

    /// Create onMetaData message
    pub fn on_metadata(metadata: Amf0Value) -> Self {
        RtmpData::new("onMetaData").with_value(metadata)
    }

    /// Create setDataFrame message as sent by encoders
    pub fn set_data_frame(metadata: Amf0Object) -> Self {
        RtmpData::new("@setDataFrame")
            .with_value("onMetaData")
            .with_value(Amf0Value::EcmaArray(metadata))
    }

    /// Create the `|RtmpSampleAccess` notice sent to players
    pub fn sample_access(audio: bool, video: bool) -> Self {
        RtmpData::new("|RtmpSampleAccess")
            .with_value(audio)
            .with_value(video)
    }

    /// Metadata value carried by `@setDataFrame` or `onMetaData`
    pub fn metadata(&self) -> Option<&Amf0Value> {
        match self.name.as_str() {
            "@setDataFrame" => self.values.iter().find(|v| v.as_object().is_some()),
            "onMetaData" => self.values.first().filter(|v| v.as_object().is_some()),
            _ => None,
        }
    }

    /// Encode data message to bytes
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut encoder = Amf0Encoder::new();
        encoder.encode(&Amf0Value::String(self.name.clone()))?;
        for value in &self.values {
            encoder.encode(value)?;
        }
        Ok(encoder.into_bytes())
    }

    /// Decode data message from bytes
    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut decoder = Amf0Decoder::new(data);

        let name = match decoder.decode()? {
            Amf0Value::String(s) | Amf0Value::LongString(s) => s,
            other => {
                return Err(Error::amf_decode(format!(
                    "Data message name must be string, got {:?}",
                    other
                )));
            }
        };

        Ok(RtmpData {
            name,
            values: decoder.decode_all()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_data_frame_metadata() {
        let meta = Amf0Object::new().with("width", 1280.0).with("height", 720.0);
        let bytes = RtmpData::set_data_frame(meta.clone()).encode().unwrap();
        let decoded = RtmpData::decode(&bytes).unwrap();

        assert_eq!(decoded.name, "@setDataFrame");
        assert_eq!(decoded.metadata(), Some(&Amf0Value::EcmaArray(meta)));
    }

    #[test]
    fn test_bare_on_metadata() {
        let meta = Amf0Value::Object(Amf0Object::new().with("framerate", 30.0));
        let data = RtmpData::on_metadata(meta.clone());
        assert_eq!(data.metadata(), Some(&meta));
        assert_eq!(RtmpData::new("onCuePoint").metadata(), None);
    }

    #[test]
    fn test_sample_access_round_trip() {
        let bytes = RtmpData::sample_access(false, false).encode().unwrap();
        let decoded = RtmpData::decode(&bytes).unwrap();
        assert_eq!(decoded.name, "|RtmpSampleAccess");
        assert_eq!(decoded.values, vec![Amf0Value::Boolean(false), Amf0Value::Boolean(false)]);
    }
}
