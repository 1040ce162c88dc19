use byteorder::{BigEndian, WriteBytesExt};
use crate::amf::amf0::{markers, Amf0Object, Amf0Value};
use crate::{Error, Result};

pub struct Amf0Encoder {
    buffer: Vec<u8>,
}

impl Default for Amf0Encoder {
    fn default() -> Self {
        Amf0Encoder::new()
    }
}

impl Amf0Encoder {
    pub fn new() -> Self {
        Amf0Encoder {
            buffer: Vec::with_capacity(256),
        }
    }

    /// Encode a sequence of values back to back
    pub fn encode_all<'a>(values: impl IntoIterator<Item = &'a Amf0Value>) -> Result<Vec<u8>> {
        let mut encoder = Amf0Encoder::new();
        for value in values {
            encoder.encode(value)?;
        }
        Ok(encoder.into_bytes())
    }

    pub fn encode(&mut self, value: &Amf0Value) -> Result<()> {
        match value {
            Amf0Value::Number(n) => {
                self.buffer.write_u8(markers::NUMBER)?;
                self.buffer.write_f64::<BigEndian>(*n)?;
            }
            Amf0Value::Boolean(b) => {
                self.buffer.write_u8(markers::BOOLEAN)?;
                self.buffer.write_u8(u8::from(*b))?;
            }
            Amf0Value::String(s) => {
                self.buffer.write_u8(markers::STRING)?;
                self.write_short_string(s)?;
            }
            Amf0Value::Object(obj) => {
                self.buffer.write_u8(markers::OBJECT)?;
                self.write_properties(obj)?;
            }
            Amf0Value::Null => self.buffer.write_u8(markers::NULL)?,
            Amf0Value::Undefined => self.buffer.write_u8(markers::UNDEFINED)?,
            Amf0Value::EcmaArray(obj) => {
                self.buffer.write_u8(markers::ECMA_ARRAY)?;
                self.buffer.write_u32::<BigEndian>(obj.len() as u32)?;
                self.write_properties(obj)?;
            }
            Amf0Value::StrictArray(arr) => {
                self.buffer.write_u8(markers::STRICT_ARRAY)?;
                self.buffer.write_u32::<BigEndian>(arr.len() as u32)?;
                for item in arr {
                    self.encode(item)?;
                }
            }
            Amf0Value::Date(timestamp, timezone) => {
                self.buffer.write_u8(markers::DATE)?;
                self.buffer.write_f64::<BigEndian>(*timestamp)?;
                self.buffer.write_i16::<BigEndian>(*timezone)?;
            }
            Amf0Value::LongString(s) => {
                self.buffer.write_u8(markers::LONG_STRING)?;
                let bytes = s.as_bytes();
                let len = u32::try_from(bytes.len())
                    .map_err(|_| Error::amf_encode("Long string exceeds 4 GiB"))?;
                self.buffer.write_u32::<BigEndian>(len)?;
                self.buffer.extend_from_slice(bytes);
            }
        }
        Ok(())
    }

    fn write_properties(&mut self, obj: &Amf0Object) -> Result<()> {
        for (key, value) in obj.iter() {
            if key.is_empty() {
                return Err(Error::amf_encode("Object keys must not be empty"));
            }
            self.write_short_string(key)?;
            self.encode(value)?;
        }
        // Empty key + end marker
        self.buffer.write_u16::<BigEndian>(0)?;
        self.buffer.write_u8(markers::OBJECT_END)?;
        Ok(())
    }

    /// Length-prefixed string without a type marker
    fn write_short_string(&mut self, value: &str) -> Result<()> {
        let bytes = value.as_bytes();
        let len = u16::try_from(bytes.len()).map_err(|_| {
            Error::amf_encode(format!("String of {} bytes needs the long string type", bytes.len()))
        })?;
        self.buffer.write_u16::<BigEndian>(len)?;
        self.buffer.extend_from_slice(bytes);
        Ok(())
    }

    pub fn bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }
}
