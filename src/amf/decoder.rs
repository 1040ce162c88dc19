use crate::amf::amf0::{markers, Amf0Object, Amf0Value};
use crate::{ByteReader, Error, Result};

/// Nesting limit for objects and arrays
const MAX_DEPTH: usize = 64;

pub struct Amf0Decoder<'a> {
    reader: ByteReader<'a>,
    depth: usize,
}

impl<'a> Amf0Decoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Amf0Decoder {
            reader: ByteReader::new(data),
            depth: 0,
        }
    }

    /// Check if decoder has remaining data to decode
    pub fn has_remaining(&self) -> bool {
        self.reader.remaining() > 0
    }

    /// Decode every remaining value
    pub fn decode_all(&mut self) -> Result<Vec<Amf0Value>> {
        let mut values = Vec::new();
        while self.has_remaining() {
            values.push(self.decode()?);
        }
        Ok(values)
    }

    pub fn decode(&mut self) -> Result<Amf0Value> {
        let marker = self.read_u8()?;
        match marker {
            markers::NUMBER => Ok(Amf0Value::Number(self.read_f64()?)),
            markers::BOOLEAN => Ok(Amf0Value::Boolean(self.read_u8()? != 0)),
            markers::STRING => {
                let len = self.read_u16()? as usize;
                Ok(Amf0Value::String(self.read_utf8(len)?))
            }
            markers::OBJECT => Ok(Amf0Value::Object(self.decode_properties()?)),
            markers::NULL => Ok(Amf0Value::Null),
            markers::UNDEFINED => Ok(Amf0Value::Undefined),
            markers::ECMA_ARRAY => {
                // The declared count is advisory; the end marker terminates.
                let _count = self.read_u32()?;
                Ok(Amf0Value::EcmaArray(self.decode_properties()?))
            }
            markers::STRICT_ARRAY => self.decode_strict_array(),
            markers::DATE => {
                let timestamp = self.read_f64()?;
                let timezone = self
                    .reader
                    .read_i16_be()
                    .map_err(|e| Error::amf_decode(format!("Truncated date: {}", e)))?;
                Ok(Amf0Value::Date(timestamp, timezone))
            }
            markers::LONG_STRING => {
                let len = self.read_u32()? as usize;
                Ok(Amf0Value::LongString(self.read_utf8(len)?))
            }
            _ => Err(Error::amf_decode(format!("Unknown AMF0 marker: 0x{:02x}", marker))),
        }
    }

    fn decode_properties(&mut self) -> Result<Amf0Object> {
        self.enter()?;
        let mut object = Amf0Object::new();
        loop {
            let name_len = self.read_u16()? as usize;
            if name_len == 0 {
                let end = self.read_u8()?;
                if end != markers::OBJECT_END {
                    return Err(Error::amf_decode(format!(
                        "Expected object end marker, found 0x{:02x}",
                        end
                    )));
                }
                break;
            }
            let name = self.read_utf8(name_len)?;
            let value = self.decode()?;
            object.insert(name, value);
        }
        self.depth -= 1;
        Ok(object)
    }

    fn decode_strict_array(&mut self) -> Result<Amf0Value> {
        self.enter()?;
        let count = self.read_u32()? as usize;
        // Every element is at least one byte, so cap the preallocation.
        let mut array = Vec::with_capacity(count.min(self.reader.remaining()));
        for _ in 0..count {
            array.push(self.decode()?);
        }
        self.depth -= 1;
        Ok(Amf0Value::StrictArray(array))
    }

    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(Error::amf_decode("AMF0 value nested too deeply"));
        }
        Ok(())
    }

    fn read_u8(&mut self) -> Result<u8> {
        self.reader
            .read_u8()
            .map_err(|e| Error::amf_decode(format!("Truncated value: {}", e)))
    }

    fn read_u16(&mut self) -> Result<u16> {
        self.reader
            .read_u16_be()
            .map_err(|e| Error::amf_decode(format!("Truncated length: {}", e)))
    }

    fn read_u32(&mut self) -> Result<u32> {
        self.reader
            .read_u32_be()
            .map_err(|e| Error::amf_decode(format!("Truncated length: {}", e)))
    }

    fn read_f64(&mut self) -> Result<f64> {
        self.reader
            .read_f64_be()
            .map_err(|e| Error::amf_decode(format!("Truncated number: {}", e)))
    }

    fn read_utf8(&mut self, len: usize) -> Result<String> {
        let bytes = self
            .reader
            .read_bytes(len)
            .map_err(|e| Error::amf_decode(format!("Truncated string: {}", e)))?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| Error::amf_decode(format!("Invalid UTF-8 in string: {}", e)))
    }
}
