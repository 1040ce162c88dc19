/// AMF0 data types
#[derive(Debug, Clone, PartialEq)]
pub enum Amf0Value {
    Number(f64),                // 0x00
    Boolean(bool),              // 0x01
    String(String),             // 0x02
    Object(Amf0Object),         // 0x03
    Null,                       // 0x05
    Undefined,                  // 0x06
    EcmaArray(Amf0Object),      // 0x08 (metadata)
    StrictArray(Vec<Amf0Value>), // 0x0A
    Date(f64, i16),             // 0x0B
    LongString(String),         // 0x0C
}

// AMF0 type markers
pub mod markers {
    pub const NUMBER: u8 = 0x00;
    pub const BOOLEAN: u8 = 0x01;
    pub const STRING: u8 = 0x02;
    pub const OBJECT: u8 = 0x03;
    pub const NULL: u8 = 0x05;
    pub const UNDEFINED: u8 = 0x06;
    pub const ECMA_ARRAY: u8 = 0x08;
    pub const OBJECT_END: u8 = 0x09;
    pub const STRICT_ARRAY: u8 = 0x0A;
    pub const DATE: u8 = 0x0B;
    pub const LONG_STRING: u8 = 0x0C;
}

/// Key/value pairs in wire order.
///
/// AMF0 objects are ordered on the wire; keeping them in a `Vec` lets an
/// encoded object come back out byte-for-byte identical.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Amf0Object {
    entries: Vec<(String, Amf0Value)>,
}

impl Amf0Object {
    pub fn new() -> Self {
        Amf0Object::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Amf0Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace a property, keeping the position of an existing key
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Amf0Value>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Amf0Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Amf0Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Numeric property
    pub fn number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Amf0Value::as_number)
    }

    /// String property
    pub fn string(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Amf0Value::as_string)
    }
}

impl<K: Into<String>> FromIterator<(K, Amf0Value)> for Amf0Object {
    fn from_iter<I: IntoIterator<Item = (K, Amf0Value)>>(iter: I) -> Self {
        let mut object = Amf0Object::new();
        for (k, v) in iter {
            object.insert(k, v);
        }
        object
    }
}

impl Amf0Value {
    /// Extract number value
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Amf0Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Extract string reference
    pub fn as_string(&self) -> Option<&str> {
        match self {
            Amf0Value::String(s) | Amf0Value::LongString(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Extract boolean value
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Amf0Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Extract object reference; ECMA arrays count as objects
    pub fn as_object(&self) -> Option<&Amf0Object> {
        match self {
            Amf0Value::Object(obj) | Amf0Value::EcmaArray(obj) => Some(obj),
            _ => None,
        }
    }

    /// Extract array reference
    pub fn as_array(&self) -> Option<&[Amf0Value]> {
        match self {
            Amf0Value::StrictArray(arr) => Some(arr),
            _ => None,
        }
    }

    /// Get property from object
    pub fn get_property(&self, key: &str) -> Option<&Amf0Value> {
        self.as_object().and_then(|obj| obj.get(key))
    }

    /// Check if null or undefined
    pub fn is_null(&self) -> bool {
        matches!(self, Amf0Value::Null | Amf0Value::Undefined)
    }
}

impl From<f64> for Amf0Value {
    fn from(n: f64) -> Self {
        Amf0Value::Number(n)
    }
}

impl From<u32> for Amf0Value {
    fn from(n: u32) -> Self {
        Amf0Value::Number(n as f64)
    }
}

impl From<bool> for Amf0Value {
    fn from(b: bool) -> Self {
        Amf0Value::Boolean(b)
    }
}

impl From<&str> for Amf0Value {
    fn from(s: &str) -> Self {
        Amf0Value::String(s.to_string())
    }
}

impl From<String> for Amf0Value {
    fn from(s: String) -> Self {
        Amf0Value::String(s)
    }
}

impl From<Amf0Object> for Amf0Value {
    fn from(obj: Amf0Object) -> Self {
        Amf0Value::Object(obj)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_keeps_insertion_order() {
        let obj = Amf0Object::new()
            .with("b", 1.0)
            .with("a", "x")
            .with("b", 2.0);

        let keys: Vec<&str> = obj.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(obj.number("b"), Some(2.0));
        assert_eq!(obj.string("a"), Some("x"));
    }

    #[test]
    fn test_accessors() {
        let value = Amf0Value::EcmaArray(Amf0Object::new().with("width", 1280.0));
        assert_eq!(value.get_property("width").and_then(|v| v.as_number()), Some(1280.0));
        assert!(Amf0Value::Undefined.is_null());
        assert_eq!(Amf0Value::from(true).as_boolean(), Some(true));
    }
}
