//! Loosely-typed inbound message values.
//!
//! Peers built from independently evolved encoders deliver the same logical
//! message as a flat property bag, as a getter-based object, or with numbers
//! spelled as strings. [`WireValue`] models the data, [`MessageSource`] models
//! the two ways of reading a named field from it.

use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Fixed-width integer array carried as one value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypedArray {
    /// Signed bytes.
    I8(Vec<i8>),
    /// Unsigned 16-bit words.
    U16(Vec<u16>),
    /// Signed 16-bit words.
    I16(Vec<i16>),
    /// Unsigned 32-bit words.
    U32(Vec<u32>),
    /// Signed 32-bit words.
    I32(Vec<i32>),
}

impl TypedArray {
    /// Underlying byte representation, little-endian.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        match self {
            TypedArray::I8(v) => v.iter().map(|x| x.to_le_bytes()[0]).collect(),
            TypedArray::U16(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            TypedArray::I16(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            TypedArray::U32(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            TypedArray::I32(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
        }
    }
}

/// One inbound value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum WireValue {
    /// Explicitly empty.
    #[default]
    Null,
    /// Boolean flag.
    Bool(bool),
    /// Any number; integers travel as whole floats.
    Number(f64),
    /// Text, possibly holding a number.
    Text(String),
    /// Raw byte buffer.
    Bytes(Vec<u8>),
    /// Typed integer buffer.
    Typed(TypedArray),
    /// Generic heterogeneous sequence.
    List(Vec<WireValue>),
    /// Property bag.
    Object(BTreeMap<String, WireValue>),
}

impl WireValue {
    /// Build an object from `(name, value)` pairs.
    pub fn object<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: Into<WireValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        WireValue::Object(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Whether the value is a binary buffer (raw or typed).
    pub fn is_buffer(&self) -> bool {
        matches!(self, WireValue::Bytes(_) | WireValue::Typed(_))
    }

    /// Property lookup on an object value.
    pub fn get(&self, name: &str) -> Option<&WireValue> {
        match self {
            WireValue::Object(map) => map.get(name),
            _ => None,
        }
    }
}

impl From<JsonValue> for WireValue {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => WireValue::Null,
            JsonValue::Bool(b) => WireValue::Bool(b),
            JsonValue::Number(n) => n.as_f64().map_or(WireValue::Null, WireValue::Number),
            JsonValue::String(s) => WireValue::Text(s),
            JsonValue::Array(items) => {
                WireValue::List(items.into_iter().map(WireValue::from).collect())
            }
            JsonValue::Object(map) => {
                WireValue::Object(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

impl From<f64> for WireValue {
    fn from(value: f64) -> Self {
        WireValue::Number(value)
    }
}

impl From<i64> for WireValue {
    fn from(value: i64) -> Self {
        WireValue::Number(value as f64)
    }
}

impl From<i32> for WireValue {
    fn from(value: i32) -> Self {
        WireValue::Number(f64::from(value))
    }
}

impl From<u32> for WireValue {
    fn from(value: u32) -> Self {
        WireValue::Number(f64::from(value))
    }
}

impl From<u16> for WireValue {
    fn from(value: u16) -> Self {
        WireValue::Number(f64::from(value))
    }
}

impl From<bool> for WireValue {
    fn from(value: bool) -> Self {
        WireValue::Bool(value)
    }
}

impl From<&str> for WireValue {
    fn from(value: &str) -> Self {
        WireValue::Text(value.to_string())
    }
}

impl From<String> for WireValue {
    fn from(value: String) -> Self {
        WireValue::Text(value)
    }
}

impl From<Vec<u8>> for WireValue {
    fn from(value: Vec<u8>) -> Self {
        WireValue::Bytes(value)
    }
}

impl From<TypedArray> for WireValue {
    fn from(value: TypedArray) -> Self {
        WireValue::Typed(value)
    }
}

impl From<Vec<WireValue>> for WireValue {
    fn from(value: Vec<WireValue>) -> Self {
        WireValue::List(value)
    }
}

/// Failure raised by a peer-supplied accessor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("accessor {name} failed: {reason}")]
pub struct AccessorError {
    /// Accessor that failed.
    pub name: String,
    /// What went wrong.
    pub reason: String,
}

impl AccessorError {
    /// Create an accessor error.
    pub fn new(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Something a decoder can read named fields from.
pub trait MessageSource {
    /// A plain data field.
    fn field(&self, name: &str) -> Option<&WireValue>;

    /// Invoke a named accessor.
    ///
    /// Returns `None` when no callable accessor of that name exists.
    fn call(&self, _accessor: &str) -> Option<Result<WireValue, AccessorError>> {
        None
    }

    /// The whole message as a single value, when it is one.
    fn as_value(&self) -> Option<&WireValue> {
        None
    }
}

impl MessageSource for WireValue {
    fn field(&self, name: &str) -> Option<&WireValue> {
        self.get(name)
    }

    fn as_value(&self) -> Option<&WireValue> {
        Some(self)
    }
}

type Accessor = Box<dyn Fn() -> Result<WireValue, AccessorError> + Send + Sync>;

/// A message exposing both data fields and accessor methods.
#[derive(Default)]
pub struct WireMessage {
    fields: BTreeMap<String, WireValue>,
    accessors: BTreeMap<String, Accessor>,
}

impl WireMessage {
    /// Empty message.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a data field.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<WireValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Add an accessor.
    pub fn with_accessor<F>(mut self, name: impl Into<String>, accessor: F) -> Self
    where
        F: Fn() -> Result<WireValue, AccessorError> + Send + Sync + 'static,
    {
        self.accessors.insert(name.into(), Box::new(accessor));
        self
    }

    /// Add an accessor that always yields `value`.
    pub fn with_getter(self, name: impl Into<String>, value: impl Into<WireValue>) -> Self {
        let value = value.into();
        self.with_accessor(name, move || Ok(value.clone()))
    }
}

impl MessageSource for WireMessage {
    fn field(&self, name: &str) -> Option<&WireValue> {
        self.fields.get(name)
    }

    fn call(&self, accessor: &str) -> Option<Result<WireValue, AccessorError>> {
        self.accessors.get(accessor).map(|f| f())
    }
}

impl fmt::Debug for WireMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WireMessage")
            .field("fields", &self.fields)
            .field("accessors", &self.accessors.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_converts_structurally() {
        let value = WireValue::from(json!({
            "sender": 2,
            "name": "alpha",
            "list": [1, "2", null],
            "flag": true,
        }));
        assert_eq!(value.get("sender"), Some(&WireValue::Number(2.0)));
        assert_eq!(value.get("name"), Some(&WireValue::Text("alpha".into())));
        assert_eq!(
            value.get("list"),
            Some(&WireValue::List(vec![
                WireValue::Number(1.0),
                WireValue::Text("2".into()),
                WireValue::Null,
            ]))
        );
        assert_eq!(value.get("flag"), Some(&WireValue::Bool(true)));
        assert_eq!(value.get("missing"), None);
    }

    #[test]
    fn typed_arrays_expose_little_endian_bytes() {
        assert_eq!(
            TypedArray::U16(vec![0x0102, 0x0304]).to_le_bytes(),
            vec![0x02, 0x01, 0x04, 0x03]
        );
        assert_eq!(
            TypedArray::I32(vec![-1]).to_le_bytes(),
            vec![0xFF, 0xFF, 0xFF, 0xFF]
        );
        assert_eq!(TypedArray::I8(vec![-2, 3]).to_le_bytes(), vec![0xFE, 0x03]);
    }

    #[test]
    fn wire_message_dispatches_fields_and_accessors() {
        let msg = WireMessage::new()
            .with_field("frame", 7)
            .with_getter("getSender", 3)
            .with_accessor("getBroken", || Err(AccessorError::new("getBroken", "boom")));

        assert_eq!(msg.field("frame"), Some(&WireValue::Number(7.0)));
        assert_eq!(msg.call("getSender"), Some(Ok(WireValue::Number(3.0))));
        assert!(matches!(msg.call("getBroken"), Some(Err(_))));
        assert_eq!(msg.call("getMissing"), None);
        assert!(msg.as_value().is_none());
    }

    #[test]
    fn non_objects_have_no_fields() {
        assert_eq!(WireValue::Number(1.0).field("x"), None);
        assert!(WireValue::Bytes(vec![1]).is_buffer());
        assert!(!WireValue::List(vec![]).is_buffer());
    }
}
