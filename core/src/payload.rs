//! Opaque request/response payloads.
//!
//! # Design
//! Request bodies and parsed response bodies are one tagged union instead of
//! untyped data. Middleware always sees a `Payload`, never encoded bytes; the
//! wire encoding happens in the transport layer.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// A logical body: structured JSON, text, or raw bytes.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Text(String),
    Binary(Bytes),
}

impl Payload {
    /// Serialize any value into a `Payload::Json`.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_value(value).map(Payload::Json)
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Payload::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(text) => Some(text),
            _ => None,
        }
    }

    /// True for an empty text or binary body. JSON is never empty.
    pub fn is_empty(&self) -> bool {
        match self {
            Payload::Json(_) => false,
            Payload::Text(text) => text.is_empty(),
            Payload::Binary(bytes) => bytes.is_empty(),
        }
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Payload::Binary(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Decode into a typed value.
    ///
    /// JSON decodes directly. Text decodes as a JSON string, so `String`
    /// targets receive the text unchanged. Binary decodes as a sequence of
    /// bytes, so `Vec<u8>` targets receive the raw body.
    ///
    /// An empty text or binary body (a 204, say) first tries `null`, so
    /// `()`, `Option<_>` and `Value` targets decode to nothing rather than
    /// to an empty string or array.
    pub fn decode<T: DeserializeOwned>(self) -> Result<T, serde_json::Error> {
        if self.is_empty() {
            if let Ok(value) = serde_json::from_value(Value::Null) {
                return Ok(value);
            }
        }
        match self {
            Payload::Json(value) => serde_json::from_value(value),
            Payload::Text(text) => serde_json::from_value(Value::String(text)),
            Payload::Binary(bytes) => serde_json::from_value(Value::Array(
                bytes.iter().map(|b| Value::from(*b)).collect(),
            )),
        }
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Payload::Json(value)
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_string())
    }
}

impl From<Bytes> for Payload {
    fn from(bytes: Bytes) -> Self {
        Payload::Binary(bytes)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload::Binary(Bytes::from(bytes))
    }
}
