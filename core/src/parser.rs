//! Content-type driven response body decoding.

use bytes::Bytes;
use thiserror::Error;

use crate::headers::Headers;
use crate::payload::Payload;

/// Why a response body could not be decoded as its declared content type.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid JSON body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid UTF-8 in text body: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// How a body will be decoded, derived from `Content-Type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Json,
    Text,
    Binary,
}

/// Classify a `Content-Type` value. Parameters such as `charset` are ignored.
pub fn body_kind(content_type: Option<&str>) -> BodyKind {
    let Some(content_type) = content_type else {
        return BodyKind::Binary;
    };
    let media_type = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    if media_type == "application/json" || media_type.ends_with("+json") {
        BodyKind::Json
    } else if media_type.starts_with("text/") {
        BodyKind::Text
    } else {
        BodyKind::Binary
    }
}

/// Decode a response body according to the response's `Content-Type`.
///
/// An empty JSON body decodes to `null`.
pub fn parse_body(headers: &Headers, body: &Bytes) -> Result<Payload, ParseError> {
    match body_kind(headers.get("content-type")) {
        BodyKind::Json if body.is_empty() => Ok(Payload::Json(serde_json::Value::Null)),
        BodyKind::Json => Ok(Payload::Json(serde_json::from_slice(body)?)),
        BodyKind::Text => Ok(Payload::Text(String::from_utf8(body.to_vec())?)),
        BodyKind::Binary => Ok(Payload::Binary(body.clone())),
    }
}

/// Best-effort decode used for error bodies: never fails, falls back to
/// lossy text for undecodable JSON or text.
pub fn parse_body_lossy(headers: &Headers, body: &Bytes) -> Option<Payload> {
    if body.is_empty() {
        return None;
    }
    match parse_body(headers, body) {
        Ok(payload) => Some(payload),
        Err(_) => Some(Payload::Text(String::from_utf8_lossy(body).into_owned())),
    }
}
