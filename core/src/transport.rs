//! Network dispatch with timeout and cancellation.
//!
//! # Design
//! `Transport` performs exactly one round-trip for an already-encoded
//! `WireRequest`. `dispatch` sits in front of it: it encodes the logical body,
//! then races the transport future against the per-call timer and the
//! caller's cancellation handle. Whichever settles first decides the outcome;
//! the others are dropped when `select!` returns, which clears the timer,
//! drops the cancellation subscription and aborts the in-flight request.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{Fault, TransportError};
use crate::headers::Headers;
use crate::http::{reason_phrase, HttpMethod, RawResponse, RequestDescriptor};
use crate::payload::Payload;

/// A request in wire form: the body is encoded bytes.
#[derive(Debug, Clone)]
pub struct WireRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Headers,
    pub body: Option<Bytes>,
}

/// Performs the network I/O for one request.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: WireRequest) -> Result<RawResponse, TransportError>;
}

/// Encode a descriptor into wire form.
///
/// The body is encoded only for methods that carry one. A default
/// `Content-Type` matching the payload is added unless the descriptor sets
/// one already.
pub fn encode(request: &RequestDescriptor) -> Result<WireRequest, TransportError> {
    let mut headers = request.headers.clone();
    let body = match (&request.body, request.method.carries_body()) {
        (Some(payload), true) => {
            let (bytes, content_type) = match payload {
                Payload::Json(value) => (
                    Bytes::from(serde_json::to_vec(value).map_err(|e| TransportError::Invalid(e.to_string()))?),
                    "application/json",
                ),
                Payload::Text(text) => (Bytes::from(text.clone()), "text/plain; charset=utf-8"),
                Payload::Binary(bytes) => (bytes.clone(), "application/octet-stream"),
            };
            if !headers.contains("content-type") {
                headers.insert("Content-Type", content_type);
            }
            Some(bytes)
        }
        _ => None,
    };

    Ok(WireRequest {
        method: request.method,
        url: request.url.clone(),
        headers,
        body,
    })
}

/// Execute `request` on `transport`, honouring its timeout and cancellation.
///
/// `timeout_ms` on the descriptor overrides `default_timeout_ms`; an
/// effective timeout of zero disables the timer.
pub async fn dispatch(
    transport: &dyn Transport,
    request: &RequestDescriptor,
    default_timeout_ms: u64,
) -> Result<RawResponse, Fault> {
    let wire = encode(request).map_err(Fault::Network)?;
    let timeout = Duration::from_millis(request.timeout_ms.unwrap_or(default_timeout_ms));

    let cancelled = async {
        match &request.cancel {
            Some(handle) => handle.cancelled().await,
            None => std::future::pending().await,
        }
    };
    let timer = async {
        if timeout.is_zero() {
            std::future::pending::<()>().await
        } else {
            tokio::time::sleep(timeout).await
        }
    };

    tokio::select! {
        biased;
        _ = cancelled => {
            tracing::debug!(url = %request.url, "request cancelled");
            Err(Fault::Cancelled)
        }
        _ = timer => {
            tracing::debug!(url = %request.url, timeout_ms = timeout.as_millis() as u64, "request timed out");
            Err(Fault::Timeout(timeout))
        }
        result = transport.send(wire) => result.map_err(Fault::Network),
    }
}

/// `Transport` backed by a `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: WireRequest) -> Result<RawResponse, TransportError> {
        let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes())
            .map_err(|e| TransportError::Invalid(e.to_string()))?;
        let mut builder = self.client.request(method, &request.url);
        for (name, value) in request.headers.iter() {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_connect() {
                TransportError::Connect(e.to_string())
            } else if e.is_builder() {
                TransportError::Invalid(e.to_string())
            } else {
                TransportError::Request(e.to_string())
            }
        })?;

        let status = response.status();
        let headers = collect_headers(response.headers());
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::Body(e.to_string()))?;

        Ok(RawResponse {
            status: status.as_u16(),
            status_text: reason_phrase(status.as_u16()).to_string(),
            headers,
            body,
        })
    }
}

/// Copy response headers, keeping every value of a repeated header.
fn collect_headers(map: &reqwest::header::HeaderMap) -> Headers {
    let mut headers = Headers::new();
    for (name, value) in map {
        headers.append(name.as_str(), String::from_utf8_lossy(value.as_bytes()));
    }
    headers
}
