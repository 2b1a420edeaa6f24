//! Failure taxonomy and the single normalization point.
//!
//! # Design
//! Every stage of the pipeline returns an explicit `Result`. Stage failures
//! are collected as a `Fault` and turned into the one caller-visible shape,
//! `ApiError`, by `normalize`. A fault that already carries an `ApiError`
//! (for example one raised by a response middleware) passes through
//! unchanged, so an error is never wrapped twice.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::http::RawResponse;
use crate::parser::parse_body_lossy;
use crate::payload::Payload;

/// Error type returned by middleware and other pluggable components.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Shared handle to the fault underlying an `ApiError`.
pub type Cause = Arc<dyn std::error::Error + Send + Sync>;

/// Which kind of failure produced an `ApiError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The server could not be reached or the connection dropped.
    Network,
    /// The per-call timer elapsed first.
    Timeout,
    /// The caller's cancellation handle fired first.
    Cancelled,
    /// A response arrived with a status outside 200..=299.
    HttpStatus,
    /// A 2xx body did not match its declared content type.
    Parse,
    /// A request, response or error middleware failed.
    Middleware,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Network => "network",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::HttpStatus => "http_status",
            ErrorKind::Parse => "parse",
            ErrorKind::Middleware => "middleware",
        };
        f.write_str(name)
    }
}

/// The pipeline stage a middleware failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Request,
    Response,
    Error,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Request => f.write_str("request"),
            Stage::Response => f.write_str("response"),
            Stage::Error => f.write_str("error"),
        }
    }
}

/// The uniform error returned for every failed call.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
    pub status: Option<u16>,
    pub status_text: Option<String>,
    pub data: Option<Payload>,
    pub cause: Option<Cause>,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            status_text: None,
            data: None,
            cause: None,
        }
    }

    pub fn with_status(mut self, status: u16, status_text: impl Into<String>) -> Self {
        self.status = Some(status);
        self.status_text = Some(status_text.into());
        self
    }

    pub fn with_data(mut self, data: Option<Payload>) -> Self {
        self.data = data;
        self
    }

    pub fn with_cause(mut self, cause: impl Into<Cause>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    pub fn is_timeout(&self) -> bool {
        self.kind == ErrorKind::Timeout
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind == ErrorKind::Cancelled
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn std::error::Error + 'static))
    }
}

/// Failure reported by a `Transport` implementation.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("failed to read response body: {0}")]
    Body(String),

    #[error("invalid request: {0}")]
    Invalid(String),

    #[error("{0}")]
    Other(BoxError),
}

/// A failure that has not been normalized yet.
#[derive(Debug)]
pub enum Fault {
    Network(TransportError),
    Timeout(Duration),
    Cancelled,
    Status(RawResponse),
    Parse {
        status: u16,
        status_text: String,
        data: Option<Payload>,
        source: BoxError,
    },
    Middleware {
        stage: Stage,
        source: BoxError,
    },
    Normalized(ApiError),
}

impl Fault {
    /// Wrap a middleware failure, recognising an already-normalized error.
    pub fn middleware(stage: Stage, source: BoxError) -> Self {
        match source.downcast::<ApiError>() {
            Ok(err) => Fault::Normalized(*err),
            Err(source) => Fault::Middleware { stage, source },
        }
    }
}

impl From<ApiError> for Fault {
    fn from(err: ApiError) -> Self {
        Fault::Normalized(err)
    }
}

/// Convert any fault into an `ApiError`. Normalized faults pass through.
pub fn normalize(fault: Fault) -> ApiError {
    match fault {
        Fault::Normalized(err) => err,
        Fault::Network(source) => {
            ApiError::new(ErrorKind::Network, format!("network error: {source}")).with_cause(BoxError::from(source))
        }
        Fault::Timeout(after) => ApiError::new(
            ErrorKind::Timeout,
            format!("request timed out after {}ms", after.as_millis()),
        ),
        Fault::Cancelled => ApiError::new(ErrorKind::Cancelled, "request was cancelled"),
        Fault::Status(response) => {
            let data = parse_body_lossy(&response.headers, &response.body);
            let message = data
                .as_ref()
                .and_then(Payload::as_json)
                .and_then(|body| body.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| status_message(response.status, &response.status_text));
            ApiError::new(ErrorKind::HttpStatus, message)
                .with_status(response.status, response.status_text)
                .with_data(data)
        }
        Fault::Parse {
            status,
            status_text,
            data,
            source,
        } => ApiError::new(
            ErrorKind::Parse,
            format!("failed to parse response body: {source}"),
        )
        .with_status(status, status_text)
        .with_data(data)
        .with_cause(source),
        Fault::Middleware { stage, source } => {
            ApiError::new(ErrorKind::Middleware, format!("{stage} middleware failed: {source}")).with_cause(source)
        }
    }
}

fn status_message(status: u16, status_text: &str) -> String {
    if status_text.is_empty() {
        format!("HTTP {status}")
    } else {
        format!("HTTP {status} {status_text}")
    }
}
