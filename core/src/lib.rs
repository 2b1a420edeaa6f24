//! Async HTTP client core with request, response and error middleware.
//!
//! # Overview
//! `ApiClient` issues requests relative to a URL prefix. Each call flows
//! through an ordered chain of request middleware, a transport that races
//! the network against a per-call timeout and an optional cancellation
//! handle, an ordered chain of response middleware, and a content-type
//! driven body parser. Failures at any step become a single `ApiError`
//! shape before the error middleware and the caller see them.
//!
//! # Design
//! - Middleware lists are copy-on-write; each call works on a snapshot taken
//!   when it starts.
//! - Bodies stay logical (`Payload`) until the transport encodes them.
//! - `Transport` is a trait; `ReqwestTransport` is the default, tests plug in
//!   scripted transports.
//! - No retries, persistence or log sinks live here. `TracingMiddleware`
//!   emits `tracing` events and leaves formatting to the subscriber.

pub mod builtin;
pub mod cancel;
pub mod client;
pub mod config;
pub mod error;
pub mod headers;
pub mod http;
pub mod middleware;
pub mod parser;
pub mod payload;
pub mod transport;

pub use builtin::{BearerAuth, RequestId, TracingMiddleware};
pub use cancel::CancelHandle;
pub use client::{ApiClient, RequestOptions};
pub use config::{ClientConfig, ConfigError};
pub use error::{ApiError, BoxError, ErrorKind, TransportError};
pub use headers::Headers;
pub use http::{ApiResponse, HttpMethod, RawResponse, RequestDescriptor};
pub use middleware::{
    error_fn, request_fn, response_fn, ErrorMiddleware, MiddlewareId, RequestMiddleware, ResponseMiddleware,
};
pub use payload::Payload;
pub use transport::{ReqwestTransport, Transport, WireRequest};
