//! Ready-made middleware.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{ApiError, BoxError};
use crate::http::{RawResponse, RequestDescriptor};
use crate::middleware::{ErrorMiddleware, RequestMiddleware, ResponseMiddleware};

/// Sets `Authorization: Bearer <token>` on every request.
#[derive(Clone)]
pub struct BearerAuth {
    token: String,
}

impl BearerAuth {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

impl std::fmt::Debug for BearerAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerAuth").field("token", &"***").finish()
    }
}

#[async_trait]
impl RequestMiddleware for BearerAuth {
    async fn on_request(&self, request: RequestDescriptor) -> Result<RequestDescriptor, BoxError> {
        Ok(request.with_header("Authorization", format!("Bearer {}", self.token)))
    }

    fn name(&self) -> &str {
        "bearer-auth"
    }
}

/// Tags each request with a random v4 UUID unless it already has one.
#[derive(Debug, Clone)]
pub struct RequestId {
    header: String,
}

impl RequestId {
    pub fn new() -> Self {
        Self::with_header("X-Request-ID")
    }

    pub fn with_header(header: impl Into<String>) -> Self {
        Self { header: header.into() }
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RequestMiddleware for RequestId {
    async fn on_request(&self, request: RequestDescriptor) -> Result<RequestDescriptor, BoxError> {
        if request.headers.contains(&self.header) {
            return Ok(request);
        }
        let id = Uuid::new_v4().to_string();
        Ok(request.with_header(self.header.clone(), id))
    }

    fn name(&self) -> &str {
        "request-id"
    }
}

/// Emits `tracing` events for requests, responses and errors.
///
/// Register the same value in all three chains to log a whole call.
#[derive(Debug, Clone, Default)]
pub struct TracingMiddleware {
    log_headers: bool,
}

impl TracingMiddleware {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also log header names and values at `trace` level.
    pub fn with_headers(mut self) -> Self {
        self.log_headers = true;
        self
    }
}

#[async_trait]
impl RequestMiddleware for TracingMiddleware {
    async fn on_request(&self, request: RequestDescriptor) -> Result<RequestDescriptor, BoxError> {
        tracing::info!(method = %request.method, url = %request.url, "http request");
        if self.log_headers {
            for (name, value) in request.headers.iter() {
                tracing::trace!(header = name, value, "request header");
            }
        }
        Ok(request)
    }

    fn name(&self) -> &str {
        "tracing"
    }
}

#[async_trait]
impl ResponseMiddleware for TracingMiddleware {
    async fn on_response(
        &self,
        response: RawResponse,
        request: &RequestDescriptor,
    ) -> Result<RawResponse, BoxError> {
        tracing::info!(
            method = %request.method,
            url = %request.url,
            status = response.status,
            bytes = response.body.len(),
            "http response"
        );
        if self.log_headers {
            for (name, value) in response.headers.iter() {
                tracing::trace!(header = name, value, "response header");
            }
        }
        Ok(response)
    }

    fn name(&self) -> &str {
        "tracing"
    }
}

#[async_trait]
impl ErrorMiddleware for TracingMiddleware {
    async fn on_error(&self, error: ApiError, request: &RequestDescriptor) -> Result<ApiError, BoxError> {
        tracing::warn!(
            method = %request.method,
            url = %request.url,
            kind = %error.kind,
            status = ?error.status,
            message = %error.message,
            "http error"
        );
        Ok(error)
    }

    fn name(&self) -> &str {
        "tracing"
    }
}
