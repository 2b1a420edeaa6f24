//! The request client: builds descriptors and drives them through the
//! middleware chains, the transport and the response parser.
//!
//! # Design
//! `ApiClient` is cheap to clone; clones share the transport and the
//! middleware registry. Every call:
//!
//! 1. builds a `RequestDescriptor` from the prefix, default headers and
//!    per-call `RequestOptions`,
//! 2. snapshots the middleware lists,
//! 3. runs request middleware, dispatches, runs response middleware,
//! 4. rejects statuses outside 200..=299 and parses the body.
//!
//! Any failure along the way is normalized exactly once and then passed
//! through the error middleware before it reaches the caller.

use std::sync::Arc;
use std::time::Instant;

use serde::de::DeserializeOwned;

use crate::cancel::CancelHandle;
use crate::config::ClientConfig;
use crate::error::{normalize, ApiError, Fault};
use crate::headers::Headers;
use crate::http::{ApiResponse, HttpMethod, RequestDescriptor};
use crate::middleware::{
    ErrorMiddleware, MiddlewareId, MiddlewareRegistry, MiddlewareSnapshot, RequestMiddleware, ResponseMiddleware,
};
use crate::parser::{parse_body, parse_body_lossy};
use crate::payload::Payload;
use crate::transport::{dispatch, ReqwestTransport, Transport};

/// Per-call settings.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Merged over the client's default headers; these win on collision.
    pub headers: Headers,
    /// Overrides the client's default timeout. `Some(0)` disables it.
    pub timeout_ms: Option<u64>,
    pub cancel: Option<CancelHandle>,
    /// Bypass the request, response and error middleware for this call.
    pub skip_middlewares: bool,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn cancel(mut self, handle: CancelHandle) -> Self {
        self.cancel = Some(handle);
        self
    }

    pub fn skip_middlewares(mut self) -> Self {
        self.skip_middlewares = true;
        self
    }
}

/// HTTP client that runs every call through its middleware pipeline.
#[derive(Clone)]
pub struct ApiClient {
    url_prefix: Arc<str>,
    default_headers: Arc<Headers>,
    default_timeout_ms: u64,
    middlewares: Arc<MiddlewareRegistry>,
    transport: Arc<dyn Transport>,
}

impl ApiClient {
    /// Create a client using the reqwest transport.
    pub fn new(config: ClientConfig) -> Self {
        Self::with_transport(config, Arc::new(ReqwestTransport::new()))
    }

    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        let middlewares = MiddlewareRegistry::new();
        for middleware in config.request_middlewares {
            middlewares.push_request(middleware);
        }
        for middleware in config.response_middlewares {
            middlewares.push_response(middleware);
        }
        for middleware in config.error_middlewares {
            middlewares.push_error(middleware);
        }

        Self {
            url_prefix: Arc::from(config.url_prefix.trim_end_matches('/')),
            default_headers: Arc::new(config.default_headers),
            default_timeout_ms: config.default_timeout_ms,
            middlewares: Arc::new(middlewares),
            transport,
        }
    }

    pub fn url_prefix(&self) -> &str {
        &self.url_prefix
    }

    pub fn default_timeout_ms(&self) -> u64 {
        self.default_timeout_ms
    }

    pub fn use_request(&self, middleware: impl RequestMiddleware + 'static) -> MiddlewareId {
        self.middlewares.push_request(Arc::new(middleware))
    }

    pub fn use_response(&self, middleware: impl ResponseMiddleware + 'static) -> MiddlewareId {
        self.middlewares.push_response(Arc::new(middleware))
    }

    pub fn use_error(&self, middleware: impl ErrorMiddleware + 'static) -> MiddlewareId {
        self.middlewares.push_error(Arc::new(middleware))
    }

    pub fn remove_request(&self, id: MiddlewareId) -> bool {
        self.middlewares.remove_request(id)
    }

    pub fn remove_response(&self, id: MiddlewareId) -> bool {
        self.middlewares.remove_response(id)
    }

    pub fn remove_error(&self, id: MiddlewareId) -> bool {
        self.middlewares.remove_error(id)
    }

    pub fn clear_middlewares(&self) {
        self.middlewares.clear();
    }

    /// Number of registered (request, response, error) middleware.
    pub fn middleware_counts(&self) -> (usize, usize, usize) {
        self.middlewares.counts()
    }

    /// Build the descriptor for a call before any middleware runs.
    pub fn build_descriptor(
        &self,
        method: HttpMethod,
        endpoint: &str,
        body: Option<Payload>,
        options: &RequestOptions,
    ) -> RequestDescriptor {
        let url = if endpoint.starts_with('/') {
            format!("{}{endpoint}", self.url_prefix)
        } else {
            format!("{}/{endpoint}", self.url_prefix)
        };

        RequestDescriptor::new(method, url)
            .with_headers(&self.default_headers)
            .with_headers(&options.headers)
            .with_body(body)
            .with_timeout_ms(options.timeout_ms)
            .with_cancel(options.cancel.clone())
    }

    /// Issue a request and decode a successful body into `T`.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: HttpMethod,
        endpoint: &str,
        body: Option<Payload>,
        options: RequestOptions,
    ) -> Result<ApiResponse<T>, ApiError> {
        let descriptor = self.build_descriptor(method, endpoint, body, &options);
        self.execute(descriptor, options.skip_middlewares, Payload::decode::<T>)
            .await
    }

    /// Issue a request and return the parsed body as a `Payload`.
    pub async fn request_raw(
        &self,
        method: HttpMethod,
        endpoint: &str,
        body: Option<Payload>,
        options: RequestOptions,
    ) -> Result<ApiResponse<Payload>, ApiError> {
        let descriptor = self.build_descriptor(method, endpoint, body, &options);
        self.execute(descriptor, options.skip_middlewares, Ok::<Payload, serde_json::Error>)
            .await
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<ApiResponse<T>, ApiError> {
        self.request(HttpMethod::Get, endpoint, None, options).await
    }

    pub async fn post<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: Option<Payload>,
        options: RequestOptions,
    ) -> Result<ApiResponse<T>, ApiError> {
        self.request(HttpMethod::Post, endpoint, body, options).await
    }

    pub async fn put<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: Option<Payload>,
        options: RequestOptions,
    ) -> Result<ApiResponse<T>, ApiError> {
        self.request(HttpMethod::Put, endpoint, body, options).await
    }

    pub async fn patch<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: Option<Payload>,
        options: RequestOptions,
    ) -> Result<ApiResponse<T>, ApiError> {
        self.request(HttpMethod::Patch, endpoint, body, options).await
    }

    pub async fn delete<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<ApiResponse<T>, ApiError> {
        self.request(HttpMethod::Delete, endpoint, None, options).await
    }

    async fn execute<T, F>(
        &self,
        descriptor: RequestDescriptor,
        skip_middlewares: bool,
        decode: F,
    ) -> Result<ApiResponse<T>, ApiError>
    where
        F: FnOnce(Payload) -> Result<T, serde_json::Error>,
    {
        let started = Instant::now();
        let chain = if skip_middlewares {
            MiddlewareSnapshot::empty()
        } else {
            self.middlewares.snapshot()
        };
        tracing::debug!(method = %descriptor.method, url = %descriptor.url, "sending request");

        let original = descriptor.clone();
        let request = match chain.run_request(descriptor).await {
            Ok(request) => request,
            Err(fault) => return Err(self.fail(&chain, fault, &original, started).await),
        };

        match self.complete(&chain, &request, decode).await {
            Ok(response) => {
                tracing::debug!(
                    method = %request.method,
                    url = %request.url,
                    status = response.status,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "request succeeded"
                );
                Ok(response)
            }
            Err(fault) => Err(self.fail(&chain, fault, &request, started).await),
        }
    }

    async fn complete<T, F>(
        &self,
        chain: &MiddlewareSnapshot,
        request: &RequestDescriptor,
        decode: F,
    ) -> Result<ApiResponse<T>, Fault>
    where
        F: FnOnce(Payload) -> Result<T, serde_json::Error>,
    {
        let response = dispatch(self.transport.as_ref(), request, self.default_timeout_ms).await?;
        let response = chain.run_response(response, request).await?;
        if !response.is_success() {
            return Err(Fault::Status(response));
        }

        let payload = parse_body(&response.headers, &response.body).map_err(|e| Fault::Parse {
            status: response.status,
            status_text: response.status_text.clone(),
            data: parse_body_lossy(&response.headers, &response.body),
            source: Box::new(e),
        })?;
        let parsed = payload.clone();
        let data = decode(payload).map_err(|e| Fault::Parse {
            status: response.status,
            status_text: response.status_text.clone(),
            data: Some(parsed),
            source: Box::new(e),
        })?;

        Ok(ApiResponse {
            data,
            status: response.status,
            status_text: response.status_text,
            headers: response.headers,
            ok: true,
        })
    }

    async fn fail(
        &self,
        chain: &MiddlewareSnapshot,
        fault: Fault,
        request: &RequestDescriptor,
        started: Instant,
    ) -> ApiError {
        let error = chain.run_error(normalize(fault), request).await;
        tracing::debug!(
            method = %request.method,
            url = %request.url,
            kind = %error.kind,
            status = ?error.status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "request failed"
        );
        error
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("url_prefix", &self.url_prefix)
            .field("default_timeout_ms", &self.default_timeout_ms)
            .field("middlewares", &self.middlewares.counts())
            .finish()
    }
}
