//! Request, response and error middleware, and the chains that run them.
//!
//! # Design
//! The client owns three ordered lists. Each list is an `Arc<Vec<_>>`; a
//! registration or removal builds a new vector and swaps it in, and a call
//! takes a `MiddlewareSnapshot` (three `Arc` clones) when it starts. An
//! in-flight call therefore never observes registrations made after it
//! began, and the lock is only held long enough to clone or swap a pointer.
//!
//! Every chain is a strict pipeline: each middleware receives the previous
//! one's output, in registration order.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use parking_lot::RwLock;

use crate::error::{normalize, ApiError, BoxError, Fault, Stage};
use crate::http::{RawResponse, RequestDescriptor};

/// Transforms a descriptor before it is dispatched.
#[async_trait]
pub trait RequestMiddleware: Send + Sync {
    async fn on_request(&self, request: RequestDescriptor) -> Result<RequestDescriptor, BoxError>;

    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Transforms a raw response before status checking and body parsing.
///
/// Returning an `ApiError` (boxed) hands that exact error to the error
/// chain; any other error is reported as a middleware failure.
#[async_trait]
pub trait ResponseMiddleware: Send + Sync {
    async fn on_response(
        &self,
        response: RawResponse,
        request: &RequestDescriptor,
    ) -> Result<RawResponse, BoxError>;

    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Transforms the normalized error of a failed call.
#[async_trait]
pub trait ErrorMiddleware: Send + Sync {
    async fn on_error(&self, error: ApiError, request: &RequestDescriptor) -> Result<ApiError, BoxError>;

    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Identifies a registration so it can be removed later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MiddlewareId(u64);

type Chain<M> = Arc<Vec<(MiddlewareId, Arc<M>)>>;

/// The client's three middleware lists.
pub struct MiddlewareRegistry {
    next_id: AtomicU64,
    request: RwLock<Chain<dyn RequestMiddleware>>,
    response: RwLock<Chain<dyn ResponseMiddleware>>,
    error: RwLock<Chain<dyn ErrorMiddleware>>,
}

impl Default for MiddlewareRegistry {
    fn default() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            request: RwLock::new(Arc::new(Vec::new())),
            response: RwLock::new(Arc::new(Vec::new())),
            error: RwLock::new(Arc::new(Vec::new())),
        }
    }
}

impl MiddlewareRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_request(&self, middleware: Arc<dyn RequestMiddleware>) -> MiddlewareId {
        let id = self.next_id();
        push(&self.request, id, middleware);
        id
    }

    pub fn push_response(&self, middleware: Arc<dyn ResponseMiddleware>) -> MiddlewareId {
        let id = self.next_id();
        push(&self.response, id, middleware);
        id
    }

    pub fn push_error(&self, middleware: Arc<dyn ErrorMiddleware>) -> MiddlewareId {
        let id = self.next_id();
        push(&self.error, id, middleware);
        id
    }

    pub fn remove_request(&self, id: MiddlewareId) -> bool {
        remove(&self.request, id)
    }

    pub fn remove_response(&self, id: MiddlewareId) -> bool {
        remove(&self.response, id)
    }

    pub fn remove_error(&self, id: MiddlewareId) -> bool {
        remove(&self.error, id)
    }

    pub fn clear(&self) {
        *self.request.write() = Arc::new(Vec::new());
        *self.response.write() = Arc::new(Vec::new());
        *self.error.write() = Arc::new(Vec::new());
    }

    /// Number of registered (request, response, error) middleware.
    pub fn counts(&self) -> (usize, usize, usize) {
        (
            self.request.read().len(),
            self.response.read().len(),
            self.error.read().len(),
        )
    }

    /// Capture the current lists for one call.
    pub fn snapshot(&self) -> MiddlewareSnapshot {
        MiddlewareSnapshot {
            request: Arc::clone(&self.request.read()),
            response: Arc::clone(&self.response.read()),
            error: Arc::clone(&self.error.read()),
        }
    }

    fn next_id(&self) -> MiddlewareId {
        MiddlewareId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }
}

fn push<M: ?Sized>(slot: &RwLock<Chain<M>>, id: MiddlewareId, middleware: Arc<M>) {
    let mut guard = slot.write();
    let mut next = Vec::clone(&guard);
    next.push((id, middleware));
    *guard = Arc::new(next);
}

fn remove<M: ?Sized>(slot: &RwLock<Chain<M>>, id: MiddlewareId) -> bool {
    let mut guard = slot.write();
    if !guard.iter().any(|(existing, _)| *existing == id) {
        return false;
    }
    let next = guard
        .iter()
        .filter(|(existing, _)| *existing != id)
        .cloned()
        .collect();
    *guard = Arc::new(next);
    true
}

/// The middleware lists as they were when a call began.
#[derive(Clone)]
pub struct MiddlewareSnapshot {
    request: Chain<dyn RequestMiddleware>,
    response: Chain<dyn ResponseMiddleware>,
    error: Chain<dyn ErrorMiddleware>,
}

impl MiddlewareSnapshot {
    /// A snapshot with no middleware, used when a call skips middleware.
    pub fn empty() -> Self {
        Self {
            request: Arc::new(Vec::new()),
            response: Arc::new(Vec::new()),
            error: Arc::new(Vec::new()),
        }
    }

    pub async fn run_request(&self, mut request: RequestDescriptor) -> Result<RequestDescriptor, Fault> {
        for (_, middleware) in self.request.iter() {
            tracing::trace!(middleware = middleware.name(), "request middleware");
            request = middleware
                .on_request(request)
                .await
                .map_err(|e| Fault::middleware(Stage::Request, e))?;
        }
        Ok(request)
    }

    pub async fn run_response(
        &self,
        mut response: RawResponse,
        request: &RequestDescriptor,
    ) -> Result<RawResponse, Fault> {
        for (_, middleware) in self.response.iter() {
            tracing::trace!(middleware = middleware.name(), status = response.status, "response middleware");
            response = middleware
                .on_response(response, request)
                .await
                .map_err(|e| Fault::middleware(Stage::Response, e))?;
        }
        Ok(response)
    }

    /// Run the error chain. A middleware that fails replaces the current
    /// error with its own (normalized) failure; later middleware still run.
    pub async fn run_error(&self, mut error: ApiError, request: &RequestDescriptor) -> ApiError {
        for (_, middleware) in self.error.iter() {
            tracing::trace!(middleware = middleware.name(), kind = %error.kind, "error middleware");
            error = match middleware.on_error(error, request).await {
                Ok(next) => next,
                Err(e) => normalize(Fault::middleware(Stage::Error, e)),
            };
        }
        error
    }
}

type RequestFn = dyn Fn(RequestDescriptor) -> BoxFuture<'static, Result<RequestDescriptor, BoxError>> + Send + Sync;
type ResponseFn =
    dyn Fn(RawResponse, RequestDescriptor) -> BoxFuture<'static, Result<RawResponse, BoxError>> + Send + Sync;
type ErrorFn = dyn Fn(ApiError, RequestDescriptor) -> BoxFuture<'static, Result<ApiError, BoxError>> + Send + Sync;

/// Request middleware backed by a closure.
pub struct FnRequestMiddleware {
    name: String,
    f: Box<RequestFn>,
}

/// Response middleware backed by a closure. The closure receives a copy of
/// the descriptor.
pub struct FnResponseMiddleware {
    name: String,
    f: Box<ResponseFn>,
}

/// Error middleware backed by a closure. The closure receives a copy of the
/// descriptor.
pub struct FnErrorMiddleware {
    name: String,
    f: Box<ErrorFn>,
}

pub fn request_fn<F>(name: impl Into<String>, f: F) -> FnRequestMiddleware
where
    F: Fn(RequestDescriptor) -> BoxFuture<'static, Result<RequestDescriptor, BoxError>> + Send + Sync + 'static,
{
    FnRequestMiddleware {
        name: name.into(),
        f: Box::new(f),
    }
}

pub fn response_fn<F>(name: impl Into<String>, f: F) -> FnResponseMiddleware
where
    F: Fn(RawResponse, RequestDescriptor) -> BoxFuture<'static, Result<RawResponse, BoxError>>
        + Send
        + Sync
        + 'static,
{
    FnResponseMiddleware {
        name: name.into(),
        f: Box::new(f),
    }
}

pub fn error_fn<F>(name: impl Into<String>, f: F) -> FnErrorMiddleware
where
    F: Fn(ApiError, RequestDescriptor) -> BoxFuture<'static, Result<ApiError, BoxError>> + Send + Sync + 'static,
{
    FnErrorMiddleware {
        name: name.into(),
        f: Box::new(f),
    }
}

#[async_trait]
impl RequestMiddleware for FnRequestMiddleware {
    async fn on_request(&self, request: RequestDescriptor) -> Result<RequestDescriptor, BoxError> {
        (self.f)(request).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl ResponseMiddleware for FnResponseMiddleware {
    async fn on_response(
        &self,
        response: RawResponse,
        request: &RequestDescriptor,
    ) -> Result<RawResponse, BoxError> {
        (self.f)(response, request.clone()).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl ErrorMiddleware for FnErrorMiddleware {
    async fn on_error(&self, error: ApiError, request: &RequestDescriptor) -> Result<ApiError, BoxError> {
        (self.f)(error, request.clone()).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}
