//! End-to-end pipeline behaviour against a scripted in-memory transport.
//!
//! # Design
//! `Scripted` records every `WireRequest` it receives and answers from a
//! closure after an optional delay. Timeout and cancellation tests run on a
//! paused tokio clock so they are deterministic and instant.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use request_core::{
    error_fn, request_fn, response_fn, ApiClient, ApiError, BearerAuth, BoxError, CancelHandle, ClientConfig,
    ErrorKind, HttpMethod, Payload, RawResponse, RequestDescriptor, RequestOptions, Transport, TransportError,
    WireRequest,
};
use serde_json::{json, Value};

type Responder = dyn Fn(&WireRequest) -> Result<RawResponse, TransportError> + Send + Sync;

struct Scripted {
    delay: Duration,
    respond: Box<Responder>,
    seen: Mutex<Vec<WireRequest>>,
    completed: AtomicUsize,
}

impl Scripted {
    fn new(respond: impl Fn(&WireRequest) -> Result<RawResponse, TransportError> + Send + Sync + 'static) -> Self {
        Self {
            delay: Duration::ZERO,
            respond: Box::new(respond),
            seen: Mutex::new(Vec::new()),
            completed: AtomicUsize::new(0),
        }
    }

    fn json(status: u16, body: Value) -> Self {
        Self::new(move |_| {
            Ok(RawResponse::new(status, body.to_string()).with_header("Content-Type", "application/json"))
        })
    }

    fn delayed(mut self, ms: u64) -> Self {
        self.delay = Duration::from_millis(ms);
        self
    }

    fn last(&self) -> WireRequest {
        self.seen.lock().last().cloned().expect("transport was not called")
    }

    fn calls(&self) -> usize {
        self.seen.lock().len()
    }
}

#[async_trait]
impl Transport for Scripted {
    async fn send(&self, request: WireRequest) -> Result<RawResponse, TransportError> {
        self.seen.lock().push(request.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.completed.fetch_add(1, Ordering::SeqCst);
        (self.respond)(&request)
    }
}

const PREFIX: &str = "https://api.example.com";

fn client_with(transport: &Arc<Scripted>) -> ApiClient {
    let config = ClientConfig::builder(PREFIX).build().unwrap();
    ApiClient::with_transport(config, transport.clone())
}

fn opts() -> RequestOptions {
    RequestOptions::new()
}

/// Request middleware appending `label` to the `X-Trail` header and
/// recording the trail it observed.
fn trail(label: &'static str, log: Arc<Mutex<Vec<String>>>) -> impl request_core::RequestMiddleware {
    request_fn(label, move |req: RequestDescriptor| {
        let log = log.clone();
        Box::pin(async move {
            let seen = req.headers.get("x-trail").unwrap_or_default().to_string();
            log.lock().push(format!("{label} saw '{seen}'"));
            Ok(req.with_header("X-Trail", format!("{seen}{label}")))
        })
    })
}

fn counting_error_middleware(count: Arc<AtomicUsize>) -> impl request_core::ErrorMiddleware {
    error_fn("count", move |err, _req| {
        count.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move { Ok(err) })
    })
}

// ---------------------------------------------------------------------------
// Ordering and composition
// ---------------------------------------------------------------------------

#[tokio::test]
async fn request_middleware_composes_strictly_in_order() {
    let transport = Arc::new(Scripted::json(200, json!({})));
    let client = client_with(&transport);
    let log = Arc::new(Mutex::new(Vec::new()));
    client.use_request(trail("1", log.clone()));
    client.use_request(trail("2", log.clone()));
    client.use_request(trail("3", log.clone()));

    client.get::<Value>("/health", opts()).await.unwrap();

    assert_eq!(*log.lock(), vec!["1 saw ''", "2 saw '1'", "3 saw '12'"]);
    assert_eq!(transport.last().headers.get("x-trail"), Some("123"));
}

#[tokio::test]
async fn response_middleware_composes_in_order() {
    let transport = Arc::new(Scripted::json(200, json!({"n": 0})));
    let client = client_with(&transport);
    for label in ["a", "b"] {
        client.use_response(response_fn(label, move |resp: RawResponse, _req| {
            Box::pin(async move {
                let seen = resp.headers.get("x-seen").unwrap_or_default().to_string();
                Ok(resp.with_header("X-Seen", format!("{seen}{label}")))
            })
        }));
    }

    let resp = client.get::<Value>("/health", opts()).await.unwrap();
    assert_eq!(resp.headers.get("x-seen"), Some("ab"));
}

#[tokio::test]
async fn error_middleware_composes_in_order() {
    let transport = Arc::new(Scripted::json(500, json!({})));
    let client = client_with(&transport);
    for label in ["first", "second"] {
        client.use_error(error_fn(label, move |mut err: ApiError, _req| {
            Box::pin(async move {
                err.message = format!("{} > {label}", err.message);
                Ok(err)
            })
        }));
    }

    let err = client.get::<Value>("/boom", opts()).await.unwrap_err();
    assert_eq!(err.message, "HTTP 500 Internal Server Error > first > second");
}

#[tokio::test]
async fn caller_template_is_not_mutated() {
    let transport = Arc::new(Scripted::json(200, json!({})));
    let client = client_with(&transport);
    client.use_request(BearerAuth::new("X"));

    let template = opts().header("X-Client", "popup");
    client.get::<Value>("/a", template.clone()).await.unwrap();
    client.get::<Value>("/b", template.clone()).await.unwrap();

    assert!(!template.headers.contains("authorization"));
    assert_eq!(template.headers.len(), 1);
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn get_health_hits_prefixed_url() {
    let transport = Arc::new(Scripted::json(200, json!({"status": "ok"})));
    let client = client_with(&transport);

    client.get::<Value>("/health", opts()).await.unwrap();

    let wire = transport.last();
    assert_eq!(wire.method, HttpMethod::Get);
    assert_eq!(wire.url, "https://api.example.com/health");
    assert!(wire.body.is_none());
}

#[tokio::test]
async fn middleware_injected_authorization_reaches_transport() {
    let transport = Arc::new(Scripted::json(200, json!({})));
    let client = client_with(&transport);
    client.use_request(BearerAuth::new("X"));

    client.get::<Value>("/secure", opts()).await.unwrap();

    assert_eq!(transport.last().headers.get("Authorization"), Some("Bearer X"));
}

#[tokio::test]
async fn response_middleware_401_reaches_error_middleware_with_status() {
    let transport = Arc::new(Scripted::json(401, json!({"message": "token expired"})));
    let client = client_with(&transport);
    client.use_response(response_fn("unauthorized", |resp: RawResponse, _req| {
        Box::pin(async move {
            if resp.status == 401 {
                let err = ApiError::new(ErrorKind::HttpStatus, "please sign in again")
                    .with_status(resp.status, resp.status_text.clone());
                return Err(BoxError::from(err));
            }
            Ok(resp)
        })
    }));
    let observed = Arc::new(Mutex::new(Vec::new()));
    {
        let observed = observed.clone();
        client.use_error(error_fn("observe", move |err: ApiError, _req| {
            observed.lock().push((err.kind, err.status, err.message.clone()));
            Box::pin(async move { Ok(err) })
        }));
    }

    let err = client.get::<Value>("/me", opts()).await.unwrap_err();

    assert_eq!(
        *observed.lock(),
        vec![(ErrorKind::HttpStatus, Some(401), "please sign in again".to_string())]
    );
    assert_eq!(err.status, Some(401));
    assert_eq!(err.message, "please sign in again");
}

#[tokio::test]
async fn body_is_logical_for_middleware_and_encoded_on_the_wire() {
    let transport = Arc::new(Scripted::json(201, json!({"id": 1})));
    let client = client_with(&transport);
    let seen_body = Arc::new(Mutex::new(None));
    {
        let seen_body = seen_body.clone();
        client.use_request(request_fn("peek", move |req: RequestDescriptor| {
            *seen_body.lock() = req.body.clone();
            Box::pin(async move { Ok(req) })
        }));
    }

    let body = Payload::json(&json!({"display_name": "Ada"})).unwrap();
    client.post::<Value>("/profiles", Some(body.clone()), opts()).await.unwrap();

    assert_eq!(*seen_body.lock(), Some(body));
    let wire = transport.last();
    assert_eq!(wire.headers.get("content-type"), Some("application/json"));
    let sent: Value = serde_json::from_slice(wire.body.as_ref().unwrap()).unwrap();
    assert_eq!(sent, json!({"display_name": "Ada"}));
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn json_response_decodes_to_structured_payload() {
    let transport = Arc::new(Scripted::new(|_| {
        Ok(RawResponse::new(200, r#"{"a":1}"#).with_header("Content-Type", "application/json"))
    }));
    let client = client_with(&transport);

    let resp = client.get::<Value>("/a", opts()).await.unwrap();
    assert_eq!(resp.data, json!({"a": 1}));
    assert!(resp.ok);
    assert_eq!(resp.status, 200);
    assert_eq!(resp.headers.get("content-type"), Some("application/json"));
}

#[tokio::test]
async fn text_response_decodes_to_string() {
    let transport = Arc::new(Scripted::new(|_| {
        Ok(RawResponse::new(200, "ok").with_header("Content-Type", "text/plain"))
    }));
    let client = client_with(&transport);

    let resp = client.get::<String>("/text", opts()).await.unwrap();
    assert_eq!(resp.data, "ok");

    let raw = client.request_raw(HttpMethod::Get, "/text", None, opts()).await.unwrap();
    assert_eq!(raw.data, Payload::Text("ok".to_string()));
}

#[tokio::test]
async fn unknown_content_type_is_binary() {
    let transport = Arc::new(Scripted::new(|_| {
        Ok(RawResponse::new(200, vec![9u8, 8, 7]).with_header("Content-Type", "image/png"))
    }));
    let client = client_with(&transport);

    let raw = client.request_raw(HttpMethod::Get, "/img", None, opts()).await.unwrap();
    assert_eq!(raw.data.as_bytes().map(|b| b.to_vec()), Some(vec![9, 8, 7]));
}

#[tokio::test]
async fn malformed_json_is_a_parse_failure() {
    let transport = Arc::new(Scripted::new(|_| {
        Ok(RawResponse::new(200, "not json").with_header("Content-Type", "application/json"))
    }));
    let client = client_with(&transport);
    let count = Arc::new(AtomicUsize::new(0));
    client.use_error(counting_error_middleware(count.clone()));

    let err = client.get::<Value>("/malformed", opts()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Parse);
    assert_eq!(err.status, Some(200));
    assert_eq!(err.data, Some(Payload::Text("not json".to_string())));
    assert!(err.cause.is_some());
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn typed_decode_mismatch_is_a_parse_failure() {
    #[derive(Debug, serde::Deserialize)]
    #[allow(dead_code)]
    struct Profile {
        display_name: String,
    }

    let transport = Arc::new(Scripted::json(200, json!({"unexpected": true})));
    let client = client_with(&transport);

    let err = client.get::<Profile>("/profiles/1", opts()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Parse);
    assert!(err.message.starts_with("failed to parse response body"));
    assert_eq!(err.status, Some(200));
    assert_eq!(err.data, Some(Payload::Json(json!({"unexpected": true}))));
}

#[tokio::test]
async fn no_content_decodes_for_unit_and_optional_targets() {
    let transport = Arc::new(Scripted::new(|_| Ok(RawResponse::new(204, ""))));
    let client = client_with(&transport);

    let unit = client.delete::<()>("/profiles/1", opts()).await.unwrap();
    assert_eq!(unit.status, 204);
    assert_eq!(unit.status_text, "No Content");
    assert!(unit.ok);

    let value = client.delete::<Value>("/profiles/1", opts()).await.unwrap();
    assert_eq!(value.data, Value::Null);

    let optional = client.delete::<Option<Value>>("/profiles/1", opts()).await.unwrap();
    assert_eq!(optional.data, None);
}

// ---------------------------------------------------------------------------
// Status handling
// ---------------------------------------------------------------------------

#[tokio::test]
async fn status_boundaries() {
    for (status, ok) in [(199u16, false), (200, true), (299, true), (300, false)] {
        let transport = Arc::new(Scripted::json(status, json!({})));
        let client = client_with(&transport);
        let result = client.get::<Value>("/s", opts()).await;
        match result {
            Ok(resp) => {
                assert!(ok, "status {status} should fail");
                assert_eq!(resp.status, status);
            }
            Err(err) => {
                assert!(!ok, "status {status} should succeed");
                assert_eq!(err.kind, ErrorKind::HttpStatus);
                assert_eq!(err.status, Some(status));
            }
        }
    }
}

#[tokio::test]
async fn http_status_error_carries_body_and_message() {
    let transport = Arc::new(Scripted::json(422, json!({"message": "display name must be 1-32 characters"})));
    let client = client_with(&transport);

    let err = client
        .patch::<Value>("/profiles/1", Some(json!({"display_name": ""}).into()), opts())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::HttpStatus);
    assert_eq!(err.status_text.as_deref(), Some("Unprocessable Entity"));
    assert_eq!(err.message, "display name must be 1-32 characters");
    assert_eq!(
        err.data,
        Some(Payload::Json(json!({"message": "display name must be 1-32 characters"})))
    );
}

#[tokio::test]
async fn response_middleware_can_turn_failure_into_success() {
    let transport = Arc::new(Scripted::json(404, json!({})));
    let client = client_with(&transport);
    client.use_response(response_fn("soft-404", |mut resp: RawResponse, _req| {
        Box::pin(async move {
            if resp.status == 404 {
                resp.status = 200;
                resp.body = bytes::Bytes::from_static(b"[]");
            }
            Ok(resp)
        })
    }));

    let resp = client.get::<Vec<Value>>("/profiles", opts()).await.unwrap();
    assert!(resp.data.is_empty());
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

#[tokio::test]
async fn already_normalized_error_is_not_wrapped_again() {
    let transport = Arc::new(Scripted::json(200, json!({})));
    let client = client_with(&transport);
    client.use_response(response_fn("reject", |_resp, _req| {
        Box::pin(async {
            Err(BoxError::from(
                ApiError::new(ErrorKind::HttpStatus, "quota exceeded").with_status(429, "Too Many Requests"),
            ))
        })
    }));
    let passes = Arc::new(Mutex::new(Vec::new()));
    for _ in 0..2 {
        let passes = passes.clone();
        client.use_error(error_fn("identity", move |err: ApiError, _req| {
            passes.lock().push((err.kind, err.message.clone(), err.status, err.status_text.clone()));
            Box::pin(async move { Ok(err) })
        }));
    }

    let err = client.get::<Value>("/x", opts()).await.unwrap_err();

    let expected = (
        ErrorKind::HttpStatus,
        "quota exceeded".to_string(),
        Some(429),
        Some("Too Many Requests".to_string()),
    );
    assert_eq!(*passes.lock(), vec![expected.clone(), expected]);
    assert_eq!(err.message, "quota exceeded");
    assert!(err.cause.is_none());
}

#[tokio::test]
async fn failing_request_middleware_skips_transport() {
    let transport = Arc::new(Scripted::json(200, json!({})));
    let client = client_with(&transport);
    client.use_request(request_fn("token", |_req| {
        Box::pin(async { Err::<RequestDescriptor, BoxError>("token refresh failed".into()) })
    }));
    let count = Arc::new(AtomicUsize::new(0));
    client.use_error(counting_error_middleware(count.clone()));

    let err = client.get::<Value>("/x", opts()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Middleware);
    assert_eq!(err.message, "request middleware failed: token refresh failed");
    assert_eq!(transport.calls(), 0);
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn network_failure_is_normalized() {
    let transport = Arc::new(Scripted::new(|_| Err(TransportError::Connect("connection refused".to_string()))));
    let client = client_with(&transport);

    let err = client.get::<Value>("/x", opts()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Network);
    assert!(err.status.is_none());
    assert_eq!(err.message, "network error: connection failed: connection refused");
}

#[tokio::test]
async fn error_middleware_can_rewrite_for_display() {
    let transport = Arc::new(Scripted::new(|_| Err(TransportError::Request("reset".to_string()))));
    let client = client_with(&transport);
    client.use_error(error_fn("friendly", |err: ApiError, _req| {
        Box::pin(async move {
            let message = match err.kind {
                ErrorKind::Network => "You appear to be offline.",
                _ => "Something went wrong.",
            };
            Ok(ApiError { message: message.to_string(), cause: None, ..err })
        })
    }));

    let err = client.get::<Value>("/x", opts()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Network);
    assert_eq!(err.message, "You appear to be offline.");
    assert!(err.cause.is_none());
}

// ---------------------------------------------------------------------------
// Timeout and cancellation
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn timeout_wins_and_late_completion_is_never_observed() {
    let transport = Arc::new(Scripted::json(200, json!({})).delayed(5_000));
    let client = client_with(&transport);
    let count = Arc::new(AtomicUsize::new(0));
    client.use_error(counting_error_middleware(count.clone()));

    let err = client.get::<Value>("/slow", opts().timeout_ms(100)).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Timeout);
    assert_eq!(err.message, "request timed out after 100ms");

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(transport.completed.load(Ordering::SeqCst), 0);
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn client_default_timeout_applies() {
    let transport = Arc::new(Scripted::json(200, json!({})).delayed(20_000));
    let client = client_with(&transport);
    assert_eq!(client.default_timeout_ms(), 10_000);

    let err = client.get::<Value>("/slow", opts()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Timeout);
    assert_eq!(err.message, "request timed out after 10000ms");
}

#[tokio::test(start_paused = true)]
async fn fast_response_beats_timeout() {
    let transport = Arc::new(Scripted::json(200, json!({"fast": true})).delayed(10));
    let client = client_with(&transport);

    let resp = client.get::<Value>("/fast", opts().timeout_ms(1_000)).await.unwrap();
    assert_eq!(resp.data, json!({"fast": true}));
}

#[tokio::test(start_paused = true)]
async fn cancellation_resolves_as_cancelled_even_with_timeout_armed() {
    let transport = Arc::new(Scripted::json(200, json!({})).delayed(5_000));
    let client = client_with(&transport);
    let count = Arc::new(AtomicUsize::new(0));
    client.use_error(counting_error_middleware(count.clone()));

    let handle = CancelHandle::new();
    let call = {
        let client = client.clone();
        let options = opts().timeout_ms(200).cancel(handle.clone());
        tokio::spawn(async move { client.get::<Value>("/slow", options).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    handle.cancel();

    let err = call.await.unwrap().unwrap_err();
    assert_eq!(err.kind, ErrorKind::Cancelled);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert_eq!(transport.completed.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn pre_cancelled_handle_never_reaches_transport() {
    let transport = Arc::new(Scripted::json(200, json!({})));
    let client = client_with(&transport);
    let handle = CancelHandle::new();
    handle.cancel();

    let err = client.get::<Value>("/x", opts().cancel(handle)).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Cancelled);
    assert_eq!(transport.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn request_middleware_can_set_timeout() {
    let transport = Arc::new(Scripted::json(200, json!({})).delayed(1_000));
    let client = client_with(&transport);
    client.use_request(request_fn("tight", |req: RequestDescriptor| {
        Box::pin(async move { Ok(req.with_timeout_ms(Some(5))) })
    }));

    let err = client.get::<Value>("/x", opts()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Timeout);
}

// ---------------------------------------------------------------------------
// Registry snapshots and skipping
// ---------------------------------------------------------------------------

#[tokio::test]
async fn registration_during_a_call_applies_to_the_next_call_only() {
    let transport = Arc::new(Scripted::json(200, json!({})));
    let client = client_with(&transport);
    let registered = Arc::new(AtomicUsize::new(0));
    {
        let inner = client.clone();
        let registered = registered.clone();
        client.use_request(request_fn("registers", move |req: RequestDescriptor| {
            if registered.fetch_add(1, Ordering::SeqCst) == 0 {
                inner.use_request(BearerAuth::new("late"));
            }
            Box::pin(async move { Ok(req) })
        }));
    }

    client.get::<Value>("/first", opts()).await.unwrap();
    assert!(!transport.last().headers.contains("authorization"));

    client.get::<Value>("/second", opts()).await.unwrap();
    assert_eq!(transport.last().headers.get("authorization"), Some("Bearer late"));
}

#[tokio::test]
async fn removed_middleware_stops_running() {
    let transport = Arc::new(Scripted::json(200, json!({})));
    let client = client_with(&transport);
    let id = client.use_request(BearerAuth::new("X"));

    client.get::<Value>("/a", opts()).await.unwrap();
    assert!(transport.last().headers.contains("authorization"));

    assert!(client.remove_request(id));
    client.get::<Value>("/b", opts()).await.unwrap();
    assert!(!transport.last().headers.contains("authorization"));
}

#[tokio::test]
async fn skip_middlewares_bypasses_every_chain() {
    let transport = Arc::new(Scripted::json(500, json!({})));
    let client = client_with(&transport);
    client.use_request(BearerAuth::new("X"));
    let count = Arc::new(AtomicUsize::new(0));
    client.use_error(counting_error_middleware(count.clone()));

    let err = client.get::<Value>("/x", opts().skip_middlewares()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::HttpStatus);
    assert!(!transport.last().headers.contains("authorization"));
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn config_middlewares_and_default_headers_apply() {
    let transport = Arc::new(Scripted::json(200, json!({})));
    let config = ClientConfig::builder(format!("{PREFIX}/"))
        .default_header("Accept", "application/json")
        .request_middleware(BearerAuth::new("cfg"))
        .build()
        .unwrap();
    let client = ApiClient::with_transport(config, transport.clone());
    assert_eq!(client.middleware_counts(), (1, 0, 0));

    client
        .delete::<Value>("profiles/7", opts().header("accept", "*/*"))
        .await
        .unwrap();

    let wire = transport.last();
    assert_eq!(wire.method, HttpMethod::Delete);
    assert_eq!(wire.url, "https://api.example.com/profiles/7");
    assert_eq!(wire.headers.get("Accept"), Some("*/*"));
    assert_eq!(wire.headers.get("Authorization"), Some("Bearer cfg"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_calls_do_not_share_state() {
    let transport = Arc::new(Scripted::new(|req| {
        let body = json!({ "url": req.url });
        Ok(RawResponse::new(200, body.to_string()).with_header("Content-Type", "application/json"))
    }));
    let client = client_with(&transport);
    client.use_request(request_fn("echo-path", |req: RequestDescriptor| {
        Box::pin(async move {
            let path = req.url.trim_start_matches(PREFIX).to_string();
            Ok(req.with_header("X-Path", path))
        })
    }));

    let calls: Vec<_> = (0..16)
        .map(|i| {
            let client = client.clone();
            tokio::spawn(async move { client.get::<Value>(&format!("/item/{i}"), RequestOptions::new()).await })
        })
        .collect();

    for (i, call) in calls.into_iter().enumerate() {
        let resp = call.await.unwrap().unwrap();
        assert_eq!(resp.data["url"], format!("{PREFIX}/item/{i}"));
    }
    let seen = transport.seen.lock();
    assert_eq!(seen.len(), 16);
    for wire in seen.iter() {
        assert_eq!(Some(wire.url.trim_start_matches(PREFIX)), wire.headers.get("x-path"));
    }
}
