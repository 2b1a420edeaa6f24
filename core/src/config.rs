//! Client configuration.

use std::sync::Arc;

use thiserror::Error;

use crate::headers::Headers;
use crate::middleware::{ErrorMiddleware, RequestMiddleware, ResponseMiddleware};

pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

pub const ENV_URL_PREFIX: &str = "API_URL_PREFIX";
pub const ENV_TIMEOUT_MS: &str = "API_TIMEOUT_MS";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("url prefix must not be empty")]
    EmptyUrlPrefix,

    #[error("default timeout must be positive")]
    ZeroTimeout,

    #[error("missing environment variable {0}")]
    MissingVar(&'static str),

    #[error("invalid value for {name}: {value}")]
    InvalidVar { name: &'static str, value: String },
}

/// Settings fixed at client construction. The middleware lists seed the
/// client's registry and can be changed on the client afterwards.
#[derive(Clone)]
pub struct ClientConfig {
    pub url_prefix: String,
    pub default_headers: Headers,
    pub default_timeout_ms: u64,
    pub request_middlewares: Vec<Arc<dyn RequestMiddleware>>,
    pub response_middlewares: Vec<Arc<dyn ResponseMiddleware>>,
    pub error_middlewares: Vec<Arc<dyn ErrorMiddleware>>,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("url_prefix", &self.url_prefix)
            .field("default_headers", &self.default_headers)
            .field("default_timeout_ms", &self.default_timeout_ms)
            .field("request_middlewares", &self.request_middlewares.len())
            .field("response_middlewares", &self.response_middlewares.len())
            .field("error_middlewares", &self.error_middlewares.len())
            .finish()
    }
}

impl ClientConfig {
    pub fn builder(url_prefix: impl Into<String>) -> ClientConfigBuilder {
        ClientConfigBuilder {
            config: ClientConfig {
                url_prefix: url_prefix.into(),
                default_headers: Headers::new(),
                default_timeout_ms: DEFAULT_TIMEOUT_MS,
                request_middlewares: Vec::new(),
                response_middlewares: Vec::new(),
                error_middlewares: Vec::new(),
            },
        }
    }

    /// Read `API_URL_PREFIX` and optional `API_TIMEOUT_MS` from the process
    /// environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like `from_env`, reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let prefix = lookup(ENV_URL_PREFIX).ok_or(ConfigError::MissingVar(ENV_URL_PREFIX))?;
        let mut builder = Self::builder(prefix);
        if let Some(raw) = lookup(ENV_TIMEOUT_MS) {
            let timeout = raw.trim().parse::<u64>().map_err(|_| ConfigError::InvalidVar {
                name: ENV_TIMEOUT_MS,
                value: raw.clone(),
            })?;
            builder = builder.default_timeout_ms(timeout);
        }
        builder.build()
    }
}

#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.default_headers.insert(name, value);
        self
    }

    pub fn default_headers(mut self, headers: &Headers) -> Self {
        self.config.default_headers.merge(headers);
        self
    }

    pub fn default_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.config.default_timeout_ms = timeout_ms;
        self
    }

    pub fn request_middleware(mut self, middleware: impl RequestMiddleware + 'static) -> Self {
        self.config.request_middlewares.push(Arc::new(middleware));
        self
    }

    pub fn response_middleware(mut self, middleware: impl ResponseMiddleware + 'static) -> Self {
        self.config.response_middlewares.push(Arc::new(middleware));
        self
    }

    pub fn error_middleware(mut self, middleware: impl ErrorMiddleware + 'static) -> Self {
        self.config.error_middlewares.push(Arc::new(middleware));
        self
    }

    /// Validate and finish. A trailing `/` on the prefix is stripped.
    pub fn build(mut self) -> Result<ClientConfig, ConfigError> {
        self.config.url_prefix = self.config.url_prefix.trim().trim_end_matches('/').to_string();
        if self.config.url_prefix.is_empty() {
            return Err(ConfigError::EmptyUrlPrefix);
        }
        if self.config.default_timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(self.config)
    }
}
