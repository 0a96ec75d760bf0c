use std::fmt;
use std::time::Duration;

use thiserror::Error;
use tokio::io::AsyncWrite;
use url::Url;

pub const DEFAULT_ENDPOINT: &str = "https://app.datadoghq.com/api/v1/series";
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_BUFFER_SIZE: usize = 256;
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Gzip,
    None,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("API key is required but empty")]
    ApiKeyMissing,

    #[error("endpoint is not a valid URL: {0}")]
    EndpointInvalidUrl(String),

    #[error("buffer size must be at least 1")]
    ZeroBufferSize,

    #[error("queue capacity must be at least 1")]
    ZeroQueueCapacity,

    #[error("flush interval must be greater than zero")]
    ZeroFlushInterval,
}

#[derive(Clone)]
pub struct Config {
    pub api_key: String,
    /// Base series URL. The API key is appended as a query parameter.
    pub endpoint: String,
    pub flush_interval: Duration,
    /// Metrics per batch; reaching it triggers a transmission.
    pub buffer_size: usize,
    /// Bound of the intake queue between callers and the worker.
    pub queue_capacity: usize,
    pub request_timeout: Duration,
    pub compression: Compression,
}

impl Config {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: DEFAULT_ENDPOINT.to_owned(),
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            buffer_size: DEFAULT_BUFFER_SIZE,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            compression: Compression::None,
        }
    }

    /// Check every field and return the series URL with the credential embedded.
    pub fn validate(&self) -> Result<Url, ConfigError> {
        if self.buffer_size == 0 {
            return Err(ConfigError::ZeroBufferSize);
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::ZeroQueueCapacity);
        }
        if self.flush_interval.is_zero() {
            return Err(ConfigError::ZeroFlushInterval);
        }
        self.series_url()
    }

    fn series_url(&self) -> Result<Url, ConfigError> {
        if self.api_key.is_empty() {
            return Err(ConfigError::ApiKeyMissing);
        }
        let mut url = Url::parse(&self.endpoint)
            .map_err(|_| ConfigError::EndpointInvalidUrl(self.endpoint.clone()))?;
        if url.cannot_be_a_base() {
            return Err(ConfigError::EndpointInvalidUrl(self.endpoint.clone()));
        }
        url.query_pairs_mut().append_pair("api_key", &self.api_key);
        Ok(url)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .field("flush_interval", &self.flush_interval)
            .field("buffer_size", &self.buffer_size)
            .field("queue_capacity", &self.queue_capacity)
            .field("request_timeout", &self.request_timeout)
            .field("compression", &self.compression)
            .finish()
    }
}

pub type Sink = Box<dyn AsyncWrite + Send + Unpin>;

/// Where response bodies and failure diagnostics go. Both discard by default.
pub struct Outputs {
    pub response: Sink,
    pub diagnostics: Sink,
}

impl Default for Outputs {
    fn default() -> Self {
        Self {
            response: Box::new(tokio::io::sink()),
            diagnostics: Box::new(tokio::io::sink()),
        }
    }
}

impl fmt::Debug for Outputs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Outputs").finish_non_exhaustive()
    }
}
