//! Batching client for the Datadog time-series API.
//!
//! A [`Client`] hands metrics to a single background worker. The worker
//! collects them into a batch and sends the batch in one request when any of
//! these happens: the batch is full, the flush interval passes without a
//! send, or a caller asks for a [`Client::flush`].
//!
//! ```no_run
//! use series_batcher::{Client, Metric};
//!
//! # async fn run() -> Result<(), series_batcher::BuildError> {
//! let _ = rustls::crypto::ring::default_provider().install_default();
//! let client = Client::builder("my-api-key")
//!     .output(tokio::io::stderr())
//!     .error_output(tokio::io::stderr())
//!     .build()?;
//!
//! client
//!     .publish(Metric::new("sampler.metric").point(chrono::Utc::now(), 12.34).tag("env:local"))
//!     .await;
//! client.close().await;
//! # Ok(())
//! # }
//! ```
//!
//! The HTTP transport uses rustls without a bundled crypto backend. Before
//! calling [`ClientBuilder::build`], install a process-level
//! [`CryptoProvider`](https://docs.rs/rustls/latest/rustls/crypto/struct.CryptoProvider.html),
//! for example `rustls::crypto::ring::default_provider().install_default()`.
//! Otherwise building the HTTP client fails or panics.
//!
//! Delivery is best effort. A batch whose transmission fails is reported and
//! then dropped. Nothing is retried.

mod buffers;
mod client;
mod config;
mod metric;
mod transport;
mod worker;

#[cfg(test)]
mod testing;

pub use client::{BuildError, Client, ClientBuilder};
pub use config::{
    Compression, Config, ConfigError, DEFAULT_BUFFER_SIZE, DEFAULT_ENDPOINT,
    DEFAULT_FLUSH_INTERVAL, DEFAULT_QUEUE_CAPACITY, DEFAULT_REQUEST_TIMEOUT, Outputs, Sink,
};
pub use metric::{DataPoint, Metric, MetricKind, Series};
pub use transport::{HttpTransport, Transport, TransportError};
