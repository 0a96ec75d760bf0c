use std::time::Duration;

use thiserror::Error;
use tokio::io::AsyncWrite;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::config::{Compression, Config, ConfigError, Outputs};
use crate::metric::Metric;
use crate::transport::{HttpTransport, Transport, TransportError};
use crate::worker::{FlushAck, Worker};

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to build HTTP transport: {0}")]
    Transport(#[from] TransportError),
}

/// Handle to the background worker.
///
/// `publish` and `flush` take `&self`, so one client can be shared across
/// tasks behind an `Arc`. `close` consumes it; call it exactly once, after
/// every other user is done.
#[derive(Debug)]
pub struct Client {
    intake_tx: mpsc::Sender<Metric>,
    flush_tx: mpsc::Sender<FlushAck>,
    cancel: CancellationToken,
    worker: JoinHandle<()>,
}

impl Client {
    pub fn builder(api_key: impl Into<String>) -> ClientBuilder {
        ClientBuilder::from_config(Config::new(api_key))
    }

    /// Client with default settings. Same requirements as [`ClientBuilder::build`].
    pub fn new(api_key: impl Into<String>) -> Result<Self, BuildError> {
        Self::builder(api_key).build()
    }

    fn spawn<T>(config: &Config, transport: T) -> Self
    where
        T: Transport + Send + 'static,
    {
        let (intake_tx, intake_rx) = mpsc::channel(config.queue_capacity);
        let (flush_tx, flush_rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();

        let worker = Worker::new(
            transport,
            config.buffer_size,
            config.flush_interval,
            intake_rx,
            flush_rx,
            cancel.clone(),
        );
        let worker = tokio::spawn(worker.run());
        debug!(?config, "series worker started");

        Self {
            intake_tx,
            flush_tx,
            cancel,
            worker,
        }
    }

    /// Queue a metric for the next batch, typed `gauge` unless set.
    ///
    /// Waits while the intake queue is full.
    pub async fn publish(&self, metric: Metric) {
        if self.intake_tx.send(metric.with_default_kind()).await.is_err() {
            warn!("series worker has stopped, dropping metric");
        }
    }

    /// Send everything published so far and wait until that is done.
    ///
    /// Returns once the worker has handed the batch to the transport, or has
    /// found nothing pending. Metrics published concurrently with this call
    /// may land in this flush or the next one.
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.flush_tx.send(ack_tx).await.is_err() {
            warn!("series worker has stopped, flush skipped");
            return;
        }
        if ack_rx.await.is_err() {
            warn!("series worker stopped before acknowledging flush");
        }
    }

    /// Flush, stop the worker, and wait for it to exit.
    pub async fn close(self) {
        self.flush().await;

        let Client {
            intake_tx,
            flush_tx,
            cancel,
            worker,
        } = self;
        cancel.cancel();
        if let Err(e) = worker.await {
            error!(error = %e, "series worker panicked");
        }
        // Senders outlive the worker so it never mistakes shutdown for a dropped handle.
        drop((intake_tx, flush_tx));
    }
}

/// Builder for a [`Client`], seeded with defaults for everything but the API key.
#[derive(Debug)]
pub struct ClientBuilder {
    config: Config,
    outputs: Outputs,
}

impl ClientBuilder {
    pub fn from_config(config: Config) -> Self {
        Self {
            config,
            outputs: Outputs::default(),
        }
    }

    /// Base series URL; the API key is added as a query parameter.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = endpoint.into();
        self
    }

    pub fn flush_interval(mut self, interval: Duration) -> Self {
        self.config.flush_interval = interval;
        self
    }

    pub fn buffer_size(mut self, size: usize) -> Self {
        self.config.buffer_size = size;
        self
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn compression(mut self, compression: Compression) -> Self {
        self.config.compression = compression;
        self
    }

    /// Receives the response body of every accepted transmission.
    pub fn output(mut self, w: impl AsyncWrite + Send + Unpin + 'static) -> Self {
        self.outputs.response = Box::new(w);
        self
    }

    /// Receives one line per failed transmission.
    pub fn error_output(mut self, w: impl AsyncWrite + Send + Unpin + 'static) -> Self {
        self.outputs.diagnostics = Box::new(w);
        self
    }

    /// Validate, build the HTTP transport, and start the worker.
    ///
    /// Must be called within a tokio runtime, after a rustls `CryptoProvider`
    /// has been installed for the process.
    pub fn build(self) -> Result<Client, BuildError> {
        let url = self.config.validate()?;
        let transport = HttpTransport::new(url, &self.config, self.outputs)?;
        Ok(Client::spawn(&self.config, transport))
    }

    /// Start the worker with a caller-supplied transport. Outputs set on the
    /// builder are unused; the transport owns its own reporting.
    pub fn build_with_transport<T>(self, transport: T) -> Result<Client, ConfigError>
    where
        T: Transport + Send + 'static,
    {
        self.config.validate()?;
        Ok(Client::spawn(&self.config, transport))
    }
}
