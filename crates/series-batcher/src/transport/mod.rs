use std::future::Future;
use std::io::Write;

use bytes::Bytes;
use flate2::write::GzEncoder;
use reqwest::Client;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::warn;
use url::Url;

use crate::config::{Compression, Config, Outputs, Sink};
use crate::metric::{Metric, Series};

/// Delivers one batch to the ingestion endpoint.
///
/// Only ever called by the worker, one batch at a time, never with an empty slice.
pub trait Transport {
    fn send(
        &mut self,
        batch: &[Metric],
    ) -> impl Future<Output = Result<(), TransportError>> + Send;
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("unable to marshal time series: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("gzip compression failed: {0}")]
    Compression(#[from] std::io::Error),

    #[error("unable to POST series: {0}")]
    Http(#[from] reqwest::Error),

    #[error("endpoint rejected series: {status}")]
    Rejected { status: reqwest::StatusCode },
}

pub struct HttpTransport {
    client: Client,
    url: Url,
    compression: Compression,
    response: Sink,
    diagnostics: Sink,
}

impl HttpTransport {
    /// `url` is the validated series URL, credential included.
    pub fn new(url: Url, config: &Config, outputs: Outputs) -> Result<Self, TransportError> {
        let client = Client::builder().timeout(config.request_timeout).build()?;

        Ok(Self {
            client,
            url,
            compression: config.compression,
            response: outputs.response,
            diagnostics: outputs.diagnostics,
        })
    }

    async fn post(&mut self, batch: &[Metric]) -> Result<(), TransportError> {
        let body = encode(batch, self.compression)?;

        let mut req = self
            .client
            .post(self.url.clone())
            .header("content-type", "application/json");

        if self.compression == Compression::Gzip {
            req = req.header("content-encoding", "gzip");
        }

        let resp = req.body(body).send().await?;
        let status = resp.status();
        let body = resp.bytes().await?;

        if status.is_success() {
            let forwarded = async {
                self.response.write_all(&body).await?;
                self.response.flush().await
            };
            if let Err(e) = forwarded.await {
                warn!(error = %e, "failed to forward response body");
            }
            Ok(())
        } else {
            let msg = format!(
                "series rejected: {status}: {}",
                String::from_utf8_lossy(&body)
            );
            self.report(&msg).await;
            Err(TransportError::Rejected { status })
        }
    }

    /// Write one diagnostic line to the error destination.
    async fn report(&mut self, msg: &str) {
        let written = async {
            self.diagnostics.write_all(msg.as_bytes()).await?;
            self.diagnostics.write_all(b"\n").await?;
            self.diagnostics.flush().await
        };
        if let Err(e) = written.await {
            warn!(error = %e, "failed to write diagnostic");
        }
    }
}

impl Transport for HttpTransport {
    async fn send(&mut self, batch: &[Metric]) -> Result<(), TransportError> {
        match self.post(batch).await {
            Err(e @ TransportError::Rejected { .. }) => Err(e),
            Err(e) => {
                self.report(&e.to_string()).await;
                Err(e)
            }
            Ok(()) => Ok(()),
        }
    }
}

fn encode(batch: &[Metric], compression: Compression) -> Result<Bytes, TransportError> {
    let json = serde_json::to_vec(&Series { series: batch })?;
    match compression {
        Compression::Gzip => Ok(Bytes::from(compress_gzip(&json)?)),
        Compression::None => Ok(Bytes::from(json)),
    }
}

fn compress_gzip(data: &[u8]) -> Result<Vec<u8>, std::io::Error> {
    let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::fast());
    encoder.write_all(data)?;
    encoder.finish()
}
