use std::collections::HashMap;
use std::convert::Infallible;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder;
use tokio::io::AsyncWrite;
use tokio::net::TcpListener;

use crate::config::Config;
use crate::metric::Metric;
use crate::transport::{Transport, TransportError};

/// Records every batch it is handed. Clones share the same record.
#[derive(Clone, Default)]
pub struct RecordingTransport {
    sent: Arc<Mutex<Vec<Vec<Metric>>>>,
    delay: Option<Duration>,
    fail: bool,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleeps before recording, to make an in-flight transmission observable.
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    /// Records the batch, then reports a rejection.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn batches(&self) -> Vec<Vec<Metric>> {
        self.sent.lock().unwrap().clone()
    }

    pub fn batch_names(&self) -> Vec<Vec<String>> {
        self.batches()
            .iter()
            .map(|batch| batch.iter().map(|m| m.name().to_owned()).collect())
            .collect()
    }
}

impl Transport for RecordingTransport {
    async fn send(&mut self, batch: &[Metric]) -> Result<(), TransportError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.sent.lock().unwrap().push(batch.to_vec());
        if self.fail {
            return Err(TransportError::Rejected {
                status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            });
        }
        Ok(())
    }
}

/// In-memory `AsyncWrite` whose contents stay readable after it is boxed.
#[derive(Clone, Default)]
pub struct SharedSink(Arc<Mutex<Vec<u8>>>);

impl SharedSink {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl AsyncWrite for SharedSink {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

#[derive(Debug, Clone)]
pub struct CollectedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

/// Minimal HTTP endpoint standing in for the series API.
pub struct Collector {
    pub addr: SocketAddr,
    store: Arc<Mutex<Vec<CollectedRequest>>>,
}

impl Collector {
    /// Answer every request with `status` and `reply` as the body.
    pub async fn start(status: StatusCode, reply: &'static str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let store = Arc::new(Mutex::new(Vec::new()));
        let store_clone = Arc::clone(&store);

        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let store = Arc::clone(&store_clone);
                tokio::spawn(async move {
                    let service = service_fn(move |req| {
                        let store = Arc::clone(&store);
                        collect(req, store, status, reply)
                    });
                    let _ = Builder::new(TokioExecutor::new())
                        .serve_connection(TokioIo::new(stream), service)
                        .await;
                });
            }
        });

        Self { addr, store }
    }

    pub fn url(&self) -> String {
        format!("http://{}/api/v1/series", self.addr)
    }

    pub fn requests(&self) -> Vec<CollectedRequest> {
        self.store.lock().unwrap().clone()
    }
}

async fn collect<B>(
    req: Request<B>,
    store: Arc<Mutex<Vec<CollectedRequest>>>,
    status: StatusCode,
    reply: &'static str,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: hyper::body::Body<Data = Bytes> + Send + 'static,
{
    let method = req.method().to_string();
    let path = req.uri().path().to_owned();
    let query = req.uri().query().map(str::to_owned);
    let headers = req
        .headers()
        .iter()
        .filter_map(|(k, v)| Some((k.as_str().to_owned(), v.to_str().ok()?.to_owned())))
        .collect();
    let body = req
        .collect()
        .await
        .map(|c| c.to_bytes())
        .unwrap_or_default();

    store.lock().unwrap().push(CollectedRequest {
        method,
        path,
        query,
        headers,
        body,
    });

    Ok(Response::builder()
        .status(status)
        .body(Full::new(Bytes::from_static(reply.as_bytes())))
        .unwrap())
}

/// Bind to port 0 and return the OS-assigned port.
/// The listener is dropped, so nothing answers on it afterwards.
pub async fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .await
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

pub fn install_crypto() {
    let _ = rustls::crypto::ring::default_provider().install_default();
}

/// Config with a long flush interval so only explicit triggers fire.
pub fn quiet_config(buffer_size: usize) -> Config {
    let mut config = Config::new("test-key");
    config.buffer_size = buffer_size;
    config.flush_interval = Duration::from_secs(3600);
    config
}
