use std::fmt;
use std::ops::ControlFlow;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::buffers::BatchBuffer;
use crate::metric::Metric;
use crate::transport::Transport;

/// Acknowledged once the flush it was sent with has completed.
pub type FlushAck = oneshot::Sender<()>;

/// What caused a transmission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Capacity,
    Timer,
    Flush,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Capacity => write!(f, "capacity"),
            Trigger::Timer => write!(f, "timer"),
            Trigger::Flush => write!(f, "flush"),
        }
    }
}

/// Sole owner of the pending batch.
///
/// Everything else reaches it through the intake channel, the flush channel,
/// or the cancellation token. `run()` drives it until one of those says stop.
pub struct Worker<T: Transport> {
    transport: T,
    batch: BatchBuffer,
    flush_interval: Duration,
    intake_rx: mpsc::Receiver<Metric>,
    flush_rx: mpsc::Receiver<FlushAck>,
    cancel: CancellationToken,
}

impl<T: Transport> Worker<T> {
    pub fn new(
        transport: T,
        buffer_size: usize,
        flush_interval: Duration,
        intake_rx: mpsc::Receiver<Metric>,
        flush_rx: mpsc::Receiver<FlushAck>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            transport,
            batch: BatchBuffer::new(buffer_size),
            flush_interval,
            intake_rx,
            flush_rx,
            cancel,
        }
    }

    pub async fn run(mut self) {
        while let ControlFlow::Continue(()) = self.tick().await {}
    }

    /// Wait for exactly one event and handle it.
    ///
    /// The timer is created fresh on every call, so any transmission pushes
    /// the next timeout a full interval out. `select!` picks among ready
    /// branches at random, which keeps every source from being starved.
    async fn tick(&mut self) -> ControlFlow<()> {
        let timer = time::sleep(self.flush_interval);

        tokio::select! {
            _ = self.cancel.cancelled() => {
                if !self.batch.is_empty() {
                    warn!(count = self.batch.len(), "shutdown with unflushed metrics, discarding");
                }
                debug!("worker stopped");
                return ControlFlow::Break(());
            }
            received = self.intake_rx.recv() => {
                match received {
                    Some(metric) => self.accept(metric).await,
                    None => {
                        self.abandon("intake");
                        return ControlFlow::Break(());
                    }
                }
            }
            request = self.flush_rx.recv() => {
                match request {
                    Some(ack) => {
                        self.drain_intake().await;
                        self.transmit(Trigger::Flush).await;
                        // The caller may have given up waiting; nothing to do then.
                        let _ = ack.send(());
                    }
                    None => {
                        self.abandon("flush");
                        return ControlFlow::Break(());
                    }
                }
            }
            _ = timer => {
                self.transmit(Trigger::Timer).await;
            }
        }
        ControlFlow::Continue(())
    }

    async fn accept(&mut self, metric: Metric) {
        if self.batch.push(metric) {
            self.transmit(Trigger::Capacity).await;
        }
    }

    /// Pull in whatever was already queued when the flush arrived, so a flush
    /// covers every publish that completed before it. Bounded by the queue
    /// length at entry so concurrent publishers cannot stall the flush.
    async fn drain_intake(&mut self) {
        for _ in 0..self.intake_rx.len() {
            match self.intake_rx.try_recv() {
                Ok(metric) => self.accept(metric).await,
                Err(_) => break,
            }
        }
    }

    /// Hand the batch to the transport and clear it, whatever the outcome.
    async fn transmit(&mut self, trigger: Trigger) {
        if self.batch.is_empty() {
            return;
        }
        let count = self.batch.len();
        match self.transport.send(self.batch.as_slice()).await {
            Ok(()) => debug!(count, %trigger, "batch transmitted"),
            Err(e) => error!(error = %e, count, %trigger, "batch transmission failed, discarding"),
        }
        self.batch.clear();
    }

    fn abandon(&self, channel: &str) {
        warn!(
            channel,
            discarded = self.batch.len(),
            "client handle dropped without close, worker exiting"
        );
    }
}
