use crate::metric::Metric;

/// Fixed-capacity batch owned by the worker.
///
/// Storage is allocated once at `capacity` and reused across transmissions;
/// `clear` keeps the allocation.
#[derive(Debug)]
pub struct BatchBuffer {
    metrics: Vec<Metric>,
    capacity: usize,
}

impl BatchBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            metrics: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Append at the next free slot. Returns `true` if this append filled the buffer.
    ///
    /// Callers must transmit and `clear` once this returns `true`; pushing into
    /// a full buffer is a logic error.
    pub fn push(&mut self, metric: Metric) -> bool {
        debug_assert!(!self.is_full(), "push into a full batch buffer");
        self.metrics.push(metric);
        self.is_full()
    }

    pub fn as_slice(&self) -> &[Metric] {
        &self.metrics
    }

    pub fn clear(&mut self) {
        self.metrics.clear();
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.metrics.len() >= self.capacity
    }
}
