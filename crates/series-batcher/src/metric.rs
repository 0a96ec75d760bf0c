use chrono::{DateTime, Utc};
use serde::ser::Error as _;
use serde::{Serialize, Serializer};

/// A single sample. Serialized as `[unix_seconds, value]`, which is the shape
/// the series API expects instead of an object.
///
/// JSON has no NaN or infinity, so serializing a non-finite value fails.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DataPoint {
    timestamp: DateTime<Utc>,
    value: f32,
}

impl DataPoint {
    pub fn new(timestamp: DateTime<Utc>, value: f32) -> Self {
        Self { timestamp, value }
    }

    /// A point stamped with the current wall-clock time.
    pub fn now(value: f32) -> Self {
        Self::new(Utc::now(), value)
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn value(&self) -> f32 {
        self.value
    }
}

impl Serialize for DataPoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if !self.value.is_finite() {
            return Err(S::Error::custom(format_args!(
                "point value {} is not a finite number",
                self.value
            )));
        }
        (self.timestamp.timestamp(), self.value).serialize(serializer)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Gauge,
    Rate,
    Count,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metric {
    metric: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    points: Vec<DataPoint>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    kind: Option<MetricKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    host: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tags: Vec<String>,
}

impl Metric {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            metric: name.into(),
            points: Vec::new(),
            kind: None,
            host: None,
            tags: Vec::new(),
        }
    }

    pub fn point(mut self, timestamp: DateTime<Utc>, value: f32) -> Self {
        self.points.push(DataPoint::new(timestamp, value));
        self
    }

    pub fn points(mut self, points: impl IntoIterator<Item = DataPoint>) -> Self {
        self.points.extend(points);
        self
    }

    pub fn kind(mut self, kind: MetricKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.metric
    }

    pub fn data_points(&self) -> &[DataPoint] {
        &self.points
    }

    pub fn metric_kind(&self) -> Option<MetricKind> {
        self.kind
    }

    pub fn host_name(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Stamp `gauge` unless the caller chose a kind.
    pub(crate) fn with_default_kind(mut self) -> Self {
        self.kind.get_or_insert(MetricKind::Gauge);
        self
    }
}

/// Request body for one transmission. Borrows the batch so the worker can
/// clear and reuse its buffer afterwards.
#[derive(Debug, Serialize)]
pub struct Series<'a> {
    pub series: &'a [Metric],
}
