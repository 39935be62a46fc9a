//! Per-task operation latency metrics (spec §4.4, §6).
//!
//! `task_operation_duration_seconds{task_name,status}`: a Prometheus
//! histogram with 16 exponentially-spaced buckets starting at 1ms,
//! factor 2. The crate registers it but never installs an exporter —
//! that, like the rest of metrics *export*, stays with the (out of
//! scope) binary entry point.

// ACCEPTABLE: registry lock poisoning is unrecoverable.
#![allow(clippy::expect_used)]

use prometheus::{HistogramOpts, HistogramVec, Registry};

use crate::error::{DriverError, DriverResult};

const METRIC_NAME: &str = "task_operation_duration_seconds";
const METRIC_HELP: &str = "Latency of a single task operation, labeled by outcome status.";
const BUCKET_START_SECS: f64 = 0.001;
const BUCKET_FACTOR: f64 = 2.0;
const BUCKET_COUNT: usize = 16;

#[derive(Clone)]
pub struct TaskMetrics {
    histogram: HistogramVec,
}

impl TaskMetrics {
    /// Registers the histogram into `prometheus::default_registry()`.
    pub fn new() -> DriverResult<Self> {
        Self::with_registry(prometheus::default_registry())
    }

    /// Registers into a caller-supplied registry — used by tests so
    /// repeated registration across test cases doesn't collide in the
    /// process-global default registry.
    pub fn with_registry(registry: &Registry) -> DriverResult<Self> {
        let buckets = prometheus::exponential_buckets(BUCKET_START_SECS, BUCKET_FACTOR, BUCKET_COUNT)
            .map_err(|e| DriverError::Metrics(e.to_string()))?;
        let opts = HistogramOpts::new(METRIC_NAME, METRIC_HELP).buckets(buckets);
        let histogram = HistogramVec::new(opts, &["task_name", "status"])
            .map_err(|e| DriverError::Metrics(e.to_string()))?;
        registry
            .register(Box::new(histogram.clone()))
            .map_err(|e| DriverError::Metrics(e.to_string()))?;
        Ok(Self { histogram })
    }

    pub fn observe(&self, task_name: &str, status: &str, seconds: f64) {
        self.histogram
            .with_label_values(&[task_name, status])
            .observe(seconds);
    }
}
