//! Metrics collection for observability

use prometheus::{
    register_counter_vec_with_registry, register_counter_with_registry,
    register_histogram_vec_with_registry, register_histogram_with_registry, Counter, CounterVec,
    Encoder, Histogram, HistogramVec, Opts, Registry, TextEncoder,
};
use once_cell::sync::Lazy;
use std::sync::Arc;

/// Global metrics registry
pub static METRICS: Lazy<Arc<Metrics>> = Lazy::new(|| {
    Arc::new(Metrics::new().expect("Failed to initialize metrics"))
});

/// Metrics collector
pub struct Metrics {
    registry: Registry,

    // Planning metrics
    pub chunks_planned: Histogram,
    pub truncations: Counter,

    // Completion metrics
    pub completion_requests: CounterVec,
    pub completion_duration: HistogramVec,
    pub fragments_forwarded: Counter,
    pub malformed_events: Counter,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let registry = Registry::new();

        let chunks_planned = register_histogram_with_registry!(
            "docqa_chunks_planned",
            "Chunks produced per submission",
            vec![1.0, 2.0, 4.0, 8.0, 16.0, 32.0, 64.0],
            registry
        )?;

        let truncations = register_counter_with_registry!(
            Opts::new("docqa_truncations_total", "Submissions truncated to fit the budget"),
            registry
        )?;

        let completion_requests = register_counter_vec_with_registry!(
            Opts::new("docqa_completion_requests_total", "Completion requests by outcome"),
            &["outcome"],
            registry
        )?;

        let completion_duration = register_histogram_vec_with_registry!(
            "docqa_completion_duration_seconds",
            "Completion request duration in seconds, stream included",
            &["outcome"],
            registry
        )?;

        let fragments_forwarded = register_counter_with_registry!(
            Opts::new("docqa_fragments_forwarded_total", "Streamed fragments forwarded to sinks"),
            registry
        )?;

        let malformed_events = register_counter_with_registry!(
            Opts::new("docqa_malformed_events_total", "Stream lines skipped as malformed"),
            registry
        )?;

        Ok(Self {
            registry,
            chunks_planned,
            truncations,
            completion_requests,
            completion_duration,
            fragments_forwarded,
            malformed_events,
        })
    }

    /// Record a finished completion request
    pub fn record_completion(&self, outcome: &str, seconds: f64) {
        self.completion_requests.with_label_values(&[outcome]).inc();
        self.completion_duration
            .with_label_values(&[outcome])
            .observe(seconds);
    }

    /// Export metrics in Prometheus text format
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();

        let mut buffer = Vec::new();
        if encoder.encode(&metric_families, &mut buffer).is_err() {
            return String::new();
        }

        String::from_utf8(buffer).unwrap_or_default()
    }
}
