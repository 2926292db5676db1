//! Prometheus-backed comparison metrics.

use comparator::{ComparisonMetrics, Side};
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Install the global Prometheus recorder and return its render handle.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Forwards comparator events to the global `metrics` recorder.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrometheusMetrics;

impl ComparisonMetrics for PrometheusMetrics {
    fn record_embedding(&self, side: Side, latency: Duration, ok: bool) {
        histogram!(
            "semdiff_embedding_seconds",
            "side" => side.as_str(),
            "status" => if ok { "ok" } else { "error" }
        )
        .record(latency.as_secs_f64());
    }

    fn record_outcome(&self, outcome: &'static str) {
        counter!("semdiff_records_total", "outcome" => outcome).increment(1);
    }

    fn record_batch(&self, size: usize, latency: Duration) {
        counter!("semdiff_batches_total").increment(1);
        histogram!("semdiff_batch_records").record(size as f64);
        histogram!("semdiff_batch_seconds").record(latency.as_secs_f64());
    }
}
