// Metrics hooks for the comparator.
//
// The engine reports to an injected `ComparisonMetrics` observer so it stays
// independent of any particular metrics backend.
use std::time::Duration;

use crate::types::Side;

/// Observer for comparison activity.
pub trait ComparisonMetrics: Send + Sync {
    /// One provider call finished. `ok` is false when it returned an error.
    fn record_embedding(&self, side: Side, latency: Duration, ok: bool);

    /// One record finished with `outcome`, either `"ok"` or a failure code.
    fn record_outcome(&self, outcome: &'static str);

    /// A whole batch finished.
    fn record_batch(&self, _size: usize, _latency: Duration) {}
}
