use crate::metrics::backend::{LaunchOutcome, MetricsBackend};

/// No-op metrics backend that compiles to nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpMetrics;

impl MetricsBackend for NoOpMetrics {
    #[inline(always)]
    fn record_launch_started(&self, _: &str) {}

    #[inline(always)]
    fn record_launch_completed(&self, _: &str, _: LaunchOutcome, _: u64) {}

    #[inline(always)]
    fn record_bundle(&self, _: &str, _: bool) {}
}
