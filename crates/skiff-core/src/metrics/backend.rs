use std::sync::Arc;

/// Launch outcome for metrics classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchOutcome {
    /// The launcher accepted the request.
    Success,
    /// Preparation or dispatch failed.
    Failure,
    /// The launch deadline expired before dispatch.
    Timeout,
}

impl LaunchOutcome {
    /// Return label value for metrics.
    #[inline]
    pub fn as_label(&self) -> &'static str {
        match self {
            LaunchOutcome::Success => "success",
            LaunchOutcome::Failure => "failure",
            LaunchOutcome::Timeout => "timeout",
        }
    }
}

/// Backend metrics collection interface.
///
/// Implementations are injected into the orchestrator and shared by every launch it runs.
pub trait MetricsBackend: Send + Sync + 'static {
    /// Record the start of a launch.
    ///
    /// # Arguments
    /// - `cluster`: Target cluster name
    fn record_launch_started(&self, cluster: &str);
    /// Record launch completion with outcome and duration.
    ///
    /// # Arguments
    /// - `cluster`: Target cluster name
    /// - `outcome`: How the launch ended
    /// - `duration_ms`: Wall time from start to dispatch or failure
    fn record_launch_completed(&self, cluster: &str, outcome: LaunchOutcome, duration_ms: u64);
    /// Record one bundle lookup.
    ///
    /// # Arguments
    /// - `bundle`: Bundle kind label
    /// - `cache_hit`: `false` when the bundle was built by this lookup
    fn record_bundle(&self, bundle: &str, cache_hit: bool);
}

/// Shared handle to metrics backend.
pub type MetricsHandle = Arc<dyn MetricsBackend>;
