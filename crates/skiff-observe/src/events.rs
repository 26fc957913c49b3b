//! Launch lifecycle events as structured logs.

use skiff_core::metrics::{LaunchOutcome, MetricsBackend, MetricsHandle};
use tracing::{debug, error, info, trace, warn};

/// [`MetricsBackend`] that logs every launch event, optionally forwarding to another backend.
#[derive(Default)]
pub struct LaunchEventLog {
    inner: Option<MetricsHandle>,
}

impl LaunchEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Logs, then forwards each event to `inner`.
    pub fn wrap(inner: MetricsHandle) -> Self {
        Self { inner: Some(inner) }
    }
}

impl MetricsBackend for LaunchEventLog {
    fn record_launch_started(&self, cluster: &str) {
        debug!(target: "skiff::events", cluster, "launch started");
        if let Some(inner) = &self.inner {
            inner.record_launch_started(cluster);
        }
    }

    fn record_launch_completed(&self, cluster: &str, outcome: LaunchOutcome, duration_ms: u64) {
        let result = outcome.as_label();
        match outcome {
            LaunchOutcome::Success => {
                info!(target: "skiff::events", cluster, result, duration_ms, "launch dispatched")
            }
            LaunchOutcome::Timeout => {
                warn!(target: "skiff::events", cluster, result, duration_ms, "launch deadline exceeded")
            }
            LaunchOutcome::Failure => {
                error!(target: "skiff::events", cluster, result, duration_ms, "launch failed")
            }
        }
        if let Some(inner) = &self.inner {
            inner.record_launch_completed(cluster, outcome, duration_ms);
        }
    }

    fn record_bundle(&self, bundle: &str, cache_hit: bool) {
        if cache_hit {
            trace!(target: "skiff::events", bundle, "bundle reused from cache");
        } else {
            debug!(target: "skiff::events", bundle, "bundle built");
        }
        if let Some(inner) = &self.inner {
            inner.record_bundle(bundle, cache_hit);
        }
    }
}
