use std::sync::Arc;

use prometheus::{
    CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
    proto::MetricFamily,
};

use skiff_core::metrics::{LaunchOutcome, MetricsBackend};

const NAMESPACE: &str = "skiff";

/// Prometheus metrics backend.
///
/// Label cardinality is bounded:
/// - `cluster`: configured cluster names
/// - `outcome`: "success", "failure", "timeout"
/// - `bundle`: bundle kind labels
/// - `cache`: "hit", "miss"
#[derive(Clone)]
pub struct PrometheusMetrics {
    launches_started: CounterVec,
    launches_completed: CounterVec,
    launch_duration: HistogramVec,
    bundles: CounterVec,
    registry: Arc<Registry>,
}

impl PrometheusMetrics {
    pub fn new_with_registry(registry: Arc<Registry>) -> Result<Self, prometheus::Error> {
        let launches_started = CounterVec::new(
            Opts::new("launches_started_total", "Launches begun").namespace(NAMESPACE),
            &["cluster"],
        )?;
        registry.register(Box::new(launches_started.clone()))?;

        let launches_completed = CounterVec::new(
            Opts::new("launches_completed_total", "Launches finished, by outcome")
                .namespace(NAMESPACE),
            &["cluster", "outcome"],
        )?;
        registry.register(Box::new(launches_completed.clone()))?;

        let launch_duration = HistogramVec::new(
            HistogramOpts::new(
                "launch_duration_seconds",
                "Time from launch start to dispatch or failure",
            )
            .namespace(NAMESPACE)
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
            &["cluster"],
        )?;
        registry.register(Box::new(launch_duration.clone()))?;

        let bundles = CounterVec::new(
            Opts::new("bundles_total", "Bundle lookups, by cache result").namespace(NAMESPACE),
            &["bundle", "cache"],
        )?;
        registry.register(Box::new(bundles.clone()))?;

        Ok(Self {
            launches_started,
            launches_completed,
            launch_duration,
            bundles,
            registry,
        })
    }

    pub fn new() -> Result<Self, prometheus::Error> {
        Self::new_with_registry(Arc::new(Registry::new()))
    }

    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    /// Renders all metrics in the Prometheus text exposition format.
    pub fn encode_text(&self) -> Result<String, prometheus::Error> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }
}

impl MetricsBackend for PrometheusMetrics {
    fn record_launch_started(&self, cluster: &str) {
        self.launches_started.with_label_values(&[cluster]).inc();
    }

    fn record_launch_completed(&self, cluster: &str, outcome: LaunchOutcome, duration_ms: u64) {
        self.launches_completed
            .with_label_values(&[cluster, outcome.as_label()])
            .inc();
        self.launch_duration
            .with_label_values(&[cluster])
            .observe(duration_ms as f64 / 1000.0);
    }

    fn record_bundle(&self, bundle: &str, cache_hit: bool) {
        let cache = if cache_hit { "hit" } else { "miss" };
        self.bundles.with_label_values(&[bundle, cache]).inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn family<'a>(families: &'a [MetricFamily], name: &str) -> &'a MetricFamily {
        families
            .iter()
            .find(|f| f.name() == name)
            .unwrap_or_else(|| panic!("metric {name} not found"))
    }

    #[test]
    fn started_is_labelled_by_cluster() {
        let metrics = PrometheusMetrics::new().unwrap();

        metrics.record_launch_started("yarn-a");
        metrics.record_launch_started("yarn-a");
        metrics.record_launch_started("local");

        let families = metrics.gather();
        let started = family(&families, "skiff_launches_started_total");
        assert_eq!(started.get_metric().len(), 2);
    }

    #[test]
    fn completion_records_outcome_and_duration() {
        let metrics = PrometheusMetrics::new().unwrap();

        metrics.record_launch_completed("local", LaunchOutcome::Success, 150);
        metrics.record_launch_completed("local", LaunchOutcome::Timeout, 60_000);

        let families = metrics.gather();
        assert_eq!(
            family(&families, "skiff_launches_completed_total")
                .get_metric()
                .len(),
            2
        );
        assert_eq!(
            family(&families, "skiff_launch_duration_seconds")
                .get_metric()
                .len(),
            1
        );
    }

    #[test]
    fn bundle_lookups_split_hits_and_misses() {
        let metrics = PrometheusMetrics::new().unwrap();

        metrics.record_bundle("application", false);
        metrics.record_bundle("application", true);
        metrics.record_bundle("application", true);

        let text = metrics.encode_text().unwrap();
        assert!(text.contains(r#"skiff_bundles_total{bundle="application",cache="hit"} 2"#));
        assert!(text.contains(r#"skiff_bundles_total{bundle="application",cache="miss"} 1"#));
    }

    #[test]
    fn shared_registry_rejects_duplicate_backends() {
        let registry = Arc::new(Registry::new());
        let _first = PrometheusMetrics::new_with_registry(registry.clone()).unwrap();
        assert!(PrometheusMetrics::new_with_registry(registry).is_err());
    }
}
