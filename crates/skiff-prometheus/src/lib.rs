//! Prometheus metrics backend for skiff launches.
//!
//! [`PrometheusMetrics`] implements [`skiff_core::metrics::MetricsBackend`] and is injected
//! with [`skiff_core::Orchestrator::with_metrics`].
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use skiff_core::metrics::MetricsBackend;
//! use skiff_prometheus::PrometheusMetrics;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let metrics = PrometheusMetrics::new()?;
//! let handle: Arc<dyn MetricsBackend> = Arc::new(metrics.clone());
//! handle.record_launch_started("local");
//!
//! let text = metrics.encode_text()?;
//! assert!(text.contains("skiff_launches_started_total"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Metrics
//! - `skiff_launches_started_total{cluster}` - Counter
//! - `skiff_launches_completed_total{cluster, outcome}` - Counter
//! - `skiff_launch_duration_seconds{cluster}` - Histogram
//! - `skiff_bundles_total{bundle, cache}` - Counter
//!
//! No HTTP exposition is provided; callers push or print [`PrometheusMetrics::encode_text`].

mod backend;
pub use backend::PrometheusMetrics;

pub use prometheus::{Encoder, Registry, TextEncoder};
