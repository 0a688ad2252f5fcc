use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus exporter and register all application metrics.
/// Returns a `PrometheusHandle` whose `render()` method produces the
/// text/plain Prometheus scrape payload.
///
/// Only one recorder can exist per process; when one is already installed
/// the caller gets a detached handle backed by its own registry.
pub fn init_metrics() -> PrometheusHandle {
    let handle = match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => handle,
        Err(_) => PrometheusBuilder::new().build_recorder().handle(),
    };

    // Pre-register counters so they appear even before the first increment.
    counter!("poll_cycles_total").absolute(0);
    counter!("trades_fetched_total").absolute(0);
    counter!("mirrors_executed").absolute(0);
    counter!("mirrors_skipped").absolute(0);
    counter!("mirrors_failed").absolute(0);
    counter!("cursor_persist_failures").absolute(0);
    counter!("cursor_writes_superseded").absolute(0);
    counter!("heartbeats_sent").absolute(0);

    // Pre-register gauges at zero.
    gauge!("enabled_subscriptions").set(0.0);

    // Histogram is lazily created on first record; force creation.
    histogram!("sweep_duration_seconds").record(0.0);

    handle
}
