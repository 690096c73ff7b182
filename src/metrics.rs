use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus exporter and register all application metrics.
/// Returns a `PrometheusHandle` whose `render()` method produces the
/// text/plain Prometheus scrape payload.
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    // Pre-register counters so they appear even before the first increment.
    for name in [
        "maker_events_total",
        "mirror_results_total",
        "mirror_orders_succeeded",
        "mirror_orders_failed",
        "mirror_submit_retries",
        "capability_denials_total",
        "risk_denials_total",
        "risk_deactivations_total",
        "ingest_query_failures",
    ] {
        counter!(name).absolute(0);
    }

    // Pre-register gauges at zero.
    gauge!("tracked_positions").set(0.0);
    gauge!("tracked_buckets").set(0.0);
    gauge!("tracked_markets").set(0.0);

    // Histogram is lazily created on first record; force creation.
    histogram!("dispatch_latency_seconds").record(0.0);

    Ok(handle)
}
