// src/metrics.rs
use std::net::SocketAddr;

use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::OnceCell;

/// Describe every series once so it shows up on /metrics before first use.
pub fn ensure_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("feedwatch_poll_cycles_total", "Completed poll cycles.");
        describe_counter!(
            "feedwatch_items_fetched_total",
            "Items returned by feed sources."
        );
        describe_counter!(
            "feedwatch_fetch_errors_total",
            "Feed source fetch/parse failures."
        );
        describe_counter!(
            "feedwatch_matches_total",
            "Trigger matches, one per firing rule."
        );
        describe_counter!(
            "feedwatch_dispatched_total",
            "New records handed to the presenter."
        );
        describe_counter!(
            "feedwatch_duplicates_total",
            "Matches suppressed by the seen-set."
        );
        describe_counter!(
            "feedwatch_dispatch_errors_total",
            "Presenter hand-off failures."
        );
        describe_counter!(
            "feedwatch_displayed_total",
            "Records shown by the presenter."
        );
        describe_counter!(
            "feedwatch_display_errors_total",
            "Presenter display failures."
        );
        describe_gauge!("feedwatch_seen_ids", "Size of the seen-set.");
        describe_gauge!(
            "feedwatch_last_poll_ts",
            "Unix ts of the last completed poll."
        );
        describe_histogram!(
            "feedwatch_fetch_ms",
            "Per-source fetch time in milliseconds."
        );
        describe_histogram!("feedwatch_parse_ms", "RSS parse time in milliseconds.");
    });
}

/// Serve Prometheus exposition on `addr`. Must run inside a tokio runtime.
pub fn install_exporter(addr: SocketAddr) -> anyhow::Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("prometheus exporter on {addr}: {e}"))?;
    ensure_described();
    tracing::info!(%addr, "prometheus exporter listening");
    Ok(())
}
