use anyhow::{Context, Result};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub fn describe() {
    describe_gauge!(
        "moon_dashboard_build_info",
        "Build info for the Moon Week dashboard (value is always 1)."
    );
    describe_histogram!(
        "moon_query_latency_ms",
        "Wall-clock time of one store query, labelled by query and status."
    );
    describe_counter!(
        "moon_query_errors_total",
        "Store queries that failed, labelled by query."
    );
    describe_counter!(
        "moon_cache_requests_total",
        "Result cache lookups, labelled hit, miss or bypass."
    );
    describe_counter!("tracing_error_events", "ERROR-level tracing events.");
}

/// Install the global Prometheus recorder once and return a handle for `/metrics`.
///
/// Upkeep runs on each `/metrics` render.
pub fn init_global() -> Result<PrometheusHandle> {
    if let Some(handle) = PROM_HANDLE.get() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install Prometheus recorder")?;
    describe();
    ::metrics::gauge!("moon_dashboard_build_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);

    Ok(PROM_HANDLE.get_or_init(|| handle).clone())
}

/// Current exposition text.
pub fn render(handle: &PrometheusHandle) -> String {
    handle.run_upkeep();
    handle.render()
}
