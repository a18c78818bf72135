//! Prometheus metrics exposed on `/metrics`.

use axum::response::IntoResponse;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Installs the global Prometheus recorder. Call once at startup.
pub fn init_metrics() -> PrometheusHandle {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");
    HANDLE.set(handle.clone()).ok();
    handle
}

pub async fn metrics_handler() -> impl IntoResponse {
    match HANDLE.get() {
        Some(handle) => handle.render(),
        None => String::new(),
    }
}

pub fn record_tick_duration(domain: &'static str, millis: i64) {
    metrics::histogram!("kindred_engine_tick_duration_ms", "domain" => domain).record(millis as f64);
}

pub fn record_matches_created(count: usize) {
    metrics::counter!("kindred_matches_created_total").increment(count as u64);
}

pub fn record_tick_skipped(reason: &'static str) {
    metrics::counter!("kindred_tick_skipped_total", "reason" => reason).increment(1);
}
