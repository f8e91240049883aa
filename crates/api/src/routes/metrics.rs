//! Prometheus scrape endpoint.

use axum::extract::State;
use axum::http::header::{CONTENT_TYPE, HeaderName};
use metrics_exporter_prometheus::PrometheusHandle;

const PROMETHEUS_TEXT: &str = "text/plain; version=0.0.4; charset=utf-8";

/// GET /metrics — lifecycle counters in the Prometheus text format.
pub async fn render(
    State(handle): State<PrometheusHandle>,
) -> ([(HeaderName, &'static str); 1], String) {
    ([(CONTENT_TYPE, PROMETHEUS_TEXT)], handle.render())
}
