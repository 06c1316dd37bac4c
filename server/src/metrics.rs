//! Prometheus metrics for the youth group server.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `youthgroup_http_requests_total{method, route, status}` - Requests served
//! - `youthgroup_degraded_fetches_total{store, operation}` - Secondary store
//!   reads that failed and were replaced by empty values
//! - `youthgroup_check_ins_total` - Successful check-ins
//! - `youthgroup_check_outs_total` - Successful check-outs
//! - `youthgroup_relational_writes_total{table}` - Committed relational writes
//!
//! ## Histograms
//! - `youthgroup_summary_duration_seconds` - Time to build a comprehensive
//!   event summary

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use thiserror::Error;

/// Errors from metrics setup.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(
        "youthgroup_http_requests_total",
        "Total number of HTTP requests by method, route and status"
    );
    describe_counter!(
        "youthgroup_degraded_fetches_total",
        "Secondary store reads that failed and degraded to empty values"
    );
    describe_counter!(
        "youthgroup_check_ins_total",
        "Total number of successful check-ins"
    );
    describe_counter!(
        "youthgroup_check_outs_total",
        "Total number of successful check-outs"
    );
    describe_counter!(
        "youthgroup_relational_writes_total",
        "Total number of committed relational writes by table"
    );
    describe_histogram!(
        "youthgroup_summary_duration_seconds",
        "Time taken to build a comprehensive event summary"
    );
}

/// Installs the global Prometheus recorder and describes every metric.
///
/// # Errors
///
/// Returns [`MetricsError`] if the exporter cannot be built or a recorder
/// is already installed.
pub fn install_recorder() -> Result<PrometheusHandle, MetricsError> {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0],
        )
        .map_err(|e| MetricsError::Build(e.to_string()))?
        .install_recorder()
        .map_err(|e| MetricsError::Install(e.to_string()))?;

    register_metrics();
    tracing::info!("Prometheus metrics recorder installed");
    Ok(handle)
}

/// Counts every request by method, matched route template and status.
///
/// Installed with `route_layer`, so the route label is always a template
/// and ids in raw paths never become label values.
pub async fn track_http_requests(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| "unmatched".to_string(), |path| path.as_str().to_string());

    let response = next.run(request).await;

    metrics::counter!(
        "youthgroup_http_requests_total",
        "method" => method,
        "route" => route,
        "status" => response.status().as_u16().to_string(),
    )
    .increment(1);

    response
}
