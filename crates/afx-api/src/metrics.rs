//! Prometheus metrics for the API server.

use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and return the handle that renders it.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "afx_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "afx_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "afx_http_requests_in_flight";

    // Job lifecycle
    pub const UPLOADS_TOTAL: &str = "afx_uploads_total";
    pub const UPLOAD_BYTES: &str = "afx_upload_bytes";
    pub const JOBS_ENQUEUED_TOTAL: &str = "afx_jobs_enqueued_total";
    pub const DOWNLOADS_TOTAL: &str = "afx_downloads_total";

    // Rate limiting
    pub const RATE_LIMIT_HITS_TOTAL: &str = "afx_rate_limit_hits_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

pub fn record_upload(size: usize) {
    counter!(names::UPLOADS_TOTAL).increment(1);
    histogram!(names::UPLOAD_BYTES).record(size as f64);
}

pub fn record_job_enqueued(function: &str) {
    let labels = [("function", function.to_string())];
    counter!(names::JOBS_ENQUEUED_TOTAL, &labels).increment(1);
}

/// `source` is `token` or `direct`.
pub fn record_download(source: &'static str) {
    counter!(names::DOWNLOADS_TOTAL, "source" => source).increment(1);
}

pub fn record_rate_limit_hit(endpoint: &str) {
    let labels = [("endpoint", sanitize_path(endpoint))];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

/// Collapse per-request ids so label cardinality stays bounded.
fn sanitize_path(path: &str) -> String {
    let head: Vec<&str> = path.split('/').take(2).collect();

    match head.as_slice() {
        ["", "status"] => "/status/:task_id".to_string(),
        ["", "temp-download"] => "/temp-download/:token".to_string(),
        ["", "download"] => "/download/:file_id".to_string(),
        _ => path.to_string(),
    }
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);
    let response = next.run(request).await;
    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    record_http_request(
        &method,
        &path,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );

    response
}
