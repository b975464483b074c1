//! Prometheus metrics for the API server.

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use emotion_models::FaceResult;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "emotion_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "emotion_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "emotion_http_requests_in_flight";

    // Inference metrics
    pub const INFERENCE_DURATION_SECONDS: &str = "emotion_inference_duration_seconds";
    pub const FACES_DETECTED: &str = "emotion_faces_detected";
    pub const PREDICTIONS_TOTAL: &str = "emotion_predictions_total";

    // Rate limiting metrics
    pub const RATE_LIMIT_HITS_TOTAL: &str = "emotion_rate_limit_hits_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", normalize_path(path).to_string()),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record one completed pipeline run and the emotions it found.
pub fn record_inference(endpoint: &'static str, duration_secs: f64, results: &[FaceResult]) {
    histogram!(names::INFERENCE_DURATION_SECONDS, "endpoint" => endpoint).record(duration_secs);
    histogram!(names::FACES_DETECTED, "endpoint" => endpoint).record(results.len() as f64);

    for result in results {
        counter!(names::PREDICTIONS_TOTAL, "emotion" => result.emotion.as_str()).increment(1);
    }
}

/// Record rate limit hit.
pub fn record_rate_limit_hit(endpoint: &str) {
    let labels = [("endpoint", normalize_path(endpoint).to_string())];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

/// Collapse request paths onto the known routes so labels stay bounded.
fn normalize_path(path: &str) -> &'static str {
    match path.trim_end_matches('/') {
        "/predict" => "/predict",
        "/predict_frame" => "/predict_frame",
        "/health" => "/health",
        "/healthz" => "/healthz",
        "/metrics" => "/metrics",
        _ => "other",
    }
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    // Increment in-flight counter
    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    // Decrement in-flight counter
    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}
