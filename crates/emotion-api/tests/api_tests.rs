//! API integration tests.

use std::io::Cursor;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use base64::Engine;
use emotion_api::{create_router, ApiConfig, AppState};
use emotion_models::{Emotion, FaceRegion};
use emotion_vision::{
    EmotionClassifier, EmotionPipeline, FaceDetector, FaceTensor, VisionError, VisionResult,
};
use image::{DynamicImage, GrayImage, ImageOutputFormat, Rgb, RgbImage};
use serde_json::{json, Value};
use tower::ServiceExt;

const BOUNDARY: &str = "emotion-test-boundary";

/// Reports the same regions for every frame.
struct FixedDetector(Vec<FaceRegion>);

impl FaceDetector for FixedDetector {
    fn detect(&self, _gray: &GrayImage) -> VisionResult<Vec<FaceRegion>> {
        Ok(self.0.clone())
    }
}

/// Always favours "Happy".
struct HappyClassifier;

impl EmotionClassifier for HappyClassifier {
    fn scores(&self, _face: &FaceTensor) -> VisionResult<Vec<f32>> {
        Ok(vec![0.02, 0.01, 0.05, 0.8, 0.04, 0.03, 0.05])
    }
}

struct FailingClassifier;

impl EmotionClassifier for FailingClassifier {
    fn scores(&self, _face: &FaceTensor) -> VisionResult<Vec<f32>> {
        Err(VisionError::inference("session run failed"))
    }
}

fn test_router_with(
    config: ApiConfig,
    regions: Vec<FaceRegion>,
    classifier: Arc<dyn EmotionClassifier>,
) -> Router {
    let pipeline = EmotionPipeline::new(Arc::new(FixedDetector(regions)), classifier);
    create_router(AppState::with_pipeline(config, pipeline), None)
}

fn test_router(regions: Vec<FaceRegion>) -> Router {
    test_router_with(ApiConfig::default(), regions, Arc::new(HappyClassifier))
}

fn two_faces() -> Vec<FaceRegion> {
    vec![
        FaceRegion::new(10, 20, 48, 48),
        FaceRegion::new(100, 30, 60, 60),
    ]
}

fn png_bytes() -> Vec<u8> {
    let image = RgbImage::from_fn(200, 120, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 128]));
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image)
        .write_to(&mut buf, ImageOutputFormat::Png)
        .unwrap();
    buf.into_inner()
}

fn data_uri(bytes: &[u8]) -> String {
    format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

/// Build a multipart body from `(field name, file name, contents)` parts.
fn multipart_body(parts: &[(&str, Option<&str>, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, file_name, contents) in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match file_name {
            Some(file_name) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
            }
            None => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
            }
        }
        body.extend_from_slice(contents);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn predict_request(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/predict")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn frame_request(body: String) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/predict_frame")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

/// Test health endpoints.
#[tokio::test]
async fn test_health_endpoint() {
    for uri in ["/health", "/healthz"] {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let (status, body) = send(test_router(vec![]), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert!(body["version"].is_string());
    }
}

/// Metrics are not routed when no recorder handle is given.
#[tokio::test]
async fn test_metrics_endpoint_disabled() {
    let request = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
    let response = test_router(vec![]).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_predict_returns_one_result_per_face() {
    let body = multipart_body(&[("image", Some("photo.png"), png_bytes().as_slice())]);
    let (status, body) = send(test_router(two_faces()), predict_request(body)).await;

    assert_eq!(status, StatusCode::OK);
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);

    assert_eq!(results[0]["box"], json!([10, 20, 48, 48]));
    assert_eq!(results[1]["box"], json!([100, 30, 60, 60]));
    for result in results {
        assert_eq!(result["emotion"], "Happy");
        let confidence = result["confidence"].as_f64().unwrap();
        assert!((confidence - 0.8).abs() < 1e-6);

        let label = result["emotion"].as_str().unwrap();
        assert!(label.parse::<Emotion>().is_ok());
    }
}

#[tokio::test]
async fn test_predict_without_faces_returns_empty_results() {
    let body = multipart_body(&[("image", Some("empty.png"), png_bytes().as_slice())]);
    let (status, body) = send(test_router(vec![]), predict_request(body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "results": [] }));
}

#[tokio::test]
async fn test_predict_missing_image_field() {
    let body = multipart_body(&[("photo", Some("photo.png"), png_bytes().as_slice())]);
    let (status, body) = send(test_router(two_faces()), predict_request(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "No image uploaded" }));
}

#[tokio::test]
async fn test_predict_image_field_without_file() {
    let body = multipart_body(&[("image", None, &b"not a file"[..])]);
    let (status, body) = send(test_router(two_faces()), predict_request(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "No image uploaded" }));
}

#[tokio::test]
async fn test_predict_non_multipart_body() {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/predict")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .unwrap();
    let (status, body) = send(test_router(two_faces()), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "No image uploaded" }));
}

#[tokio::test]
async fn test_predict_corrupt_image() {
    let body = multipart_body(&[("image", Some("broken.jpg"), &b"\xff\xd8 not really a jpeg"[..])]);
    let (status, body) = send(test_router(two_faces()), predict_request(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = body["error"].as_str().unwrap();
    assert!(message.starts_with("Invalid image data"));
}

#[tokio::test]
async fn test_predict_frame_returns_results() {
    let payload = json!({ "image": data_uri(&png_bytes()) }).to_string();
    let (status, body) = send(test_router(two_faces()), frame_request(payload)).await;

    assert_eq!(status, StatusCode::OK);
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["box"], json!([10, 20, 48, 48]));
}

#[tokio::test]
async fn test_predict_frame_accepts_line_wrapped_base64() {
    let png = png_bytes();
    let encoded = base64::engine::general_purpose::STANDARD.encode(&png);
    let wrapped = encoded
        .as_bytes()
        .chunks(76)
        .map(|line| std::str::from_utf8(line).unwrap())
        .collect::<Vec<_>>()
        .join("\r\n");
    let app = test_router(two_faces());

    let (status, wrapped_body) = send(
        app.clone(),
        frame_request(json!({ "image": format!("data:image/png;base64,{wrapped}") }).to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, plain_body) = send(app, frame_request(json!({ "image": data_uri(&png) }).to_string())).await;
    assert_eq!(wrapped_body, plain_body);
    assert_eq!(wrapped_body["results"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_predict_frame_missing_image_key() {
    for payload in [json!({}), json!({ "image": null }), json!({ "frame": "data:," })] {
        let (status, body) =
            send(test_router(two_faces()), frame_request(payload.to_string())).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "No image data" }));
    }
}

#[tokio::test]
async fn test_predict_frame_invalid_json() {
    let (status, body) =
        send(test_router(two_faces()), frame_request("{not json".to_string())).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Invalid JSON body" }));
}

#[tokio::test]
async fn test_predict_frame_malformed_data_uri() {
    let payload = json!({ "image": "no-comma-here" }).to_string();
    let (status, body) = send(test_router(two_faces()), frame_request(payload)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Malformed data URI"));
}

#[tokio::test]
async fn test_predict_frame_invalid_base64() {
    let payload = json!({ "image": "data:image/png;base64,@@@@" }).to_string();
    let (status, body) = send(test_router(two_faces()), frame_request(payload)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Invalid base64 payload"));
}

#[tokio::test]
async fn test_both_endpoints_agree() {
    let png = png_bytes();
    let app = test_router(two_faces());

    let (status_a, body_a) = send(
        app.clone(),
        predict_request(multipart_body(&[("image", Some("frame.png"), png.as_slice())])),
    )
    .await;
    let (status_b, body_b) = send(
        app,
        frame_request(json!({ "image": data_uri(&png) }).to_string()),
    )
    .await;

    assert_eq!(status_a, StatusCode::OK);
    assert_eq!(status_b, StatusCode::OK);
    assert_eq!(body_a, body_b);
}

#[tokio::test]
async fn test_repeated_requests_are_identical() {
    let app = test_router(two_faces());
    let payload = json!({ "image": data_uri(&png_bytes()) }).to_string();

    let (_, first) = send(app.clone(), frame_request(payload.clone())).await;
    let (_, second) = send(app, frame_request(payload)).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_classifier_failure_is_server_error() {
    let app = test_router_with(ApiConfig::default(), two_faces(), Arc::new(FailingClassifier));
    let payload = json!({ "image": data_uri(&png_bytes()) }).to_string();
    let (status, body) = send(app, frame_request(payload)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_cors_preflight_allows_any_origin() {
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/predict_frame")
        .header(header::ORIGIN, "http://localhost:3000")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();
    let response = test_router(vec![]).oneshot(request).await.unwrap();

    assert!(response.status().is_success());
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
}

#[tokio::test]
async fn test_request_id_and_security_headers() {
    let request = Request::builder()
        .uri("/health")
        .header("X-Request-ID", "req-1234")
        .body(Body::empty())
        .unwrap();
    let response = test_router(vec![]).oneshot(request).await.unwrap();

    assert_eq!(response.headers()["X-Request-ID"], "req-1234");
    assert_eq!(response.headers()["X-Content-Type-Options"], "nosniff");
    assert_eq!(response.headers()["X-Frame-Options"], "DENY");
}

#[tokio::test]
async fn test_body_limit() {
    let config = ApiConfig {
        max_body_size: 64,
        ..ApiConfig::default()
    };
    let app = test_router_with(config, vec![], Arc::new(HappyClassifier));
    let payload = json!({ "image": data_uri(&png_bytes()) }).to_string();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/predict_frame")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::CONTENT_LENGTH, payload.len())
        .body(Body::from(payload.clone()))
        .unwrap();
    let (status, body) = send(app.clone(), request).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body, json!({ "error": "Request body too large" }));

    // Without a Content-Length the limit trips while the body is read
    let (status, body) = send(app, frame_request(payload)).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body, json!({ "error": "Request body too large" }));
}

/// Test rate limiting.
#[tokio::test]
async fn test_rate_limiting() {
    let config = ApiConfig {
        rate_limit_rps: 1,
        ..ApiConfig::default()
    };
    let app = test_router_with(config, vec![], Arc::new(HappyClassifier));

    let mut statuses = Vec::new();
    for _ in 0..3 {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/predict_frame")
            .header(header::CONTENT_TYPE, "application/json")
            .header("X-Forwarded-For", "192.168.1.100")
            .body(Body::from("{}"))
            .unwrap();
        let (status, _) = send(app.clone(), request).await;
        statuses.push(status);
    }

    assert_eq!(statuses[0], StatusCode::BAD_REQUEST);
    assert!(statuses.contains(&StatusCode::TOO_MANY_REQUESTS));

    // Health checks are never rate limited
    let request = Request::builder()
        .uri("/health")
        .header("X-Forwarded-For", "192.168.1.100")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(app, request).await;
    assert_eq!(status, StatusCode::OK);
}
