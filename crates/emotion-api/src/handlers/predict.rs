//! Emotion prediction handlers.

use std::time::Instant;

use axum::body::Bytes;
use axum::extract::multipart::{Multipart, MultipartError, MultipartRejection};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use emotion_models::{FramePayload, PredictResponse};
use emotion_vision::decode_data_uri;
use tracing::{debug, info};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// Multipart field carrying the uploaded file.
pub const IMAGE_FIELD: &str = "image";

pub const NO_IMAGE_UPLOADED: &str = "No image uploaded";
pub const NO_IMAGE_DATA: &str = "No image data";
pub const INVALID_JSON_BODY: &str = "Invalid JSON body";

/// Classify every face in an uploaded image file.
///
/// POST /predict
pub async fn predict(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<PredictResponse>> {
    let Ok(mut multipart) = multipart else {
        return Err(ApiError::bad_request(NO_IMAGE_UPLOADED));
    };

    let bytes = read_image_field(&mut multipart)
        .await?
        .ok_or_else(|| ApiError::bad_request(NO_IMAGE_UPLOADED))?;

    run_pipeline(&state, "/predict", bytes).await
}

/// Classify every face in a base64 data URI frame.
///
/// POST /predict_frame
pub async fn predict_frame(
    State(state): State<AppState>,
    payload: Result<Json<FramePayload>, JsonRejection>,
) -> ApiResult<Json<PredictResponse>> {
    let Json(payload) = payload.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge
        } else {
            debug!("Rejected frame body: {}", rejection.body_text());
            ApiError::bad_request(INVALID_JSON_BODY)
        }
    })?;

    let uri = payload
        .image
        .ok_or_else(|| ApiError::bad_request(NO_IMAGE_DATA))?;

    let bytes = decode_data_uri(&uri)?;
    run_pipeline(&state, "/predict_frame", Bytes::from(bytes)).await
}

/// Return the contents of the first `image` field that carries a file.
async fn read_image_field(multipart: &mut Multipart) -> ApiResult<Option<Bytes>> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(IMAGE_FIELD) || field.file_name().is_none() {
            continue;
        }

        let bytes = field.bytes().await.map_err(multipart_error)?;
        return Ok(Some(bytes));
    }

    Ok(None)
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge
    } else {
        debug!("Unreadable multipart body: {}", err);
        ApiError::bad_request(NO_IMAGE_UPLOADED)
    }
}

/// Decode, detect and classify on the blocking pool.
async fn run_pipeline(
    state: &AppState,
    endpoint: &'static str,
    bytes: Bytes,
) -> ApiResult<Json<PredictResponse>> {
    let pipeline = state.pipeline.clone();
    let start = Instant::now();

    let results = tokio::task::spawn_blocking(move || pipeline.analyze_bytes(&bytes))
        .await
        .map_err(|e| ApiError::internal(format!("Inference task failed: {}", e)))??;

    let elapsed = start.elapsed();
    metrics::record_inference(endpoint, elapsed.as_secs_f64(), &results);

    info!(
        endpoint = endpoint,
        faces = results.len(),
        duration_ms = elapsed.as_millis() as u64,
        "Prediction complete"
    );

    Ok(Json(PredictResponse { results }))
}
