//! Request and response bodies of the prediction endpoints.

use serde::{Deserialize, Serialize};

use crate::emotion::{Emotion, EmotionPrediction};
use crate::region::FaceRegion;

/// One detected face and its classification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceResult {
    pub emotion: Emotion,
    pub confidence: f32,
    #[serde(rename = "box")]
    pub region: FaceRegion,
}

impl FaceResult {
    pub fn new(region: FaceRegion, prediction: EmotionPrediction) -> Self {
        Self {
            emotion: prediction.emotion,
            confidence: prediction.confidence,
            region,
        }
    }
}

/// Successful response of `/predict` and `/predict_frame`.
///
/// `results` keeps detector order and is empty when no face was found.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictResponse {
    pub results: Vec<FaceResult>,
}

/// JSON body accepted by `/predict_frame`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FramePayload {
    /// Data URI such as `data:image/jpeg;base64,/9j/4AAQ...`.
    #[serde(default)]
    pub image: Option<String>,
}

/// Error body returned for every failed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
