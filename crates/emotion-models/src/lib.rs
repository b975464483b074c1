//! Shared data models for the emotion inference service.
//!
//! This crate provides Serde-serializable types for:
//! - Emotion categories and per-face predictions
//! - Face regions reported by the detector
//! - Request and response bodies of the HTTP API

pub mod emotion;
pub mod prediction;
pub mod region;

// Re-export common types
pub use emotion::{Emotion, EmotionParseError, EmotionPrediction, ScoresError};
pub use prediction::{ErrorBody, FaceResult, FramePayload, PredictResponse};
pub use region::FaceRegion;
