//! Application state.

use std::sync::Arc;

use emotion_vision::{EmotionPipeline, ModelPaths, VisionError};
use tracing::info;

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub pipeline: Arc<EmotionPipeline>,
}

impl AppState {
    /// Resolve the model directory and load both models.
    pub fn new(config: ApiConfig) -> Result<Self, VisionError> {
        let paths = ModelPaths::resolve(config.model_dir.as_deref())?;
        info!(
            "Loading models: classifier={}, detector={}",
            paths.classifier.display(),
            paths.detector.display()
        );

        let pipeline = EmotionPipeline::load(&paths)?;
        Ok(Self::with_pipeline(config, pipeline))
    }

    /// Build state around an already constructed pipeline.
    pub fn with_pipeline(config: ApiConfig, pipeline: EmotionPipeline) -> Self {
        Self {
            config,
            pipeline: Arc::new(pipeline),
        }
    }
}
