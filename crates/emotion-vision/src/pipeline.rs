//! Detect, crop, preprocess and classify every face in an image.

use std::sync::Arc;

use emotion_models::{FaceRegion, FaceResult};
use image::{DynamicImage, GrayImage};
use tracing::{debug, info};

use crate::classifier::{EmotionClassifier, OnnxEmotionClassifier};
use crate::decode::decode_image;
use crate::detector::{load_face_detector, FaceDetector};
use crate::error::VisionResult;
use crate::model_paths::ModelPaths;
use crate::preprocess::{crop_region, preprocess_face, to_grayscale};

/// The two pretrained models and the glue between them.
///
/// Built once at startup and shared read-only across requests.
#[derive(Clone)]
pub struct EmotionPipeline {
    detector: Arc<dyn FaceDetector>,
    classifier: Arc<dyn EmotionClassifier>,
}

impl EmotionPipeline {
    pub fn new(detector: Arc<dyn FaceDetector>, classifier: Arc<dyn EmotionClassifier>) -> Self {
        Self {
            detector,
            classifier,
        }
    }

    /// Load both artifacts from `paths`. Fails if either is missing or unreadable.
    pub fn load(paths: &ModelPaths) -> VisionResult<Self> {
        paths.verify()?;

        let detector = load_face_detector(&paths.detector)?;
        let classifier = OnnxEmotionClassifier::load(&paths.classifier)?;

        info!("Emotion pipeline ready (models from {})", paths.base_dir.display());

        Ok(Self::new(detector, Arc::new(classifier)))
    }

    /// Decode encoded image bytes and analyze them.
    pub fn analyze_bytes(&self, bytes: &[u8]) -> VisionResult<Vec<FaceResult>> {
        let image = decode_image(bytes)?;
        self.analyze(&image)
    }

    /// Classify every face found in `image`, in detector order.
    pub fn analyze(&self, image: &DynamicImage) -> VisionResult<Vec<FaceResult>> {
        let gray = to_grayscale(image);
        let regions = self.detector.detect(&gray)?;

        debug!(
            width = gray.width(),
            height = gray.height(),
            faces = regions.len(),
            "Face detection complete"
        );

        regions
            .into_iter()
            .map(|region| self.classify_region(&gray, region))
            .collect()
    }

    fn classify_region(&self, gray: &GrayImage, region: FaceRegion) -> VisionResult<FaceResult> {
        let face = crop_region(gray, region)?;
        let tensor = preprocess_face(&face)?;
        let prediction = self.classifier.classify(&tensor)?;

        debug!(
            emotion = %prediction.emotion,
            confidence = prediction.confidence,
            "Classified face at {:?}",
            region
        );

        Ok(FaceResult::new(region, prediction))
    }
}
