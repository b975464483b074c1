//! Face detection and emotion classification.
//!
//! This crate provides:
//! - Image decoding from raw uploads and base64 data URIs
//! - OpenCV Haar cascade face detection
//! - 48x48 grayscale face preprocessing
//! - ONNX Runtime emotion classification
//! - A shared pipeline tying them together

pub mod classifier;
pub mod decode;
pub mod detector;
pub mod error;
pub mod model_paths;
pub mod pipeline;
pub mod preprocess;

pub use classifier::{EmotionClassifier, ModelDescription, OnnxEmotionClassifier, TensorInfo};
pub use decode::{decode_base64_payload, decode_data_uri, decode_image, split_data_uri};
#[cfg(feature = "opencv")]
pub use detector::HaarCascadeDetector;
pub use detector::{load_face_detector, FaceDetector, MIN_NEIGHBORS, SCALE_FACTOR};
pub use error::{VisionError, VisionResult};
pub use model_paths::{ModelPaths, CLASSIFIER_FILE, DETECTOR_FILE};
pub use pipeline::EmotionPipeline;
pub use preprocess::{crop_region, preprocess_face, to_grayscale, FaceTensor, FACE_SIZE};
