//! Face detection on grayscale frames.
//!
//! The production detector is OpenCV's Haar cascade classifier, run with the
//! fixed multi-scale parameters below. Keep them unchanged: detection results
//! (and therefore every downstream prediction) depend on them.
//!
//! # Requirements
//! - OpenCV 4.x with the objdetect module (feature `opencv`, on by default)
//! - `haarcascade_frontalface_default.xml` in the model directory

use std::path::Path;
use std::sync::Arc;

use emotion_models::FaceRegion;
use image::GrayImage;

use crate::error::VisionResult;

/// Image pyramid step between detection scales.
pub const SCALE_FACTOR: f64 = 1.1;

/// Overlapping candidate windows required to keep a detection.
pub const MIN_NEIGHBORS: i32 = 5;

/// Detects faces in a grayscale frame.
///
/// Implementations return regions in frame coordinates, in detector order.
/// An empty vector is a valid result.
pub trait FaceDetector: Send + Sync {
    fn detect(&self, gray: &GrayImage) -> VisionResult<Vec<FaceRegion>>;
}

/// Load the cascade detector from `path`.
pub fn load_face_detector(path: &Path) -> VisionResult<Arc<dyn FaceDetector>> {
    #[cfg(feature = "opencv")]
    {
        Ok(Arc::new(HaarCascadeDetector::load(path)?))
    }

    #[cfg(not(feature = "opencv"))]
    {
        Err(crate::error::VisionError::DetectorUnavailable(format!(
            "built without the `opencv` feature; cannot load {}",
            path.display()
        )))
    }
}

#[cfg(feature = "opencv")]
pub use haar::HaarCascadeDetector;

#[cfg(feature = "opencv")]
mod haar {
    use std::path::Path;
    use std::sync::Mutex;

    use emotion_models::FaceRegion;
    use image::GrayImage;
    use opencv::core::{Mat, Rect, Scalar, Size, Vector, CV_8UC1};
    use opencv::objdetect::CascadeClassifier;
    use opencv::prelude::*;
    use tracing::{debug, info};

    use super::{FaceDetector, MIN_NEIGHBORS, SCALE_FACTOR};
    use crate::error::{VisionError, VisionResult};

    /// OpenCV Haar cascade face detector.
    pub struct HaarCascadeDetector {
        /// `detect_multi_scale` needs `&mut`, so concurrent callers queue here.
        classifier: Mutex<CascadeClassifier>,
    }

    impl HaarCascadeDetector {
        pub fn load(path: &Path) -> VisionResult<Self> {
            if !path.is_file() {
                return Err(VisionError::ModelNotFound(path.to_path_buf()));
            }

            let path_str = path
                .to_str()
                .ok_or_else(|| VisionError::model_load(path, "path is not valid UTF-8"))?;

            let classifier = CascadeClassifier::new(path_str)
                .map_err(|e| VisionError::model_load(path, e.to_string()))?;

            // OpenCV reports a parse failure only through empty()
            let empty = classifier
                .empty()
                .map_err(|e| VisionError::model_load(path, e.to_string()))?;
            if empty {
                return Err(VisionError::model_load(path, "cascade file could not be parsed"));
            }

            info!(
                "Haar cascade loaded: scale_factor={}, min_neighbors={}, model={}",
                SCALE_FACTOR,
                MIN_NEIGHBORS,
                path.display()
            );

            Ok(Self {
                classifier: Mutex::new(classifier),
            })
        }
    }

    /// Copy an 8-bit grayscale image into a single-channel Mat.
    fn gray_to_mat(gray: &GrayImage) -> opencv::Result<Mat> {
        let mut mat = Mat::new_rows_cols_with_default(
            gray.height() as i32,
            gray.width() as i32,
            CV_8UC1,
            Scalar::all(0.0),
        )?;
        mat.data_bytes_mut()?.copy_from_slice(gray.as_raw());
        Ok(mat)
    }

    impl FaceDetector for HaarCascadeDetector {
        fn detect(&self, gray: &GrayImage) -> VisionResult<Vec<FaceRegion>> {
            if gray.width() == 0 || gray.height() == 0 {
                debug!("Empty frame provided to cascade detector");
                return Ok(Vec::new());
            }

            let mat = gray_to_mat(gray)
                .map_err(|e| VisionError::detection(format!("Mat conversion failed: {e}")))?;

            let mut faces = Vector::<Rect>::new();
            let mut classifier = self
                .classifier
                .lock()
                .map_err(|_| VisionError::detection("cascade classifier poisoned"))?;

            classifier
                .detect_multi_scale(
                    &mat,
                    &mut faces,
                    SCALE_FACTOR,
                    MIN_NEIGHBORS,
                    0,
                    Size::new(0, 0),
                    Size::new(0, 0),
                )
                .map_err(|e| VisionError::detection(e.to_string()))?;

            Ok(faces
                .iter()
                .map(|r| FaceRegion::from_signed(r.x, r.y, r.width, r.height))
                .collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VisionError;

    #[test]
    fn test_detector_parameters() {
        assert_eq!(SCALE_FACTOR, 1.1);
        assert_eq!(MIN_NEIGHBORS, 5);
    }

    #[test]
    fn test_missing_cascade_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_face_detector(&dir.path().join("missing.xml"));

        #[cfg(feature = "opencv")]
        assert!(matches!(result, Err(VisionError::ModelNotFound(_))));
        #[cfg(not(feature = "opencv"))]
        assert!(matches!(result, Err(VisionError::DetectorUnavailable(_))));
    }

    #[cfg(feature = "opencv")]
    #[test]
    fn test_unparseable_cascade_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.xml");
        std::fs::write(&path, "<opencv_storage></opencv_storage>").unwrap();

        assert!(matches!(
            load_face_detector(&path),
            Err(VisionError::ModelLoad { .. })
        ));
    }
}
