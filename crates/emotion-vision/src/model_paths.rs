//! Location of the pretrained model artifacts.
//!
//! Artifacts are found relative to the installed executable (or an explicit
//! model directory), never relative to the working directory.

use std::path::{Path, PathBuf};

use crate::error::{VisionError, VisionResult};

/// Emotion classifier, exported to ONNX.
pub const CLASSIFIER_FILE: &str = "emotion_model.onnx";

/// OpenCV frontal face Haar cascade.
pub const DETECTOR_FILE: &str = "haarcascade_frontalface_default.xml";

/// Default model directory, next to the executable.
pub const MODEL_SUBDIR: &str = "models";

/// Resolved paths of both model artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelPaths {
    pub base_dir: PathBuf,
    pub classifier: PathBuf,
    pub detector: PathBuf,
}

impl ModelPaths {
    /// Paths for artifacts stored directly in `dir`.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        let base_dir = dir.into();
        Self {
            classifier: base_dir.join(CLASSIFIER_FILE),
            detector: base_dir.join(DETECTOR_FILE),
            base_dir,
        }
    }

    /// Resolve the model directory once at startup.
    ///
    /// `model_dir` overrides the default `<exe dir>/models`. A relative
    /// override is taken relative to the executable's directory.
    pub fn resolve(model_dir: Option<&Path>) -> VisionResult<Self> {
        Ok(Self::in_dir(resolve_base_dir(&executable_dir()?, model_dir)))
    }

    /// Check that both artifacts exist.
    pub fn verify(&self) -> VisionResult<()> {
        for path in [&self.classifier, &self.detector] {
            if !path.is_file() {
                return Err(VisionError::ModelNotFound(path.clone()));
            }
        }
        Ok(())
    }
}

fn resolve_base_dir(exe_dir: &Path, model_dir: Option<&Path>) -> PathBuf {
    match model_dir {
        Some(dir) if dir.is_absolute() => dir.to_path_buf(),
        Some(dir) => exe_dir.join(dir),
        None => exe_dir.join(MODEL_SUBDIR),
    }
}

/// Directory containing the running executable.
fn executable_dir() -> VisionResult<PathBuf> {
    let exe = std::env::current_exe()?;
    let exe = exe.canonicalize().unwrap_or(exe);
    exe.parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| VisionError::internal(format!("executable has no parent: {}", exe.display())))
}
