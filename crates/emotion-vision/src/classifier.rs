//! Emotion classification of preprocessed faces.
//!
//! The pretrained model is a small CNN trained on 48x48 grayscale faces,
//! exported to ONNX. It takes a `(1, 48, 48, 1)` float tensor and returns one
//! softmax score per [`Emotion`](emotion_models::Emotion).

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use emotion_models::EmotionPrediction;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::{Tensor, Value};
use tracing::{debug, info};

use crate::error::{VisionError, VisionResult};
use crate::preprocess::FaceTensor;

/// Scores a preprocessed face against the emotion categories.
pub trait EmotionClassifier: Send + Sync {
    /// Raw class scores, one per category in index order.
    fn scores(&self, face: &FaceTensor) -> VisionResult<Vec<f32>>;

    /// Highest-scoring category and its score.
    fn classify(&self, face: &FaceTensor) -> VisionResult<EmotionPrediction> {
        let scores = self.scores(face)?;
        EmotionPrediction::from_scores(&scores).map_err(|e| VisionError::inference(e.to_string()))
    }
}

/// Name and type of one model input or output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorInfo {
    pub name: String,
    pub value_type: String,
}

/// Inputs and outputs declared by a loaded model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelDescription {
    pub path: PathBuf,
    pub inputs: Vec<TensorInfo>,
    pub outputs: Vec<TensorInfo>,
}

impl fmt::Display for ModelDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Model: {}", self.path.display())?;
        writeln!(f, "Inputs:")?;
        for input in &self.inputs {
            writeln!(f, "  {}: {}", input.name, input.value_type)?;
        }
        writeln!(f, "Outputs:")?;
        for output in &self.outputs {
            writeln!(f, "  {}: {}", output.name, output.value_type)?;
        }
        Ok(())
    }
}

/// ONNX Runtime-backed emotion classifier.
pub struct OnnxEmotionClassifier {
    session: Mutex<Session>,
    output_name: String,
    description: ModelDescription,
}

impl OnnxEmotionClassifier {
    pub fn load(model_path: &Path) -> VisionResult<Self> {
        if !model_path.is_file() {
            return Err(VisionError::ModelNotFound(model_path.to_path_buf()));
        }

        let model_bytes = std::fs::read(model_path)
            .map_err(|e| VisionError::model_load(model_path, format!("ORT read model file: {e}")))?;

        let session = Session::builder()
            .map_err(|e| VisionError::model_load(model_path, format!("ORT session builder: {e}")))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| VisionError::model_load(model_path, format!("ORT opt level: {e}")))?
            .commit_from_memory(model_bytes.as_slice())
            .map_err(|e| VisionError::model_load(model_path, format!("ORT load model: {e}")))?;

        let description = ModelDescription {
            path: model_path.to_path_buf(),
            inputs: session
                .inputs
                .iter()
                .map(|input| TensorInfo {
                    name: input.name.clone(),
                    value_type: format!("{:?}", input.input_type),
                })
                .collect(),
            outputs: session
                .outputs
                .iter()
                .map(|output| TensorInfo {
                    name: output.name.clone(),
                    value_type: format!("{:?}", output.output_type),
                })
                .collect(),
        };

        let output_name = description
            .outputs
            .first()
            .map(|o| o.name.clone())
            .ok_or_else(|| VisionError::model_load(model_path, "model declares no outputs"))?;

        info!(
            "Emotion classifier loaded: inputs={}, outputs={}, model={}",
            description.inputs.len(),
            description.outputs.len(),
            model_path.display()
        );

        Ok(Self {
            session: Mutex::new(session),
            output_name,
            description,
        })
    }

    /// Declared inputs and outputs of the loaded model.
    pub fn describe(&self) -> &ModelDescription {
        &self.description
    }
}

/// Convert the NHWC face tensor into an ORT input value.
fn face_to_value(face: &FaceTensor) -> VisionResult<Value> {
    let shape = face.shape().to_vec();
    let data: Box<[f32]> = face.iter().copied().collect();

    Tensor::from_array((shape, data))
        .map(Value::from)
        .map_err(|e| VisionError::inference(format!("ORT tensor: {e}")))
}

impl EmotionClassifier for OnnxEmotionClassifier {
    fn scores(&self, face: &FaceTensor) -> VisionResult<Vec<f32>> {
        let tensor = face_to_value(face)?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| VisionError::inference("ORT session poisoned"))?;

        let outputs = session
            .run(ort::inputs![tensor])
            .map_err(|e| VisionError::inference(format!("ORT run failed: {e}")))?;

        let output = outputs
            .get(self.output_name.as_str())
            .ok_or_else(|| VisionError::inference("ORT returned no outputs"))?;

        // Expect (1, 7) or (7,); the prediction step validates the length.
        let (shape, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| VisionError::inference(format!("ORT extract: {e}")))?;

        debug!("Classifier output shape: {:?}", shape);

        Ok(data.to_vec())
    }
}
