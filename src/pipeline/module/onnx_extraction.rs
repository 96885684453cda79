use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use image::imageops::FilterType;
use image::RgbImage;
use log::{info, warn};
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;

use crate::config::settings::RecognitionModel;
use crate::pipeline::model_config::config::default_threshold;
use crate::pipeline::module::face_detection::{BoundingBox, CascadeDetector, DetectionPolicy};
use crate::pipeline::module::face_extraction::{RecognitionBackend, RecognitionError, Representation};
use crate::pipeline::processing::distance::DistanceMetric;
use crate::pipeline::utils::image::{crop, equalized_gray};

struct OnnxModel {
    session: Mutex<Session>,
    config: RecognitionModel,
}

/// Embeds faces with ONNX Runtime, one session per configured model.
pub struct OnnxFaceExtraction {
    models: HashMap<String, OnnxModel>,
    detector: Option<Arc<dyn CascadeDetector>>,
    policy: DetectionPolicy,
}

impl OnnxFaceExtraction {
    /// Loads every configured model. Models that fail to load are skipped;
    /// `None` when nothing could be loaded.
    pub fn load(
        configs: &[RecognitionModel],
        detector: Option<Arc<dyn CascadeDetector>>,
        policy: DetectionPolicy,
    ) -> Option<Self> {
        let mut models = HashMap::new();
        for config in configs {
            match load_session(&config.path) {
                Ok(session) => {
                    info!("loaded recognition model {} from {}", config.name, config.path);
                    models.insert(
                        config.name.clone(),
                        OnnxModel { session: Mutex::new(session), config: config.clone() },
                    );
                }
                Err(e) => warn!("skipping recognition model {}: {e}", config.name),
            }
        }

        if models.is_empty() {
            return None;
        }
        Some(OnnxFaceExtraction { models, detector, policy })
    }

    pub fn model_names(&self) -> Vec<&str> {
        self.models.keys().map(String::as_str).collect()
    }

    fn embed(&self, model: &OnnxModel, face: &RgbImage) -> Result<Vec<f32>, RecognitionError> {
        let input = preprocess(face, &model.config);

        let mut session = model
            .session
            .lock()
            .map_err(|_| RecognitionError::InferenceFailed("session lock poisoned".to_string()))?;
        let outputs = session.run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let (_, raw) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| RecognitionError::InferenceFailed(format!("embedding extraction: {e}")))?;

        Ok(raw.to_vec())
    }
}

fn load_session(model_path: &str) -> Result<Session, RecognitionError> {
    if !Path::new(model_path).exists() {
        return Err(RecognitionError::ModelNotFound(model_path.to_string()));
    }

    let session = Session::builder()?
        .with_intra_threads(2)?
        .commit_from_file(model_path)?;
    Ok(session)
}

/// Resize to the model's square input and normalize into NCHW or NHWC.
fn preprocess(face: &RgbImage, config: &RecognitionModel) -> Array4<f32> {
    let size = config.input_size;
    let resized = image::imageops::resize(face, size, size, FilterType::Triangle);
    let size = size as usize;

    let mut tensor = if config.channels_last {
        Array4::<f32>::zeros((1, size, size, 3))
    } else {
        Array4::<f32>::zeros((1, 3, size, size))
    };

    for (x, y, pixel) in resized.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        for c in 0..3 {
            let value = (pixel[c] as f32 - config.mean) / config.std;
            if config.channels_last {
                tensor[[0, y, x, c]] = value;
            } else {
                tensor[[0, c, y, x]] = value;
            }
        }
    }

    tensor
}

impl OnnxFaceExtraction {
    fn model(&self, model: &str) -> Result<&OnnxModel, RecognitionError> {
        self.models
            .get(model)
            .ok_or_else(|| RecognitionError::UnknownModel(model.to_string()))
    }

    /// Detected faces, largest first. Empty without a detector.
    fn face_regions(&self, image: &RgbImage) -> Result<Vec<BoundingBox>, RecognitionError> {
        let mut faces = match &self.detector {
            Some(detector) => self.policy.run(detector.as_ref(), &equalized_gray(image))?,
            None => Vec::new(),
        };
        faces.sort_by_key(|b| std::cmp::Reverse(b.area()));
        Ok(faces)
    }

    fn represent_region(
        &self,
        model: &OnnxModel,
        image: &RgbImage,
        face: Option<BoundingBox>,
    ) -> Result<Representation, RecognitionError> {
        let embedding = match &face {
            Some(face) => self.embed(model, &crop(image, face))?,
            None => self.embed(model, image)?,
        };
        Ok(Representation { embedding, facial_area: face })
    }
}

impl RecognitionBackend for OnnxFaceExtraction {
    fn represent(&self, image: &RgbImage, model: &str) -> Result<Vec<Representation>, RecognitionError> {
        let onnx_model = self.model(model)?;
        let faces = self.face_regions(image)?;

        if faces.is_empty() {
            return Ok(vec![self.represent_region(onnx_model, image, None)?]);
        }
        faces
            .into_iter()
            .map(|face| self.represent_region(onnx_model, image, Some(face)))
            .collect()
    }

    fn represent_first(&self, image: &RgbImage, model: &str) -> Result<Representation, RecognitionError> {
        let onnx_model = self.model(model)?;
        let largest = self.face_regions(image)?.into_iter().next();
        self.represent_region(onnx_model, image, largest)
    }

    fn threshold(&self, model: &str, metric: DistanceMetric) -> f32 {
        self.models
            .get(model)
            .and_then(|m| m.config.thresholds.get(metric.as_str()).copied())
            .unwrap_or_else(|| default_threshold(model, metric))
    }
}
