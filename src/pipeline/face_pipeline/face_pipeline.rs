use std::sync::Arc;

use image::RgbImage;
use log::{debug, error, info, warn};

use crate::config::settings::{Detector, DetectorBackend, Settings};
use crate::error::errors::Error;
use crate::pipeline::model_config::config::FaceDetectionConfig;
use crate::pipeline::module::face_detection::{CascadeDetector, DetectionPolicy};
use crate::pipeline::module::face_extraction::{EmbeddingVector, RecognitionBackend};
use crate::pipeline::module::onnx_extraction::OnnxFaceExtraction;
use crate::pipeline::module::rustface_detection::RustfaceDetection;
use crate::pipeline::processing::distance::DistanceMetric;
use crate::pipeline::utils::image::{decode_rgb, equalized_gray};

/// Decode → detect/embed/compare pipeline shared by every endpoint.
///
/// Backends are chosen once at construction and never change; a missing
/// backend is `None` and the matching operations report it as a server error.
#[derive(Clone)]
pub struct FacePipeline {
    detector: Option<Arc<dyn CascadeDetector>>,
    recognition: Option<Arc<dyn RecognitionBackend>>,
    policy: DetectionPolicy,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HealthResult {
    pub backend: &'static str,
    pub detector_available: bool,
    pub recognition_available: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectionResult {
    pub num_faces: usize,
}

#[derive(Debug, Clone)]
pub struct EmbeddingResult {
    pub embedding: EmbeddingVector,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct ComparisonResult {
    pub matched: bool,
    pub distance: f32,
    pub threshold: f32,
    pub model: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IdentificationResult {
    pub identity: Option<String>,
    pub distance: Option<f32>,
    pub model: String,
}

impl FacePipeline {
    pub fn new(
        detector: Option<Arc<dyn CascadeDetector>>,
        recognition: Option<Arc<dyn RecognitionBackend>>,
        policy: DetectionPolicy,
    ) -> Self {
        FacePipeline { detector, recognition, policy }
    }

    /// Build the backends named in `settings`. A backend that fails to load
    /// is logged and left out rather than aborting startup.
    pub fn from_settings(settings: &Settings) -> Self {
        let policy = DetectionPolicy::new(FaceDetectionConfig::new().presets);
        let detector = load_detector(&settings.detector);

        let recognition: Option<Arc<dyn RecognitionBackend>> = if settings.recognition.models.is_empty() {
            info!("no recognition models configured");
            None
        } else {
            match OnnxFaceExtraction::load(&settings.recognition.models, detector.clone(), policy.clone()) {
                Some(backend) => {
                    info!("recognition backend ready with models {:?}", backend.model_names());
                    Some(Arc::new(backend))
                }
                None => {
                    warn!("no recognition model could be loaded");
                    None
                }
            }
        };

        FacePipeline::new(detector, recognition, policy)
    }

    pub fn health(&self) -> HealthResult {
        HealthResult {
            backend: self.detector.as_ref().map(|d| d.name()).unwrap_or("none"),
            detector_available: self.detector.is_some(),
            recognition_available: self.recognition.is_some(),
        }
    }

    pub fn detect(&self, im_bytes: &[u8]) -> Result<DetectionResult, Error> {
        let image = decode(im_bytes)?;
        debug!("image dimensions: {:?}", image.dimensions());

        let detector = match &self.detector {
            Some(detector) => detector,
            None => return Err(Error::DetectorUnavailable),
        };

        let gray = equalized_gray(&image);
        drop(image);

        let faces = self.policy.run(detector.as_ref(), &gray)?;
        Ok(DetectionResult { num_faces: faces.len() })
    }

    pub fn embed(&self, im_bytes: &[u8], model: &str) -> Result<EmbeddingResult, Error> {
        let recognition = self.recognition.as_ref().ok_or(Error::BackendUnavailable)?;
        let image = decode(im_bytes)?;

        let first = recognition.represent_first(&image, model)?;
        debug!("embedding taken from face area {:?}", first.facial_area);

        Ok(EmbeddingResult {
            embedding: first.embedding,
            model: model.to_string(),
        })
    }

    pub fn verify(
        &self,
        im_bytes_a: &[u8],
        im_bytes_b: &[u8],
        model: &str,
        metric: DistanceMetric,
    ) -> Result<ComparisonResult, Error> {
        let recognition = self.recognition.as_ref().ok_or(Error::BackendUnavailable)?;
        let image_a = decode(im_bytes_a)?;
        let image_b = decode(im_bytes_b)?;

        let verification = recognition.verify(&image_a, &image_b, model, metric)?;

        Ok(ComparisonResult {
            matched: verification.verified,
            distance: verification.distance,
            threshold: verification.threshold,
            model: model.to_string(),
        })
    }

    /// Identification needs a gallery store; until one exists nothing is
    /// ever identified.
    pub fn identify(&self, model: &str) -> IdentificationResult {
        IdentificationResult {
            identity: None,
            distance: None,
            model: model.to_string(),
        }
    }
}

fn decode(im_bytes: &[u8]) -> Result<RgbImage, Error> {
    if im_bytes.is_empty() {
        return Err(Error::EmptyImage);
    }
    decode_rgb(im_bytes).map_err(Error::Decode)
}

fn load_detector(cfg: &Detector) -> Option<Arc<dyn CascadeDetector>> {
    let model_path = cfg.model_path.as_deref();

    let loaded: Result<Arc<dyn CascadeDetector>, String> = match cfg.backend {
        DetectorBackend::None => {
            info!("face detection disabled");
            return None;
        }
        DetectorBackend::Rustface => RustfaceDetection::load(model_path)
            .map(|d| Arc::new(d) as Arc<dyn CascadeDetector>)
            .map_err(|e| e.to_string()),
        #[cfg(feature = "opencv")]
        DetectorBackend::Opencv => match model_path {
            Some(path) => crate::pipeline::module::opencv_detection::OpencvDetection::load(path)
                .map(|d| Arc::new(d) as Arc<dyn CascadeDetector>)
                .map_err(|e| e.to_string()),
            None => Err("the opencv backend needs detector.model_path".to_string()),
        },
        #[cfg(not(feature = "opencv"))]
        DetectorBackend::Opencv => Err("built without the `opencv` feature".to_string()),
    };

    match loaded {
        Ok(detector) => {
            info!("face detector ready: {}", detector.name());
            Some(detector)
        }
        Err(e) => {
            error!("failed to load face detector: {e}");
            None
        }
    }
}
