use std::path::Path;
use std::sync::Mutex;

use image::GrayImage;
use log::info;
use opencv::core::{Mat, Rect, Size, Vector};
use opencv::objdetect::{CascadeClassifier, CascadeClassifierTrait, CascadeClassifierTraitConst};
use opencv::prelude::*;

use crate::pipeline::model_config::config::DetectionPreset;
use crate::pipeline::module::face_detection::{BoundingBox, CascadeDetector, DetectorError};

/// OpenCV Haar cascade, e.g. `haarcascade_frontalface_default.xml`.
pub struct OpencvDetection {
    classifier: Mutex<CascadeClassifier>,
}

impl OpencvDetection {
    pub fn load(cascade_path: &str) -> Result<Self, DetectorError> {
        if !Path::new(cascade_path).exists() {
            return Err(DetectorError::ModelNotFound(cascade_path.to_string()));
        }

        let classifier = match CascadeClassifier::new(cascade_path) {
            Ok(classifier) => classifier,
            Err(e) => return Err(DetectorError::LoadFailed(e.to_string())),
        };
        let empty = classifier
            .empty()
            .map_err(|e| DetectorError::LoadFailed(e.to_string()))?;
        if empty {
            return Err(DetectorError::LoadFailed(format!("empty cascade: {cascade_path}")));
        }
        info!("loaded Haar cascade from {cascade_path}");

        Ok(OpencvDetection { classifier: Mutex::new(classifier) })
    }
}

impl CascadeDetector for OpencvDetection {
    fn name(&self) -> &'static str {
        "opencv"
    }

    fn detect_multi_scale(
        &self,
        gray: &GrayImage,
        preset: &DetectionPreset,
    ) -> Result<Vec<BoundingBox>, DetectorError> {
        let (width, height) = gray.dimensions();
        let mat = Mat::new_rows_cols_with_data(height as i32, width as i32, gray.as_raw())
            .map_err(|e| DetectorError::DetectionFailed(e.to_string()))?;

        let mut faces: Vector<Rect> = Vector::new();
        let mut classifier = self
            .classifier
            .lock()
            .map_err(|_| DetectorError::DetectionFailed("cascade lock poisoned".to_string()))?;
        classifier
            .detect_multi_scale(
                &mat,
                &mut faces,
                preset.scale_factor,
                preset.min_neighbors as i32,
                0,
                Size::new(preset.min_size as i32, preset.min_size as i32),
                Size::new(0, 0),
            )
            .map_err(|e| DetectorError::DetectionFailed(e.to_string()))?;

        Ok(faces
            .iter()
            .map(|r| BoundingBox {
                x: r.x,
                y: r.y,
                width: r.width.max(0) as u32,
                height: r.height.max(0) as u32,
            })
            .collect())
    }
}
