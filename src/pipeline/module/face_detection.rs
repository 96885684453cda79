use image::GrayImage;
use log::debug;
use serde::Serialize;
use thiserror::Error;

use crate::pipeline::model_config::config::{DetectionPreset, FaceDetectionConfig};

/// Face region within an image, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("model file not found: {0}")]
    ModelNotFound(String),
    #[error("failed to load detector model: {0}")]
    LoadFailed(String),
    #[error("detection failed: {0}")]
    DetectionFailed(String),
}

/// A multi-scale cascade face detector, shared read-only across requests.
pub trait CascadeDetector: Send + Sync {
    /// Short backend label reported by the health endpoint.
    fn name(&self) -> &'static str;

    /// Run one detection pass over an equalized greyscale image.
    fn detect_multi_scale(
        &self,
        gray: &GrayImage,
        preset: &DetectionPreset,
    ) -> Result<Vec<BoundingBox>, DetectorError>;
}

/// Ordered presets tried until one of them finds a face.
#[derive(Debug, Clone)]
pub struct DetectionPolicy {
    presets: Vec<DetectionPreset>,
}

impl DetectionPolicy {
    pub fn new(presets: Vec<DetectionPreset>) -> Self {
        DetectionPolicy { presets }
    }

    /// Returns the faces of the first non-empty pass, or an empty list once
    /// every preset has been tried. A detector error stops the run.
    pub fn run(
        &self,
        detector: &dyn CascadeDetector,
        gray: &GrayImage,
    ) -> Result<Vec<BoundingBox>, DetectorError> {
        for preset in &self.presets {
            let faces = detector.detect_multi_scale(gray, preset)?;
            debug!("{} pass detected {} faces", preset.name, faces.len());
            if !faces.is_empty() {
                return Ok(faces);
            }
        }
        Ok(Vec::new())
    }
}

impl Default for DetectionPolicy {
    fn default() -> Self {
        DetectionPolicy::new(FaceDetectionConfig::new().presets)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use super::*;

    /// Returns a fixed number of faces per preset name and records each pass.
    pub(crate) struct ScriptedDetector {
        pub faces_by_preset: Vec<(&'static str, usize)>,
        pub calls: Mutex<Vec<&'static str>>,
        pub fail: bool,
    }

    impl ScriptedDetector {
        pub fn new(faces_by_preset: Vec<(&'static str, usize)>) -> Self {
            ScriptedDetector { faces_by_preset, calls: Mutex::new(Vec::new()), fail: false }
        }

        pub fn failing() -> Self {
            ScriptedDetector { faces_by_preset: vec![], calls: Mutex::new(Vec::new()), fail: true }
        }
    }

    impl CascadeDetector for ScriptedDetector {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn detect_multi_scale(
            &self,
            _gray: &GrayImage,
            preset: &DetectionPreset,
        ) -> Result<Vec<BoundingBox>, DetectorError> {
            self.calls.lock().unwrap().push(preset.name);
            if self.fail {
                return Err(DetectorError::DetectionFailed("scripted failure".into()));
            }
            let count = self
                .faces_by_preset
                .iter()
                .find(|(name, _)| *name == preset.name)
                .map(|(_, count)| *count)
                .unwrap_or(0);
            Ok((0..count)
                .map(|i| BoundingBox { x: i as i32 * 10, y: 0, width: 10 + i as u32, height: 10 })
                .collect())
        }
    }

    fn gray() -> GrayImage {
        GrayImage::new(8, 8)
    }

    #[test]
    fn test_first_pass_hit_skips_fallback() {
        let detector = ScriptedDetector::new(vec![("sensitive", 2), ("conservative", 1)]);
        let faces = DetectionPolicy::default().run(&detector, &gray()).unwrap();
        assert_eq!(faces.len(), 2);
        assert_eq!(*detector.calls.lock().unwrap(), vec!["sensitive"]);
    }

    #[test]
    fn test_falls_back_to_conservative() {
        let detector = ScriptedDetector::new(vec![("conservative", 1)]);
        let faces = DetectionPolicy::default().run(&detector, &gray()).unwrap();
        assert_eq!(faces.len(), 1);
        assert_eq!(*detector.calls.lock().unwrap(), vec!["sensitive", "conservative"]);
    }

    #[test]
    fn test_exhausted_policy_is_empty() {
        let detector = ScriptedDetector::new(vec![]);
        let faces = DetectionPolicy::default().run(&detector, &gray()).unwrap();
        assert!(faces.is_empty());
        assert_eq!(detector.calls.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_error_stops_the_run() {
        let detector = ScriptedDetector::failing();
        assert!(DetectionPolicy::default().run(&detector, &gray()).is_err());
        assert_eq!(*detector.calls.lock().unwrap(), vec!["sensitive"]);
    }

    #[test]
    fn test_custom_presets() {
        let single = DetectionPreset { name: "single", scale_factor: 1.2, min_neighbors: 4, min_size: 30 };
        let policy = DetectionPolicy::new(vec![single]);
        let detector = ScriptedDetector::new(vec![("single", 3)]);
        assert_eq!(policy.run(&detector, &gray()).unwrap().len(), 3);
        assert_eq!(*detector.calls.lock().unwrap(), vec!["single"]);
    }
}
