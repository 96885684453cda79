use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use image::GrayImage;
use log::info;

use crate::pipeline::model_config::config::DetectionPreset;
use crate::pipeline::module::face_detection::{BoundingBox, CascadeDetector, DetectorError};

// SeetaFace rejects smaller windows.
const RUSTFACE_MIN_FACE_SIZE: u32 = 20;
// Accepted range of the rustface image pyramid step.
const MIN_PYRAMID_SCALE: f32 = 0.01;
const MAX_PYRAMID_SCALE: f32 = 0.99;

#[cfg(bundled_seeta_model)]
static BUNDLED_MODEL: &[u8] =
    include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/model/seeta_fd_frontal_v1.0.bin"));

/// Cascade detector backed by the `rustface` crate (SeetaFace funnel cascade).
///
/// Preset mapping: `min_size` is the minimum face size, `scale_factor` becomes
/// the pyramid step `1 / scale_factor`, and `min_neighbors` is used as the
/// classifier score threshold, so a higher value is stricter in both engines.
pub struct RustfaceDetection {
    model: rustface::Model,
}

/// rustface settings for one pass over an image of known size.
#[derive(Debug, Clone, PartialEq)]
struct ScanParams {
    min_face_size: u32,
    score_thresh: f64,
    pyramid_scale: f32,
}

impl RustfaceDetection {
    /// Reads the model at `model_path`, or the model compiled into the
    /// binary when no path is configured.
    pub fn load(model_path: Option<&str>) -> Result<Self, DetectorError> {
        match model_path {
            Some(path) => Self::from_file(path),
            None => Self::bundled(),
        }
    }

    pub fn from_file(model_path: &str) -> Result<Self, DetectorError> {
        if !Path::new(model_path).exists() {
            return Err(DetectorError::ModelNotFound(model_path.to_string()));
        }

        let file = match File::open(model_path) {
            Ok(file) => file,
            Err(e) => return Err(DetectorError::LoadFailed(e.to_string())),
        };
        let detection = Self::read(BufReader::new(file))?;
        info!("loaded SeetaFace cascade from {model_path}");

        Ok(detection)
    }

    #[cfg(bundled_seeta_model)]
    pub fn bundled() -> Result<Self, DetectorError> {
        let detection = Self::read(std::io::Cursor::new(BUNDLED_MODEL))?;
        info!("loaded bundled SeetaFace cascade");
        Ok(detection)
    }

    #[cfg(not(bundled_seeta_model))]
    pub fn bundled() -> Result<Self, DetectorError> {
        Err(DetectorError::ModelNotFound(
            "no bundled SeetaFace model, set detector.model_path".to_string(),
        ))
    }

    fn read<R: Read>(reader: R) -> Result<Self, DetectorError> {
        match rustface::read_model(reader) {
            Ok(model) => Ok(RustfaceDetection { model }),
            Err(e) => Err(DetectorError::LoadFailed(e.to_string())),
        }
    }
}

/// Maps a preset onto rustface settings. `None` means the image is smaller
/// than the minimum face and cannot contain one.
fn scan_params(preset: &DetectionPreset, width: u32, height: u32) -> Result<Option<ScanParams>, DetectorError> {
    if preset.min_neighbors == 0 {
        return Err(DetectorError::DetectionFailed(format!(
            "{} preset: min_neighbors must be at least 1",
            preset.name
        )));
    }

    let pyramid_scale = (1.0 / preset.scale_factor) as f32;
    if !preset.scale_factor.is_finite() || !(MIN_PYRAMID_SCALE..=MAX_PYRAMID_SCALE).contains(&pyramid_scale) {
        return Err(DetectorError::DetectionFailed(format!(
            "{} preset: scale factor must be between {:.4} and {}, got {}",
            preset.name,
            1.0 / MAX_PYRAMID_SCALE,
            1.0 / MIN_PYRAMID_SCALE,
            preset.scale_factor
        )));
    }

    let min_face_size = preset.min_size.max(RUSTFACE_MIN_FACE_SIZE);
    if width < min_face_size || height < min_face_size {
        return Ok(None);
    }

    Ok(Some(ScanParams {
        min_face_size,
        score_thresh: preset.min_neighbors as f64,
        pyramid_scale,
    }))
}

impl CascadeDetector for RustfaceDetection {
    fn name(&self) -> &'static str {
        "rustface"
    }

    fn detect_multi_scale(
        &self,
        gray: &GrayImage,
        preset: &DetectionPreset,
    ) -> Result<Vec<BoundingBox>, DetectorError> {
        let (width, height) = gray.dimensions();
        let params = match scan_params(preset, width, height)? {
            Some(params) => params,
            None => return Ok(Vec::new()),
        };

        let mut detector = rustface::create_detector_with_model(self.model.clone());
        detector.set_min_face_size(params.min_face_size);
        detector.set_score_thresh(params.score_thresh);
        detector.set_pyramid_scale_factor(params.pyramid_scale);
        detector.set_slide_window_step(4, 4);

        let faces = detector.detect(&rustface::ImageData::new(gray.as_raw(), width, height));

        Ok(faces
            .iter()
            .map(|face| {
                let bbox = face.bbox();
                BoundingBox {
                    x: bbox.x(),
                    y: bbox.y(),
                    width: bbox.width(),
                    height: bbox.height(),
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn preset(scale_factor: f64, min_neighbors: u32, min_size: u32) -> DetectionPreset {
        DetectionPreset { name: "custom", scale_factor, min_neighbors, min_size }
    }

    #[test]
    fn test_missing_model_file() {
        match RustfaceDetection::load(Some("/nonexistent/seeta_fd_frontal_v1.0.bin")) {
            Err(DetectorError::ModelNotFound(path)) => assert!(path.contains("seeta")),
            Err(e) => panic!("unexpected error: {e}"),
            Ok(_) => panic!("model should not load"),
        }
    }

    #[test]
    fn test_preset_mapping() {
        let params = scan_params(&DetectionPreset::sensitive(), 200, 200).unwrap().unwrap();
        assert_eq!(params.min_face_size, 40);
        assert_eq!(params.score_thresh, 3.0);
        assert!((params.pyramid_scale - 1.0 / 1.05).abs() < 1e-6);

        let params = scan_params(&DetectionPreset::conservative(), 200, 200).unwrap().unwrap();
        assert_eq!(params.min_face_size, 60);
        assert_eq!(params.score_thresh, 5.0);
        assert!((params.pyramid_scale - 1.0 / 1.1).abs() < 1e-6);
    }

    #[test]
    fn test_min_face_size_is_floored() {
        let params = scan_params(&preset(1.25, 2, 8), 100, 100).unwrap().unwrap();
        assert_eq!(params.min_face_size, RUSTFACE_MIN_FACE_SIZE);
        assert!((params.pyramid_scale - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_image_smaller_than_min_size_is_skipped() {
        assert_eq!(scan_params(&DetectionPreset::sensitive(), 10, 10).unwrap(), None);
        assert_eq!(scan_params(&DetectionPreset::sensitive(), 300, 39).unwrap(), None);
        // the floor applies even when the preset asks for less
        assert_eq!(scan_params(&preset(1.1, 3, 5), 19, 19).unwrap(), None);
    }

    #[test]
    fn test_out_of_range_presets_are_rejected() {
        for scale_factor in [1.0, 0.9, 1.005, 150.0, f64::NAN] {
            assert!(
                matches!(scan_params(&preset(scale_factor, 3, 40), 100, 100), Err(DetectorError::DetectionFailed(_))),
                "scale factor {scale_factor} should be rejected"
            );
        }
        assert!(matches!(scan_params(&preset(1.1, 0, 40), 100, 100), Err(DetectorError::DetectionFailed(_))));
        // rejected regardless of image size
        assert!(scan_params(&preset(1.1, 0, 40), 4, 4).is_err());
    }

    #[test]
    fn test_smallest_accepted_scale_factor() {
        assert!(scan_params(&preset(1.0102, 3, 40), 100, 100).unwrap().is_some());
    }

    #[cfg(not(bundled_seeta_model))]
    #[test]
    fn test_no_bundled_model() {
        assert!(matches!(RustfaceDetection::load(None), Err(DetectorError::ModelNotFound(_))));
    }

    #[cfg(bundled_seeta_model)]
    mod bundled {
        use image::{Rgb, RgbImage};

        use super::*;
        use crate::pipeline::module::face_detection::DetectionPolicy;
        use crate::pipeline::utils::image::{decode_rgb, equalized_gray};

        const FRONTAL_FACE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/frontal_face.png");

        fn detect(detector: &RustfaceDetection, image: &RgbImage) -> Vec<BoundingBox> {
            DetectionPolicy::default().run(detector, &equalized_gray(image)).unwrap()
        }

        #[test]
        fn test_frontal_face_is_found() {
            let detector = RustfaceDetection::load(None).unwrap();
            let image = decode_rgb(&std::fs::read(FRONTAL_FACE).unwrap()).unwrap();

            let faces = detect(&detector, &image);
            assert!(!faces.is_empty());
            let face = faces[0];
            assert!(face.width >= 40 && face.height >= 40);
            assert!(face.x >= 0 && (face.x as u32) < image.width());
        }

        #[test]
        fn test_detection_is_idempotent() {
            let detector = RustfaceDetection::load(None).unwrap();
            let image = decode_rgb(&std::fs::read(FRONTAL_FACE).unwrap()).unwrap();
            assert_eq!(detect(&detector, &image), detect(&detector, &image));
        }

        #[test]
        fn test_solid_images_have_no_face() {
            let detector = RustfaceDetection::load(None).unwrap();
            assert!(detect(&detector, &RgbImage::from_pixel(10, 10, Rgb([200, 200, 200]))).is_empty());
            assert!(detect(&detector, &RgbImage::from_pixel(96, 96, Rgb([120, 120, 120]))).is_empty());
        }
    }
}
