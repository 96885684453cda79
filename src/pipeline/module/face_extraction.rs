use image::RgbImage;
use thiserror::Error;

use crate::pipeline::model_config::config::default_threshold;
use crate::pipeline::module::face_detection::{BoundingBox, DetectorError};
use crate::pipeline::processing::distance::DistanceMetric;

pub type EmbeddingVector = Vec<f32>;

#[derive(Error, Debug)]
pub enum RecognitionError {
    #[error("no face found")]
    NoFaceFound,
    #[error("unknown model: {0}")]
    UnknownModel(String),
    #[error("model file not found: {0}")]
    ModelNotFound(String),
    #[error("embedding length mismatch: {0} vs {1}")]
    DimensionMismatch(usize, usize),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error(transparent)]
    Detector(#[from] DetectorError),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// One embedded face.
#[derive(Debug, Clone)]
pub struct Representation {
    pub embedding: EmbeddingVector,
    /// `None` when no face was found and the whole image was embedded.
    pub facial_area: Option<BoundingBox>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Verification {
    pub verified: bool,
    pub distance: f32,
    pub threshold: f32,
}

/// Recognition backend: embeds faces and compares them.
///
/// Detection is permissive: an image with no detected face is still embedded
/// whole, so an empty `represent` result is the only "no face" signal.
pub trait RecognitionBackend: Send + Sync {
    fn represent(&self, image: &RgbImage, model: &str) -> Result<Vec<Representation>, RecognitionError>;

    /// The most prominent face only. Backends override this to skip
    /// embedding the remaining faces.
    fn represent_first(&self, image: &RgbImage, model: &str) -> Result<Representation, RecognitionError> {
        self.represent(image, model)?
            .into_iter()
            .next()
            .ok_or(RecognitionError::NoFaceFound)
    }

    fn threshold(&self, model: &str, metric: DistanceMetric) -> f32 {
        default_threshold(model, metric)
    }

    fn verify(
        &self,
        image_a: &RgbImage,
        image_b: &RgbImage,
        model: &str,
        metric: DistanceMetric,
    ) -> Result<Verification, RecognitionError> {
        let a = self.represent_first(image_a, model)?.embedding;
        let b = self.represent_first(image_b, model)?.embedding;
        if a.len() != b.len() {
            return Err(RecognitionError::DimensionMismatch(a.len(), b.len()));
        }

        let distance = metric.distance(&a, &b);
        let threshold = self.threshold(model, metric);

        Ok(Verification {
            verified: distance <= threshold,
            distance,
            threshold,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use image::Rgb;

    use super::*;

    /// Embeds an image as its mean colour, so equal images match.
    pub(crate) struct MeanColorBackend {
        pub empty: bool,
    }

    impl RecognitionBackend for MeanColorBackend {
        fn represent(&self, image: &RgbImage, model: &str) -> Result<Vec<Representation>, RecognitionError> {
            if model != "Facenet512" {
                return Err(RecognitionError::UnknownModel(model.to_string()));
            }
            if self.empty {
                return Ok(Vec::new());
            }
            let n = (image.width() * image.height()).max(1) as f32;
            let mut sum = [0.0f32; 3];
            for p in image.pixels() {
                for c in 0..3 {
                    sum[c] += p[c] as f32;
                }
            }
            Ok(vec![Representation {
                embedding: sum.iter().map(|s| s / n + 1.0).collect(),
                facial_area: None,
            }])
        }
    }

    #[test]
    fn test_verify_same_image_matches() {
        let backend = MeanColorBackend { empty: false };
        let image = RgbImage::from_pixel(4, 4, Rgb([200, 30, 30]));
        let result = backend.verify(&image, &image, "Facenet512", DistanceMetric::Cosine).unwrap();
        assert!(result.verified);
        assert!(result.distance < result.threshold);
        assert_eq!(result.threshold, 0.30);
    }

    #[test]
    fn test_verify_different_images() {
        let backend = MeanColorBackend { empty: false };
        let red = RgbImage::from_pixel(4, 4, Rgb([250, 0, 0]));
        let blue = RgbImage::from_pixel(4, 4, Rgb([0, 0, 250]));
        let result = backend.verify(&red, &blue, "Facenet512", DistanceMetric::Cosine).unwrap();
        assert!(!result.verified);
        assert!(result.distance > result.threshold);
    }

    #[test]
    fn test_represent_first_takes_the_first_face() {
        let backend = MeanColorBackend { empty: false };
        let image = RgbImage::from_pixel(2, 2, Rgb([9, 9, 9]));
        assert_eq!(backend.represent_first(&image, "Facenet512").unwrap().embedding, vec![10.0; 3]);

        let empty = MeanColorBackend { empty: true };
        assert!(matches!(empty.represent_first(&image, "Facenet512"), Err(RecognitionError::NoFaceFound)));
    }

    #[test]
    fn test_verify_empty_representation() {
        let backend = MeanColorBackend { empty: true };
        let image = RgbImage::new(2, 2);
        let result = backend.verify(&image, &image, "Facenet512", DistanceMetric::Cosine);
        assert!(matches!(result, Err(RecognitionError::NoFaceFound)));
    }
}
