use crate::pipeline::processing::distance::DistanceMetric;

pub const DEFAULT_RECOGNITION_MODEL: &str = "Facenet512";
pub const DEFAULT_DISTANCE_METRIC: &str = "cosine";

/// Parameters of one cascade detection pass.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionPreset {
    pub name: &'static str,
    pub scale_factor: f64,
    pub min_neighbors: u32,
    pub min_size: u32,
}

impl DetectionPreset {
    /// Permissive pass: catches small or slightly angled faces.
    pub fn sensitive() -> Self {
        DetectionPreset {
            name: "sensitive",
            scale_factor: 1.05,
            min_neighbors: 3,
            min_size: 40,
        }
    }

    /// Stricter pass used when the sensitive one finds nothing.
    pub fn conservative() -> Self {
        DetectionPreset {
            name: "conservative",
            scale_factor: 1.1,
            min_neighbors: 5,
            min_size: 60,
        }
    }
}

#[derive(Debug)]
pub struct FaceDetectionConfig {
    pub presets: Vec<DetectionPreset>,
}

impl FaceDetectionConfig {
    pub fn new() -> Self {
        FaceDetectionConfig {
            presets: vec![DetectionPreset::sensitive(), DetectionPreset::conservative()],
        }
    }
}

/// Verification threshold used when a model config does not override it.
pub fn default_threshold(model_name: &str, metric: DistanceMetric) -> f32 {
    match (model_name, metric) {
        ("Facenet512", DistanceMetric::Cosine) => 0.30,
        ("Facenet512", DistanceMetric::Euclidean) => 23.56,
        ("Facenet512", DistanceMetric::EuclideanL2) => 1.04,

        ("Facenet", DistanceMetric::Cosine) => 0.40,
        ("Facenet", DistanceMetric::Euclidean) => 10.0,
        ("Facenet", DistanceMetric::EuclideanL2) => 0.80,

        ("ArcFace", DistanceMetric::Cosine) => 0.68,
        ("ArcFace", DistanceMetric::Euclidean) => 4.15,
        ("ArcFace", DistanceMetric::EuclideanL2) => 1.13,

        ("VGG-Face", DistanceMetric::Cosine) => 0.68,
        ("VGG-Face", DistanceMetric::Euclidean) => 1.17,
        ("VGG-Face", DistanceMetric::EuclideanL2) => 1.17,

        (_, DistanceMetric::Cosine) => 0.40,
        (_, DistanceMetric::Euclidean) => 0.60,
        (_, DistanceMetric::EuclideanL2) => 0.75,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_order() {
        let cfg = FaceDetectionConfig::new();
        let names: Vec<_> = cfg.presets.iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["sensitive", "conservative"]);

        let sensitive = &cfg.presets[0];
        let conservative = &cfg.presets[1];
        assert!(sensitive.min_neighbors < conservative.min_neighbors);
        assert!(sensitive.min_size < conservative.min_size);
    }

    #[test]
    fn test_default_threshold() {
        assert_eq!(default_threshold("Facenet512", DistanceMetric::Cosine), 0.30);
        assert_eq!(default_threshold("ArcFace", DistanceMetric::EuclideanL2), 1.13);
        assert_eq!(default_threshold("SFace", DistanceMetric::Cosine), 0.40);
    }
}
