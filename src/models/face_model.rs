use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::pipeline::processing::distance::DistanceMetric;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthOutput {
    pub status: String,
    pub backend: String,
    pub opencv_available: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DetectOutput {
    pub face_detected: bool,
    pub num_faces: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedOutput {
    pub embedding: Vec<f32>,
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyOutput {
    #[serde(rename = "match")]
    pub matched: bool,
    pub distance: f32,
    pub threshold: f32,
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IdentifyOutput {
    pub identity: Option<String>,
    pub distance: Option<f32>,
    pub model: String,
}

/// An uploaded multipart file.
#[derive(Clone)]
pub struct UploadedImage {
    pub filename: Option<String>,
    pub im_bytes: Bytes,
}

#[derive(Clone)]
pub struct DetectInput {
    pub image: UploadedImage,
}

#[derive(Clone)]
pub struct EmbedInput {
    pub image: UploadedImage,
    pub model: String,
}

#[derive(Clone)]
pub struct VerifyInput {
    pub image1: UploadedImage,
    pub image2: UploadedImage,
    pub model: String,
    pub metric: DistanceMetric,
}

#[derive(Clone)]
pub struct IdentifyInput {
    pub image: UploadedImage,
    pub model: String,
}
