pub mod face_detection;
pub mod face_extraction;
pub mod onnx_extraction;
#[cfg(feature = "opencv")]
pub mod opencv_detection;
pub mod rustface_detection;
