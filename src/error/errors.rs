use axum::Json;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use log::error;
use serde_json::json;

use crate::pipeline::module::face_detection::DetectorError;
use crate::pipeline::module::face_extraction::RecognitionError;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Invalid image")]
    Decode(#[source] image::ImageError),

    #[error("Invalid image: empty upload")]
    EmptyImage,

    #[error("No face found")]
    NoFaceFound,

    #[error("{0}")]
    BadRequest(String),

    #[error("Unknown model: {0}")]
    UnknownModel(String),

    #[error("Recognition backend not available")]
    BackendUnavailable,

    #[error("Cascade classifier not loaded")]
    DetectorUnavailable,

    #[error("Request timed out")]
    RequestTimeout,

    #[error("Request body too large")]
    PayloadTooLarge,

    #[error("detector failure: {0}")]
    InternalDetector(#[from] DetectorError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    fn status_code(&self) -> StatusCode {
        match *self {
            // 4XX Errors
            Error::Decode(_)
            | Error::EmptyImage
            | Error::NoFaceFound
            | Error::BadRequest(_)
            | Error::UnknownModel(_) => StatusCode::BAD_REQUEST,
            Error::RequestTimeout => StatusCode::REQUEST_TIMEOUT,
            Error::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,

            // 5XX Errors
            Error::BackendUnavailable
            | Error::DetectorUnavailable
            | Error::InternalDetector(_)
            | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to the caller. Unexpected server faults are reduced to
    /// a fixed text; their detail only reaches the log.
    fn public_message(&self) -> String {
        match *self {
            Error::InternalDetector(_) | Error::Internal(_) => "internal server error".to_string(),
            _ => self.to_string(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Error::BadRequest(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal(message.into())
    }
}

impl From<RecognitionError> for Error {
    fn from(e: RecognitionError) -> Self {
        match e {
            RecognitionError::NoFaceFound => Error::NoFaceFound,
            RecognitionError::UnknownModel(name) => Error::UnknownModel(name),
            RecognitionError::Detector(e) => Error::InternalDetector(e),
            other => Error::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status_code = self.status_code();
        if status_code.is_server_error() {
            error!("request failed: {self}");
        }
        let body = Json(json!({ "error": self.public_message() }));

        (status_code, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_of(err: Error) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_client_errors_are_400() {
        let (status, body) = body_of(Error::NoFaceFound).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "No face found" }));

        let (status, _) = body_of(Error::EmptyImage).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_transport_errors() {
        let (status, body) = body_of(Error::RequestTimeout).await;
        assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
        assert_eq!(body, json!({ "error": "Request timed out" }));

        let (status, body) = body_of(Error::PayloadTooLarge).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body, json!({ "error": "Request body too large" }));
    }

    #[tokio::test]
    async fn test_backend_unavailable_is_500() {
        let (status, body) = body_of(Error::BackendUnavailable).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Recognition backend not available");
    }

    #[tokio::test]
    async fn test_internal_detail_is_hidden() {
        let (status, body) = body_of(Error::internal("embedding length mismatch: 128 vs 512")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "internal server error" }));
    }

    #[test]
    fn test_recognition_error_mapping() {
        assert!(matches!(Error::from(RecognitionError::NoFaceFound), Error::NoFaceFound));
        assert!(matches!(
            Error::from(RecognitionError::UnknownModel("x".into())),
            Error::UnknownModel(_)
        ));
        assert!(matches!(
            Error::from(RecognitionError::DimensionMismatch(128, 512)),
            Error::Internal(_)
        ));
    }
}
