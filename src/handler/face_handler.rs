use std::collections::HashMap;

use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, State};
use axum::debug_handler;
use http::{HeaderMap, StatusCode};
use log::{error, info, warn};

use crate::error::errors::Error;
use crate::models::face_model::{
    DetectInput, DetectOutput, EmbedInput, EmbedOutput, HealthOutput, IdentifyInput, IdentifyOutput, UploadedImage,
    VerifyInput, VerifyOutput,
};
use crate::pipeline::model_config::config::{DEFAULT_DISTANCE_METRIC, DEFAULT_RECOGNITION_MODEL};
use crate::pipeline::processing::distance::DistanceMetric;
use crate::response::common_response::{ok, GeneralResponseResult};
use crate::state::face_state::FaceState;

/// Multipart fields of one request, keyed by field name.
struct FormFields {
    request_id: String,
    fields: HashMap<String, UploadedImage>,
}

impl FormFields {
    async fn read(headers: &HeaderMap, mut payload: Multipart) -> Result<Self, Error> {
        let request_id = request_id(headers);
        let mut fields = HashMap::new();

        loop {
            let field = match payload.next_field().await {
                Ok(Some(field)) => field,
                Ok(None) => break,
                Err(e) => return Err(multipart_error(&request_id, "multipart body", e)),
            };

            let name = match field.name() {
                Some(name) => name.to_string(),
                None => continue,
            };
            let filename = field.file_name().map(str::to_string);

            match field.bytes().await {
                Ok(im_bytes) => {
                    fields.insert(name, UploadedImage { filename, im_bytes });
                }
                Err(e) => return Err(multipart_error(&request_id, &format!("field {name}"), e)),
            }
        }

        Ok(FormFields { request_id, fields })
    }

    fn image(&mut self, name: &str) -> Result<UploadedImage, Error> {
        let image = self
            .fields
            .remove(name)
            .ok_or_else(|| Error::bad_request(format!("missing field {name}")))?;

        info!(
            "[{}] received image: {}, size: {}",
            self.request_id,
            image.filename.as_deref().unwrap_or("<unnamed>"),
            image.im_bytes.len()
        );
        Ok(image)
    }

    fn text(&mut self, name: &str, default: &str) -> Result<String, Error> {
        match self.fields.remove(name) {
            None => Ok(default.to_string()),
            Some(field) => match String::from_utf8(field.im_bytes.to_vec()) {
                Ok(value) if value.trim().is_empty() => Ok(default.to_string()),
                Ok(value) => Ok(value.trim().to_string()),
                Err(_) => Err(Error::bad_request(format!("field {name} is not valid UTF-8"))),
            },
        }
    }
}

/// A body cut off by the size limit is a 413; anything else is a malformed upload.
fn multipart_error(request_id: &str, part: &str, e: MultipartError) -> Error {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        warn!("[{request_id}] {part} exceeds the body limit");
        return Error::PayloadTooLarge;
    }
    error!("[{request_id}] failed to read {part}: {e}");
    Error::bad_request(format!("invalid {part}"))
}

fn request_id(headers: &HeaderMap) -> String {
    headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string()
}

pub async fn health(State(state): State<FaceState>) -> GeneralResponseResult<HealthOutput> {
    Ok(ok(state.face_service.health()))
}

#[debug_handler(state = FaceState)]
pub async fn detect(
    headers: HeaderMap,
    State(state): State<FaceState>,
    payload: Multipart,
) -> GeneralResponseResult<DetectOutput> {
    let mut form = FormFields::read(&headers, payload).await?;
    let input = DetectInput { image: form.image("image")? };

    let result = state.face_service.detect(input).await?;
    info!("[{}] detection result: {:?}", form.request_id, result);

    Ok(ok(result))
}

#[debug_handler(state = FaceState)]
pub async fn embed(
    headers: HeaderMap,
    State(state): State<FaceState>,
    payload: Multipart,
) -> GeneralResponseResult<EmbedOutput> {
    let mut form = FormFields::read(&headers, payload).await?;
    let input = EmbedInput {
        image: form.image("image")?,
        model: form.text("model", DEFAULT_RECOGNITION_MODEL)?,
    };

    let result = state.face_service.embed(input).await?;
    info!("[{}] embedded face with {} ({} dims)", form.request_id, result.model, result.embedding.len());

    Ok(ok(result))
}

#[debug_handler(state = FaceState)]
pub async fn verify(
    headers: HeaderMap,
    State(state): State<FaceState>,
    payload: Multipart,
) -> GeneralResponseResult<VerifyOutput> {
    let mut form = FormFields::read(&headers, payload).await?;
    let metric = form.text("metric", DEFAULT_DISTANCE_METRIC)?;
    let input = VerifyInput {
        image1: form.image("image1")?,
        image2: form.image("image2")?,
        model: form.text("model", DEFAULT_RECOGNITION_MODEL)?,
        metric: metric.parse::<DistanceMetric>().map_err(Error::bad_request)?,
    };

    let result = state.face_service.verify(input).await?;
    info!(
        "[{}] verification with {}: match={} distance={}",
        form.request_id, result.model, result.matched, result.distance
    );

    Ok(ok(result))
}

#[debug_handler(state = FaceState)]
pub async fn identify(
    headers: HeaderMap,
    State(state): State<FaceState>,
    payload: Multipart,
) -> GeneralResponseResult<IdentifyOutput> {
    let mut form = FormFields::read(&headers, payload).await?;
    let input = IdentifyInput {
        image: form.image("image")?,
        model: form.text("model", DEFAULT_RECOGNITION_MODEL)?,
    };

    Ok(ok(state.face_service.identify(input)))
}
