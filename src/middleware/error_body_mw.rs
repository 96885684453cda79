use axum::response::{IntoResponse, Response};
use http::{header, StatusCode};

use crate::error::errors::Error;

/// Rewrites the bare 408 and 413 answers of the timeout and body-limit
/// layers into the `{error}` JSON body every other failure carries.
pub async fn json_error_body_mw(response: Response) -> Response {
    if is_json(&response) {
        return response;
    }

    match response.status() {
        StatusCode::REQUEST_TIMEOUT => Error::RequestTimeout.into_response(),
        StatusCode::PAYLOAD_TOO_LARGE => Error::PayloadTooLarge.into_response(),
        _ => response,
    }
}

fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with(mime::APPLICATION_JSON.as_ref()))
}
