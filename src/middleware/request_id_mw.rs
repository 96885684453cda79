use axum::extract::Request;
use axum::middleware::Next;
use axum::response::IntoResponse;
use http::{header, HeaderValue};
use uuid::Uuid;

use crate::error::errors::Error;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Tags the request with a fresh id unless the caller already sent one.
pub async fn generate_request_id_mw(mut req: Request, next: Next) -> Result<impl IntoResponse, Error> {
    if !req.headers().contains_key(REQUEST_ID_HEADER) {
        let request_id = Uuid::new_v4().to_string();
        let value = HeaderValue::from_str(&request_id).map_err(|e| Error::internal(e.to_string()))?;
        req.headers_mut()
            .insert(header::HeaderName::from_static(REQUEST_ID_HEADER), value);
    }

    Ok(next.run(req).await)
}
