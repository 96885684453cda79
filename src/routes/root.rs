use std::sync::Arc;
use std::time::Duration;

use axum::http::header;
use axum::{middleware, Json, Router};
use http::{Method, StatusCode, Uri};
use serde::{Deserialize, Serialize};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::propagate_header::PropagateHeaderLayer;
use tower_http::timeout::TimeoutLayer;

use crate::config::settings::Server;
use crate::middleware::error_body_mw::json_error_body_mw;
use crate::middleware::request_id_mw::{generate_request_id_mw, REQUEST_ID_HEADER};
use crate::pipeline::face_pipeline::face_pipeline::FacePipeline;
use crate::routes::face::new_face_route;
use crate::state::face_state::FaceState;

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 20;
const DEFAULT_BODY_LIMIT_MB: usize = 20;

#[derive(Clone, Serialize, Deserialize)]
struct FallbackResponse {
    error: String,
}

#[derive(Clone)]
pub struct RouterState {
    face_pipeline: Arc<FacePipeline>,
}

impl RouterState {
    pub fn new(face_pipeline: FacePipeline) -> Self {
        RouterState {
            face_pipeline: Arc::new(face_pipeline),
        }
    }
}

pub fn root_routes(router_state: RouterState, server: &Server) -> Router {
    let request_timeout_duration = server.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
    let body_limit_bytes = server.body_limit_mb.unwrap_or(DEFAULT_BODY_LIMIT_MB) * 1024 * 1024;

    let face_state = FaceState::new(&router_state.face_pipeline);
    let face_route = new_face_route(body_limit_bytes).with_state(face_state);

    Router::new()
        .merge(face_route)
        .layer(CompressionLayer::new())
        .fallback(fallback)
        .layer(TimeoutLayer::new(Duration::from_secs(request_timeout_duration)))
        .layer(middleware::map_response(json_error_body_mw))
        .layer(PropagateHeaderLayer::new(header::HeaderName::from_static(REQUEST_ID_HEADER)))
        .layer(CorsLayer::permissive().allow_methods([Method::GET, Method::POST, Method::HEAD, Method::OPTIONS]))
        .layer(middleware::from_fn(generate_request_id_mw))
}

async fn fallback(uri: Uri) -> (StatusCode, Json<FallbackResponse>) {
    (StatusCode::NOT_FOUND, Json(FallbackResponse {
        error: format!("No route for {uri}"),
    }))
}
