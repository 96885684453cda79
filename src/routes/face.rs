use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handler::face_handler::{detect, embed, health, identify, verify};
use crate::state::face_state::FaceState;

pub fn new_face_route(body_limit_bytes: usize) -> Router<FaceState> {
    let upload_routes = Router::new()
        .route("/embed", post(embed))
        .route("/verify", post(verify))
        .route("/identify", post(identify))
        .route("/detect", post(detect))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit_bytes));

    Router::new()
        .route("/health", get(health))
        .merge(upload_routes)
}
