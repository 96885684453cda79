use std::sync::Arc;

use crate::pipeline::face_pipeline::face_pipeline::FacePipeline;
use crate::service::face_service::FaceService;

#[derive(Clone)]
pub struct FaceState {
    pub face_service: FaceService,
}

impl FaceState {
    pub fn new(pipeline: &Arc<FacePipeline>) -> Self {
        Self {
            face_service: FaceService::new(pipeline),
        }
    }
}
