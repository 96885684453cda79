use std::sync::Arc;

use log::{debug, error};
use tokio::task;

use crate::error::errors::Error;
use crate::models::face_model::{
    DetectInput, DetectOutput, EmbedInput, EmbedOutput, HealthOutput, IdentifyInput, IdentifyOutput, VerifyInput,
    VerifyOutput,
};
use crate::pipeline::face_pipeline::face_pipeline::FacePipeline;

#[derive(Clone)]
pub struct FaceService {
    face_pipeline: Arc<FacePipeline>,
}

impl FaceService {
    pub fn new(face_pipeline: &Arc<FacePipeline>) -> Self {
        FaceService {
            face_pipeline: Arc::clone(face_pipeline),
        }
    }

    /// Decoding and inference block, so they run on tokio's blocking pool.
    async fn run_blocking<T, F>(&self, op: F) -> Result<T, Error>
    where
        T: Send + 'static,
        F: FnOnce(&FacePipeline) -> Result<T, Error> + Send + 'static,
    {
        let pipeline = Arc::clone(&self.face_pipeline);
        match task::spawn_blocking(move || op(&pipeline)).await {
            Ok(result) => result,
            Err(e) => {
                error!("pipeline task failed: {e}");
                Err(Error::internal(e.to_string()))
            }
        }
    }

    pub fn health(&self) -> HealthOutput {
        let health = self.face_pipeline.health();
        HealthOutput {
            status: "ok".to_string(),
            backend: health.backend.to_string(),
            opencv_available: health.detector_available,
        }
    }

    pub async fn detect(&self, input: DetectInput) -> Result<DetectOutput, Error> {
        let im_bytes = input.image.im_bytes;
        let result = self.run_blocking(move |p| p.detect(&im_bytes)).await?;

        Ok(DetectOutput {
            face_detected: result.num_faces > 0,
            num_faces: result.num_faces,
        })
    }

    pub async fn embed(&self, input: EmbedInput) -> Result<EmbedOutput, Error> {
        let EmbedInput { image, model } = input;
        let result = self.run_blocking(move |p| p.embed(&image.im_bytes, &model)).await?;

        Ok(EmbedOutput {
            embedding: result.embedding,
            model: result.model,
        })
    }

    pub async fn verify(&self, input: VerifyInput) -> Result<VerifyOutput, Error> {
        let VerifyInput { image1, image2, model, metric } = input;
        let result = self
            .run_blocking(move |p| p.verify(&image1.im_bytes, &image2.im_bytes, &model, metric))
            .await?;

        Ok(VerifyOutput {
            matched: result.matched,
            distance: result.distance,
            threshold: result.threshold,
            model: result.model,
        })
    }

    pub fn identify(&self, input: IdentifyInput) -> IdentifyOutput {
        debug!("identify stub called with {} bytes", input.image.im_bytes.len());
        let result = self.face_pipeline.identify(&input.model);
        IdentifyOutput {
            identity: result.identity,
            distance: result.distance,
            model: result.model,
        }
    }
}
