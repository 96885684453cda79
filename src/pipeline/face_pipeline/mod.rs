pub mod face_pipeline;
