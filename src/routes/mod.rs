pub mod face;
pub mod root;
