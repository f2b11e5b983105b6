pub mod vision_service;

pub use vision_service::{TokenLimitField, VisionInference, VisionService};
