// Domain layer - Segmentation types and policies

pub mod errors;
pub mod model;
pub mod rules;
