//! Services layer - pipeline orchestration logic

pub mod pipeline_service;

pub use pipeline_service::{BuildProducts, PipelineService};
