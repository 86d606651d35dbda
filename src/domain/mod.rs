//! Domain layer - pure pipeline logic
//!
//! This module contains the pipeline's data model with no external I/O.
//! Types and functions here can be unit tested without mocking.

pub mod artifact;
pub mod image;
pub mod manifest;
pub mod run;

// Re-export commonly used types
pub use artifact::{Artifact, ArtifactStore, IMAGE_DETAIL_ARTIFACT, SOURCE_ARTIFACT};
pub use image::{revision_tag, ImageReference, LATEST_TAG};
pub use manifest::{
    parse_image_definitions, render_image_definitions, ImageDefinition, DEFAULT_MANIFEST_FILE,
};
pub use run::{BuildStep, PipelineStage, RunPhase, RunSummary, StageResult, StepResult};
