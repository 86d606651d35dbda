//! Pipeline run domain types
//!
//! Defines the delivery pipeline as a state machine with explicit stages,
//! typed build steps, and per-step results.

use std::time::Duration;

use chrono::{DateTime, Local};
use uuid::Uuid;

/// Stages of a delivery pipeline run, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    /// Fetch the branch head into the source artifact
    Source,
    /// Build, tag, and push the container image; emit the manifest
    Build,
    /// Submit the rolling update to the orchestrator
    Deployment,
}

impl PipelineStage {
    /// Stages in their mandatory execution order
    pub const SEQUENCE: [PipelineStage; 3] = [Self::Source, Self::Build, Self::Deployment];

    /// Get human-readable name for the stage
    pub fn name(&self) -> &'static str {
        match self {
            Self::Source => "Source",
            Self::Build => "Build",
            Self::Deployment => "Deployment",
        }
    }

    /// Get emoji for the stage
    pub fn emoji(&self) -> &'static str {
        match self {
            Self::Source => "📥",
            Self::Build => "🔨",
            Self::Deployment => "🚀",
        }
    }
}

/// Individual steps of the Build stage, in execution order
///
/// Each step gates the next; a failure aborts the remainder of the stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStep {
    /// Authenticate to the container registry with short-lived credentials
    Authenticate,
    /// Resolve the short revision tag (or fall back to `latest`)
    ResolveTag,
    /// Build the container image tagged `latest`
    BuildImage,
    /// Re-tag the built image with the short revision tag
    TagImage,
    /// Push both tags to the registry
    Push,
    /// Write the image-definitions manifest artifact
    EmitManifest,
}

impl BuildStep {
    /// Build steps in their mandatory execution order
    pub const SEQUENCE: [BuildStep; 6] = [
        Self::Authenticate,
        Self::ResolveTag,
        Self::BuildImage,
        Self::TagImage,
        Self::Push,
        Self::EmitManifest,
    ];

    /// Get human-readable name for the step
    pub fn name(&self) -> &'static str {
        match self {
            Self::Authenticate => "Registry Login",
            Self::ResolveTag => "Resolve Tag",
            Self::BuildImage => "Build Image",
            Self::TagImage => "Tag Image",
            Self::Push => "Push Tags",
            Self::EmitManifest => "Emit Manifest",
        }
    }

    /// Get emoji for the step
    pub fn emoji(&self) -> &'static str {
        match self {
            Self::Authenticate => "🔐",
            Self::ResolveTag => "🏷️",
            Self::BuildImage => "🔨",
            Self::TagImage => "🏷️",
            Self::Push => "📤",
            Self::EmitManifest => "📝",
        }
    }
}

/// Current phase of a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    /// Not started
    Pending,
    /// Currently executing a stage
    InProgress(PipelineStage),
    /// All stages completed successfully
    Completed,
    /// Failed at a specific stage
    Failed(PipelineStage),
    /// Cancelled before the named stage started
    Cancelled(PipelineStage),
}

/// Result of a completed stage
#[derive(Debug)]
pub struct StageResult {
    pub stage: PipelineStage,
    pub success: bool,
    pub duration: Duration,
    pub message: Option<String>,
}

impl StageResult {
    pub fn success(stage: PipelineStage, duration: Duration) -> Self {
        Self {
            stage,
            success: true,
            duration,
            message: None,
        }
    }

    pub fn failure(stage: PipelineStage, duration: Duration, message: impl Into<String>) -> Self {
        Self {
            stage,
            success: false,
            duration,
            message: Some(message.into()),
        }
    }
}

/// Result of a single build step execution
#[derive(Debug)]
pub struct StepResult {
    pub step: BuildStep,
    pub success: bool,
    pub duration: Duration,
    pub message: Option<String>,
}

impl StepResult {
    pub fn success(step: BuildStep, duration: Duration) -> Self {
        Self {
            step,
            success: true,
            duration,
            message: None,
        }
    }

    pub fn failure(step: BuildStep, duration: Duration, message: impl Into<String>) -> Self {
        Self {
            step,
            success: false,
            duration,
            message: Some(message.into()),
        }
    }
}

/// Per-run record printed at the end of every run, success or failure
#[derive(Debug)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Local>,
    pub phase: RunPhase,
    pub stages: Vec<StageResult>,
    pub build_steps: Vec<StepResult>,
}

impl RunSummary {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Local::now(),
            phase: RunPhase::Pending,
            stages: Vec::new(),
            build_steps: Vec::new(),
        }
    }

    /// The stage the run failed at, if any
    pub fn failed_stage(&self) -> Option<PipelineStage> {
        match self.phase {
            RunPhase::Failed(stage) => Some(stage),
            _ => None,
        }
    }

    /// The build step the run failed at, if the Build stage failed
    pub fn failed_step(&self) -> Option<BuildStep> {
        self.build_steps
            .iter()
            .find(|result| !result.success)
            .map(|result| result.step)
    }

    pub fn total_duration(&self) -> Duration {
        self.stages.iter().map(|result| result.duration).sum()
    }
}

impl Default for RunSummary {
    fn default() -> Self {
        Self::new()
    }
}
