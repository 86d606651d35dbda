//! Centralized error types for gantry
//!
//! Uses thiserror for typed errors that can be matched on,
//! while still being compatible with anyhow for propagation.

use thiserror::Error;

/// Top-level error type for pipeline operations
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    #[error("Deployment error: {0}")]
    Deployment(#[from] DeploymentError),

    #[error("Artifact error: {0}")]
    Artifact(#[from] ArtifactError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Run cancelled before stage: {stage}")]
    Cancelled { stage: String },
}

/// Source retrieval errors
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Source repository not found or unreachable: {repository}")]
    RepositoryNotFound { repository: String },

    #[error("Branch {branch} not found in repository {repository}")]
    BranchNotFound { repository: String, branch: String },

    #[error("Failed to fetch source: {message}")]
    FetchFailed { message: String },

    #[error("Failed to resolve source revision: {0}")]
    RevisionFailed(String),

    #[error("Git command failed: {command}")]
    CommandFailed { command: String },
}

/// Container registry errors
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Failed to resolve account identity: {message}")]
    IdentityFailed { message: String },

    #[error("Authorization token request failed: {message}")]
    TokenRequestFailed { message: String },

    #[error("Authorization token is not valid base64 user:password data")]
    TokenMalformed,

    #[error("Registry login failed for {registry}: {message}")]
    LoginFailed { registry: String, message: String },

    #[error("Registry authentication timed out after {timeout_secs}s")]
    AuthTimeout { timeout_secs: u64 },

    #[error("Push failed after {attempts} attempts: {message}")]
    PushFailed { attempts: u32, message: String },

    #[error("Push timed out after {timeout_secs}s")]
    PushTimeout { timeout_secs: u64 },
}

/// Image build errors
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Container engine unavailable: {message}")]
    EngineUnavailable { message: String },

    #[error("Image build failed: {message}")]
    ImageBuildFailed { message: String },

    #[error("Failed to tag image {image}: {message}")]
    TagFailed { image: String, message: String },

    #[error("Failed to write deployment manifest: {message}")]
    ManifestWriteFailed { message: String },
}

/// Deployment submission errors
#[derive(Error, Debug)]
pub enum DeploymentError {
    #[error("Service {service} not found in cluster {cluster}")]
    ServiceNotFound { service: String, cluster: String },

    #[error("Task definition family not found: {family}")]
    TaskDefinitionNotFound { family: String },

    #[error("Container {container} not present in task definition {family}")]
    ContainerNotFound { container: String, family: String },

    #[error("Malformed deployment manifest: {message}")]
    MalformedManifest { message: String },

    #[error("Deployment submission failed: {message}")]
    SubmitFailed { message: String },

    #[error("Deployment submission timed out after {timeout_secs}s")]
    SubmitTimeout { timeout_secs: u64 },
}

/// Artifact store errors
#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("Invalid artifact name: {name}")]
    InvalidName { name: String },

    #[error("Artifact name already declared: {name}")]
    DuplicateName { name: String },

    #[error("Unknown artifact: {name}")]
    Unknown { name: String },

    #[error("Artifact {name} has not been published by its producing stage")]
    NotPublished { name: String },

    #[error("Artifact {name} was already published")]
    AlreadyPublished { name: String },

    #[error("Artifact I/O failed for {name}: {message}")]
    Io { name: String, message: String },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {path}")]
    FileNotFound { path: String },

    #[error("Failed to parse config: {message}")]
    ParseError { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_error_display() {
        let err = SourceError::BranchNotFound {
            repository: "service-repo".to_string(),
            branch: "main".to_string(),
        };
        assert!(err.to_string().contains("main"));
        assert!(err.to_string().contains("service-repo"));
    }

    #[test]
    fn test_push_failed_display() {
        let err = RegistryError::PushFailed {
            attempts: 1,
            message: "connection reset".to_string(),
        };
        assert!(err.to_string().contains("after 1 attempts"));
    }

    #[test]
    fn test_error_conversion() {
        let registry_err = RegistryError::TokenMalformed;
        let pipeline_err: PipelineError = registry_err.into();
        assert!(matches!(pipeline_err, PipelineError::Registry(_)));
    }

    #[test]
    fn test_artifact_gating_errors() {
        let err = ArtifactError::NotPublished {
            name: "imageDetail".to_string(),
        };
        assert!(err.to_string().contains("not been published"));

        let err: PipelineError = ArtifactError::AlreadyPublished {
            name: "imageDetail".to_string(),
        }
        .into();
        assert!(matches!(err, PipelineError::Artifact(_)));
    }
}
