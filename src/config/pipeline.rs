//! Pipeline configuration: source repository, artifact names, and step limits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::artifact::{IMAGE_DETAIL_ARTIFACT, SOURCE_ARTIFACT};
use crate::domain::manifest::DEFAULT_MANIFEST_FILE;

/// Delivery pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Source repository name or URL (supports `{prefix}`)
    #[serde(default = "default_repository")]
    pub repository: String,

    /// Branch whose head triggers and feeds the pipeline
    #[serde(default = "default_branch")]
    pub branch: String,

    /// Name of the source-tree artifact
    #[serde(default = "default_source_artifact")]
    pub source_artifact: String,

    /// Name of the manifest artifact
    #[serde(default = "default_manifest_artifact")]
    pub manifest_artifact: String,

    /// File name of the manifest inside its artifact
    #[serde(default = "default_manifest_file")]
    pub manifest_file: String,

    /// Attempts per image push before the stage fails
    #[serde(default = "default_push_attempts")]
    pub push_attempts: u32,

    /// Registry authentication time limit (humantime format)
    #[serde(default = "default_auth_timeout")]
    pub auth_timeout: String,

    /// Per-push time limit (humantime format)
    #[serde(default = "default_push_timeout")]
    pub push_timeout: String,

    /// Deployment submission time limit (humantime format)
    #[serde(default = "default_deploy_timeout")]
    pub deploy_timeout: String,
}

fn default_repository() -> String {
    "{prefix}".to_string()
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_source_artifact() -> String {
    SOURCE_ARTIFACT.to_string()
}

fn default_manifest_artifact() -> String {
    IMAGE_DETAIL_ARTIFACT.to_string()
}

fn default_manifest_file() -> String {
    DEFAULT_MANIFEST_FILE.to_string()
}

fn default_push_attempts() -> u32 {
    1
}

fn default_auth_timeout() -> String {
    "2m".to_string()
}

fn default_push_timeout() -> String {
    "10m".to_string()
}

fn default_deploy_timeout() -> String {
    "5m".to_string()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            repository: default_repository(),
            branch: default_branch(),
            source_artifact: default_source_artifact(),
            manifest_artifact: default_manifest_artifact(),
            manifest_file: default_manifest_file(),
            push_attempts: default_push_attempts(),
            auth_timeout: default_auth_timeout(),
            push_timeout: default_push_timeout(),
            deploy_timeout: default_deploy_timeout(),
        }
    }
}

const FALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

impl PipelineConfig {
    pub fn auth_timeout(&self) -> Duration {
        parse_timeout(&self.auth_timeout)
    }

    pub fn push_timeout(&self) -> Duration {
        parse_timeout(&self.push_timeout)
    }

    pub fn deploy_timeout(&self) -> Duration {
        parse_timeout(&self.deploy_timeout)
    }

    pub fn validate(&self, errors: &mut Vec<String>) {
        if self.repository.is_empty() {
            errors.push("pipeline.repository must not be empty".to_string());
        }
        if self.branch.is_empty() {
            errors.push("pipeline.branch must not be empty".to_string());
        }
        if self.source_artifact.is_empty() || self.manifest_artifact.is_empty() {
            errors.push("pipeline artifact names must not be empty".to_string());
        }
        if self.source_artifact == self.manifest_artifact {
            errors.push(format!(
                "pipeline artifact names must be distinct, both are: {}",
                self.source_artifact
            ));
        }
        if self.manifest_file.is_empty() {
            errors.push("pipeline.manifest_file must not be empty".to_string());
        }
        if self.push_attempts == 0 {
            errors.push("pipeline.push_attempts must be at least 1".to_string());
        }
        for (field, value) in [
            ("pipeline.auth_timeout", &self.auth_timeout),
            ("pipeline.push_timeout", &self.push_timeout),
            ("pipeline.deploy_timeout", &self.deploy_timeout),
        ] {
            if humantime::parse_duration(value).is_err() {
                errors.push(format!("{} is not a duration: {}", field, value));
            }
        }
    }
}

fn parse_timeout(value: &str) -> Duration {
    humantime::parse_duration(value).unwrap_or(FALLBACK_TIMEOUT)
}
