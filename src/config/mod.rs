//! # Delivery Configuration System
//!
//! A single YAML file (`deploy.yaml` by default) describes the whole delivery
//! target: project scope, network topology, registry, running service, and
//! pipeline settings. Every field has a default, so an empty file (or no file
//! at all) yields the reference topology.
//!
//! Name fields support a `{prefix}` placeholder expanded from
//! `project.prefix`, which keeps every resource name derived from one value.
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! let config = DeployConfig::load_or_default(Path::new("deploy.yaml"))?;
//! println!("Cluster: {}", config.cluster_name());
//! println!("Registry: {}", config.registry_uri("123456789012"));
//! ```

mod network;
mod pipeline;
mod project;
mod registry;
mod service;
mod validation;

// Re-export all public types
pub use network::NetworkConfig;
pub use pipeline::PipelineConfig;
pub use project::ProjectConfig;
pub use registry::RegistryConfig;
pub use service::ServiceConfig;

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;

/// Complete delivery configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DeployConfig {
    /// Project identity and target scope
    #[serde(default)]
    pub project: ProjectConfig,

    /// Network topology (displayed, not provisioned here)
    #[serde(default)]
    pub network: NetworkConfig,

    /// Container registry settings
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Orchestrated service and rollout policy
    #[serde(default)]
    pub service: ServiceConfig,

    /// Pipeline settings
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl DeployConfig {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.display().to_string(),
            });
        }
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ParseError {
            message: format!("{}: {}", path.display(), e),
        })?;
        serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
            message: format!("{}: {}", path.display(), e),
        })
    }

    /// Load configuration, falling back to built-in defaults when the file
    /// does not exist
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            debug!("no config file at {}, using built-in defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Expand `{prefix}` in a configured name pattern
    pub fn expand(&self, pattern: &str) -> String {
        pattern.replace("{prefix}", &self.project.prefix)
    }

    /// Resolved registry repository name
    pub fn repository_name(&self) -> String {
        self.expand(&self.registry.repository)
    }

    /// Resolved registry URI for the given account
    pub fn registry_uri(&self, account: &str) -> String {
        self.registry
            .uri(account, &self.project.region, &self.repository_name())
    }

    /// Resolved cluster name
    pub fn cluster_name(&self) -> String {
        self.expand(&self.service.cluster)
    }

    /// Resolved task definition family
    pub fn task_family(&self) -> String {
        self.expand(&self.service.task_family)
    }

    /// Resolved log group name
    pub fn log_group(&self) -> String {
        self.expand(&self.service.log_group)
    }

    /// Resolved source repository
    pub fn source_repository(&self) -> String {
        self.expand(&self.pipeline.repository)
    }

    /// Validate the whole configuration, collecting every problem
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        self.project.validate(&mut errors);
        self.network.validate(&mut errors);
        self.registry.validate(&mut errors);
        self.service.validate(&mut errors);
        self.pipeline.validate(&mut errors);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_yaml_yields_reference_topology() {
        let config: DeployConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.project.prefix, "ecs-fargate-rolling-update");
        assert_eq!(config.repository_name(), "ecs-fargate-rolling-update-nginx");
        assert_eq!(config.cluster_name(), "ecs-fargate-rolling-update-cluster");
        assert_eq!(config.task_family(), "ecs-fargate-rolling-update-task-definition");
        assert_eq!(config.log_group(), "/ecs-fargate-rolling-update-cluster");
        assert_eq!(config.source_repository(), "ecs-fargate-rolling-update");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_registry_uri_from_account_and_region() {
        let config = DeployConfig::default();
        assert_eq!(
            config.registry_uri("123456789012"),
            "123456789012.dkr.ecr.ap-northeast-1.amazonaws.com/ecs-fargate-rolling-update-nginx"
        );
    }

    #[test]
    fn test_partial_yaml_overrides_sections() {
        let yaml = "
project:
  prefix: checkout
  region: eu-west-1
service:
  container_name: web
pipeline:
  branch: release
";
        let config: DeployConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.cluster_name(), "checkout-cluster");
        assert_eq!(config.service.container_name, "web");
        assert_eq!(config.pipeline.branch, "release");
        // Untouched sections keep their defaults
        assert_eq!(config.service.max_healthy_percent, 200);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_collects_errors_across_sections() {
        let yaml = "
project:
  region: nowhere
network:
  cidr: bogus
pipeline:
  push_attempts: 0
";
        let config: DeployConfig = serde_yaml::from_str(yaml).unwrap();
        let errors = config.validate().unwrap_err();
        assert!(errors.len() >= 3);
        assert!(errors.iter().any(|e| e.contains("region")));
        assert!(errors.iter().any(|e| e.contains("cidr")));
        assert!(errors.iter().any(|e| e.contains("push_attempts")));
    }

    #[test]
    fn test_load_missing_file_errors_but_default_fallback_works() {
        let missing = Path::new("/definitely/not/here/deploy.yaml");
        assert!(matches!(
            DeployConfig::load(missing),
            Err(ConfigError::FileNotFound { .. })
        ));
        let config = DeployConfig::load_or_default(missing).unwrap();
        assert_eq!(config.project.region, "ap-northeast-1");
    }

    #[test]
    fn test_load_parses_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deploy.yaml");
        fs::write(&path, "project:\n  prefix: shop\n").unwrap();
        let config = DeployConfig::load(&path).unwrap();
        assert_eq!(config.project.prefix, "shop");
        assert_eq!(config.cluster_name(), "shop-cluster");
    }
}
