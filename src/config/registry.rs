//! Container registry configuration.

use serde::{Deserialize, Serialize};

use super::validation::matches_pattern;

/// Registry configuration for the built image
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Repository name (supports `{prefix}`)
    #[serde(default = "default_repository")]
    pub repository: String,

    /// Whether image tags may be overwritten. Rolling builds overwrite
    /// `latest` on every run, so this stays true.
    #[serde(default = "default_mutable_tags")]
    pub mutable_tags: bool,

    /// At-rest encryption algorithm for the repository
    #[serde(default = "default_encryption")]
    pub encryption: String,

    /// Full registry URI override. When unset, the URI is derived from the
    /// resolved account and the configured region.
    #[serde(default)]
    pub uri_override: Option<String>,
}

fn default_repository() -> String {
    "{prefix}-nginx".to_string()
}

fn default_mutable_tags() -> bool {
    true
}

fn default_encryption() -> String {
    "AES256".to_string()
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            repository: default_repository(),
            mutable_tags: default_mutable_tags(),
            encryption: default_encryption(),
            uri_override: None,
        }
    }
}

impl RegistryConfig {
    /// Registry URI for a resolved account and region:
    /// `{account}.dkr.ecr.{region}.amazonaws.com/{repository}`
    pub fn uri(&self, account: &str, region: &str, repository: &str) -> String {
        match &self.uri_override {
            Some(uri) => uri.clone(),
            None => format!("{}.dkr.ecr.{}.amazonaws.com/{}", account, region, repository),
        }
    }

    pub fn validate(&self, errors: &mut Vec<String>) {
        if self.repository.is_empty() {
            errors.push("registry.repository must not be empty".to_string());
        }
        if !self.mutable_tags {
            errors.push(
                "registry.mutable_tags must be true: every build overwrites the latest tag"
                    .to_string(),
            );
        }
        if let Some(uri) = &self.uri_override {
            if !matches_pattern(r"^[a-z0-9][a-z0-9.-]*(/[a-zA-Z0-9._-]+)+$", uri) {
                errors.push(format!(
                    "registry.uri_override does not look like a registry URI: {}",
                    uri
                ));
            }
        }
    }
}
