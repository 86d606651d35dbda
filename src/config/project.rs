//! Project-level configuration: naming prefix and target cloud scope.

use serde::{Deserialize, Serialize};

use super::validation::matches_pattern;

/// Project identity and target scope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Resource name prefix applied to `{prefix}` patterns in other sections
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Target region
    #[serde(default = "default_region")]
    pub region: String,

    /// Target account id. When unset, the account is resolved at build time
    /// from the caller's identity.
    #[serde(default)]
    pub account: Option<String>,
}

fn default_prefix() -> String {
    "ecs-fargate-rolling-update".to_string()
}

fn default_region() -> String {
    "ap-northeast-1".to_string()
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            region: default_region(),
            account: None,
        }
    }
}

impl ProjectConfig {
    pub fn validate(&self, errors: &mut Vec<String>) {
        if self.prefix.is_empty() {
            errors.push("project.prefix must not be empty".to_string());
        }
        if !matches_pattern(r"^[a-z]{2}(-[a-z]+)+-\d$", &self.region) {
            errors.push(format!(
                "project.region does not look like a region: {}",
                self.region
            ));
        }
        if let Some(account) = &self.account {
            if !matches_pattern(r"^\d{12}$", account) {
                errors.push(format!(
                    "project.account must be a 12-digit account id, got: {}",
                    account
                ));
            }
        }
    }
}
