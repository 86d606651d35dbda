//! Build-time account identity resolution
//!
//! The registry URI embeds the account id, and the account is never
//! hardcoded: it comes from configuration, the ambient environment, or the
//! platform's caller-identity call, in that order.

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::RegistryError;
use crate::tools::{get_tool_path, tools};

/// Resolves the account the pipeline is acting as
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The 12-digit account id of the caller
    async fn account_id(&self) -> Result<String, RegistryError>;
}

/// Production identity provider driving the platform CLI
pub struct StsIdentity {
    region: String,
}

impl StsIdentity {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
        }
    }
}

#[async_trait]
impl IdentityProvider for StsIdentity {
    async fn account_id(&self) -> Result<String, RegistryError> {
        if let Ok(account) = std::env::var("AWS_ACCOUNT_ID") {
            if !account.is_empty() {
                debug!("account identity from AWS_ACCOUNT_ID");
                return validate_account(account);
            }
        }

        let aws = get_tool_path(tools::AWS);
        let output = Command::new(&aws)
            .args([
                "sts",
                "get-caller-identity",
                "--query",
                "Account",
                "--output",
                "text",
                "--region",
                &self.region,
            ])
            .output()
            .await
            .map_err(|e| RegistryError::IdentityFailed {
                message: format!("failed to run {}: {}", aws, e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RegistryError::IdentityFailed {
                message: stderr.trim().to_string(),
            });
        }

        let account = String::from_utf8_lossy(&output.stdout).trim().to_string();
        validate_account(account)
    }
}

fn validate_account(account: String) -> Result<String, RegistryError> {
    if account.len() == 12 && account.chars().all(|c| c.is_ascii_digit()) {
        Ok(account)
    } else {
        Err(RegistryError::IdentityFailed {
            message: format!("caller identity returned a non-account value: {}", account),
        })
    }
}
