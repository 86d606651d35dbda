//! Container engine operations
//!
//! Drives the docker CLI for image build, tag, and push, and performs
//! registry login with short-lived authorization tokens fetched through the
//! platform CLI. Tokens arrive base64-wrapped as `user:password` and are
//! piped to `docker login --password-stdin`; nothing touches disk.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use crate::domain::image::ImageReference;
use crate::error::{BuildError, RegistryError};
use crate::tools::{get_tool_path, tools};

/// Registry and image operations required by the Build stage
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// Authenticate to the registry host with short-lived credentials
    async fn login(&self, registry_host: &str) -> Result<(), RegistryError>;

    /// Build an image from `context`, applying `env` to the build process
    async fn build(
        &self,
        context: &Path,
        image: &ImageReference,
        env: &[(String, String)],
    ) -> Result<(), BuildError>;

    /// Apply an additional tag to an already-built image
    async fn tag(&self, from: &ImageReference, to: &ImageReference) -> Result<(), BuildError>;

    /// Push one tag to the registry (single attempt)
    async fn push(&self, image: &ImageReference) -> Result<(), RegistryError>;
}

/// Production engine driving the docker CLI
pub struct DockerEngine {
    region: String,
}

impl DockerEngine {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
        }
    }

    async fn fetch_authorization_token(&self) -> Result<String, RegistryError> {
        let aws = get_tool_path(tools::AWS);
        let output = Command::new(&aws)
            .args([
                "ecr",
                "get-authorization-token",
                "--region",
                &self.region,
                "--query",
                "authorizationData[0].authorizationToken",
                "--output",
                "text",
            ])
            .output()
            .await
            .map_err(|e| RegistryError::TokenRequestFailed {
                message: format!("failed to run {}: {}", aws, e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RegistryError::TokenRequestFailed {
                message: stderr.trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[async_trait]
impl ContainerEngine for DockerEngine {
    async fn login(&self, registry_host: &str) -> Result<(), RegistryError> {
        let token = self.fetch_authorization_token().await?;
        let (username, password) = decode_authorization_token(&token)?;
        debug!("authorization token decoded for user {}", username);

        let docker = get_tool_path(tools::DOCKER);
        let mut child = Command::new(&docker)
            .args(["login", "--username", &username, "--password-stdin", registry_host])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| RegistryError::LoginFailed {
                registry: registry_host.to_string(),
                message: format!("failed to run {}: {}", docker, e),
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(password.as_bytes())
                .await
                .map_err(|e| RegistryError::LoginFailed {
                    registry: registry_host.to_string(),
                    message: e.to_string(),
                })?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| RegistryError::LoginFailed {
                registry: registry_host.to_string(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RegistryError::LoginFailed {
                registry: registry_host.to_string(),
                message: last_lines(&stderr, 5),
            });
        }

        info!("🔐 Logged in to {}", registry_host);
        Ok(())
    }

    async fn build(
        &self,
        context: &Path,
        image: &ImageReference,
        env: &[(String, String)],
    ) -> Result<(), BuildError> {
        info!("🔨 Building image {}", image);

        let mut cmd = Command::new(get_tool_path(tools::DOCKER));
        cmd.args(["build", "-t", &image.uri(), "."])
            .current_dir(context);
        for (key, value) in env {
            cmd.env(key, value);
        }

        let output = cmd
            .output()
            .await
            .map_err(|e| BuildError::EngineUnavailable {
                message: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("Cannot connect to the Docker daemon") {
                return Err(BuildError::EngineUnavailable {
                    message: last_lines(&stderr, 3),
                });
            }
            return Err(BuildError::ImageBuildFailed {
                message: last_lines(&stderr, 15),
            });
        }

        Ok(())
    }

    async fn tag(&self, from: &ImageReference, to: &ImageReference) -> Result<(), BuildError> {
        let output = Command::new(get_tool_path(tools::DOCKER))
            .args(["tag", &from.uri(), &to.uri()])
            .output()
            .await
            .map_err(|e| BuildError::EngineUnavailable {
                message: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BuildError::TagFailed {
                image: to.uri(),
                message: stderr.trim().to_string(),
            });
        }

        info!("🏷️  Tagged {}", to);
        Ok(())
    }

    async fn push(&self, image: &ImageReference) -> Result<(), RegistryError> {
        info!("📤 Pushing {}", image);

        let output = Command::new(get_tool_path(tools::DOCKER))
            .args(["push", &image.uri()])
            .output()
            .await
            .map_err(|e| RegistryError::PushFailed {
                attempts: 1,
                message: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RegistryError::PushFailed {
                attempts: 1,
                message: last_lines(&stderr, 10),
            });
        }

        Ok(())
    }
}

/// Host component of a registry repository URI
pub fn registry_host(repository_uri: &str) -> String {
    repository_uri
        .split('/')
        .next()
        .unwrap_or(repository_uri)
        .to_string()
}

/// Decode a base64 `user:password` authorization token
fn decode_authorization_token(token: &str) -> Result<(String, String), RegistryError> {
    let bytes = STANDARD
        .decode(token.trim())
        .map_err(|_| RegistryError::TokenMalformed)?;
    let decoded = String::from_utf8(bytes).map_err(|_| RegistryError::TokenMalformed)?;
    let (username, password) = decoded.split_once(':').ok_or(RegistryError::TokenMalformed)?;
    if username.is_empty() || password.is_empty() {
        return Err(RegistryError::TokenMalformed);
    }
    Ok((username.to_string(), password.to_string()))
}

/// Last `n` non-empty lines of command output, for error messages
fn last_lines(output: &str, n: usize) -> String {
    let lines: Vec<&str> = output
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n")
}
