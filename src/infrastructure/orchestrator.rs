//! Deployment submission
//!
//! Points the running service at the image named in the manifest: read the
//! active task definition, substitute the container image, register the new
//! revision, and update the service. Rollout mechanics (health gating,
//! traffic shifting, automatic rollback) stay entirely with the orchestrator.

use async_trait::async_trait;
use serde_json::Value;
use tokio::process::Command;
use tracing::{debug, info};

use crate::domain::manifest::ImageDefinition;
use crate::error::DeploymentError;
use crate::tools::{get_tool_path, tools};

/// The running service a rolling update targets
#[derive(Debug, Clone)]
pub struct ServiceTarget {
    pub cluster: String,
    pub service: String,
    pub task_family: String,
}

/// Handle for a submitted rollout. Health state stays with the orchestrator;
/// this is only enough to find the rollout in its console or CLI.
#[derive(Debug, Clone)]
pub struct Rollout {
    pub deployment_id: String,
    pub task_definition: String,
}

/// Orchestrator interface: (service identifier, manifest) -> rollout handle
#[async_trait]
pub trait Orchestrator: Send + Sync {
    async fn submit_rolling_update(
        &self,
        target: &ServiceTarget,
        definitions: &[ImageDefinition],
    ) -> Result<Rollout, DeploymentError>;
}

/// Production orchestrator adapter driving the platform CLI
pub struct EcsOrchestrator {
    region: String,
}

impl EcsOrchestrator {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
        }
    }

    async fn describe_task_definition(&self, family: &str) -> Result<Value, DeploymentError> {
        let output = Command::new(get_tool_path(tools::AWS))
            .args([
                "ecs",
                "describe-task-definition",
                "--task-definition",
                family,
                "--region",
                &self.region,
                "--query",
                "taskDefinition",
                "--output",
                "json",
            ])
            .output()
            .await
            .map_err(|e| DeploymentError::SubmitFailed {
                message: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("Unable to describe task definition")
                || stderr.contains("ClientException")
            {
                return Err(DeploymentError::TaskDefinitionNotFound {
                    family: family.to_string(),
                });
            }
            return Err(DeploymentError::SubmitFailed {
                message: stderr.trim().to_string(),
            });
        }

        serde_json::from_slice(&output.stdout).map_err(|e| DeploymentError::SubmitFailed {
            message: format!("task definition is not valid JSON: {}", e),
        })
    }

    async fn register_task_definition(&self, payload: &str) -> Result<String, DeploymentError> {
        let output = Command::new(get_tool_path(tools::AWS))
            .args([
                "ecs",
                "register-task-definition",
                "--region",
                &self.region,
                "--cli-input-json",
                payload,
                "--query",
                "taskDefinition.taskDefinitionArn",
                "--output",
                "text",
            ])
            .output()
            .await
            .map_err(|e| DeploymentError::SubmitFailed {
                message: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DeploymentError::SubmitFailed {
                message: format!("register-task-definition: {}", stderr.trim()),
            });
        }

        let arn = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if arn.is_empty() {
            return Err(DeploymentError::SubmitFailed {
                message: "register-task-definition returned no ARN".to_string(),
            });
        }
        Ok(arn)
    }

    async fn update_service(
        &self,
        target: &ServiceTarget,
        task_definition: &str,
    ) -> Result<String, DeploymentError> {
        let output = Command::new(get_tool_path(tools::AWS))
            .args([
                "ecs",
                "update-service",
                "--region",
                &self.region,
                "--cluster",
                &target.cluster,
                "--service",
                &target.service,
                "--task-definition",
                task_definition,
                "--query",
                "service.deployments[0].id",
                "--output",
                "text",
            ])
            .output()
            .await
            .map_err(|e| DeploymentError::SubmitFailed {
                message: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("ServiceNotFoundException")
                || stderr.contains("ClusterNotFoundException")
            {
                return Err(DeploymentError::ServiceNotFound {
                    service: target.service.clone(),
                    cluster: target.cluster.clone(),
                });
            }
            return Err(DeploymentError::SubmitFailed {
                message: format!("update-service: {}", stderr.trim()),
            });
        }

        let deployment_id = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if deployment_id.is_empty() || deployment_id == "None" {
            return Err(DeploymentError::SubmitFailed {
                message: "update-service returned no deployment id".to_string(),
            });
        }
        Ok(deployment_id)
    }
}

#[async_trait]
impl Orchestrator for EcsOrchestrator {
    async fn submit_rolling_update(
        &self,
        target: &ServiceTarget,
        definitions: &[ImageDefinition],
    ) -> Result<Rollout, DeploymentError> {
        let task_def = self.describe_task_definition(&target.task_family).await?;
        let rewritten = rewrite_task_definition(task_def, definitions, &target.task_family)?;
        let payload =
            serde_json::to_string(&rewritten).map_err(|e| DeploymentError::SubmitFailed {
                message: e.to_string(),
            })?;

        let task_definition = self.register_task_definition(&payload).await?;
        debug!("registered task definition {}", task_definition);

        let deployment_id = self.update_service(target, &task_definition).await?;
        info!("🚀 Rolling update submitted: deployment {}", deployment_id);

        Ok(Rollout {
            deployment_id,
            task_definition,
        })
    }
}

/// Fields the register call refuses; the describe output carries them
const READ_ONLY_FIELDS: [&str; 7] = [
    "taskDefinitionArn",
    "revision",
    "status",
    "requiresAttributes",
    "compatibilities",
    "registeredAt",
    "registeredBy",
];

/// Produce the next task definition revision: same definition, new image for
/// each container named in the manifest
fn rewrite_task_definition(
    mut task_def: Value,
    definitions: &[ImageDefinition],
    family: &str,
) -> Result<Value, DeploymentError> {
    let containers = task_def
        .get_mut("containerDefinitions")
        .and_then(Value::as_array_mut)
        .ok_or_else(|| DeploymentError::SubmitFailed {
            message: "task definition has no containerDefinitions".to_string(),
        })?;

    for definition in definitions {
        let container = containers
            .iter_mut()
            .filter_map(Value::as_object_mut)
            .find(|c| c.get("name").and_then(Value::as_str) == Some(definition.name.as_str()))
            .ok_or_else(|| DeploymentError::ContainerNotFound {
                container: definition.name.clone(),
                family: family.to_string(),
            })?;
        container.insert("image".to_string(), Value::String(definition.image_uri.clone()));
    }

    if let Some(map) = task_def.as_object_mut() {
        for field in READ_ONLY_FIELDS {
            map.remove(field);
        }
    }
    Ok(task_def)
}
