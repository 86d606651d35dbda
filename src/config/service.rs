//! Running service configuration: cluster, task sizing, and rollout policy.
//!
//! The rollout policy values are consumed by the orchestrator at
//! service-provisioning time; the pipeline carries them so `validate` can show
//! the policy a submitted deployment will be governed by.

use serde::{Deserialize, Serialize};

use super::validation::matches_pattern;

/// Orchestrated service and its rollout policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Cluster name (supports `{prefix}`)
    #[serde(default = "default_cluster")]
    pub cluster: String,

    /// Service name within the cluster
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Task definition family (supports `{prefix}`)
    #[serde(default = "default_task_family")]
    pub task_family: String,

    /// Log group receiving container logs (supports `{prefix}`)
    #[serde(default = "default_log_group")]
    pub log_group: String,

    /// Log stream prefix within the log group
    #[serde(default = "default_stream_prefix")]
    pub stream_prefix: String,

    /// Logical container name; also the `name` field of the emitted manifest
    #[serde(default = "default_container_name")]
    pub container_name: String,

    /// Container port exposed through the load balancer
    #[serde(default = "default_container_port")]
    pub container_port: u16,

    /// Task CPU units
    #[serde(default = "default_cpu")]
    pub cpu: u32,

    /// Task memory in MiB
    #[serde(default = "default_memory")]
    pub memory: u32,

    /// Number of task replicas the service keeps running
    #[serde(default = "default_desired_count")]
    pub desired_count: u32,

    /// Minimum healthy capacity during rollout, percent of desired count
    #[serde(default = "default_min_healthy_percent")]
    pub min_healthy_percent: u32,

    /// Maximum surge capacity during rollout, percent of desired count
    #[serde(default = "default_max_healthy_percent")]
    pub max_healthy_percent: u32,

    /// Automatic rollback when the new revision fails to stabilize
    #[serde(default = "default_circuit_breaker_rollback")]
    pub circuit_breaker_rollback: bool,

    /// Runtime platform version
    #[serde(default = "default_platform_version")]
    pub platform_version: String,

    /// Public load balancer name in front of the service
    #[serde(default = "default_load_balancer")]
    pub load_balancer: String,
}

fn default_cluster() -> String {
    "{prefix}-cluster".to_string()
}

fn default_service_name() -> String {
    "application-service".to_string()
}

fn default_task_family() -> String {
    "{prefix}-task-definition".to_string()
}

fn default_log_group() -> String {
    "/{prefix}-cluster".to_string()
}

fn default_stream_prefix() -> String {
    "application".to_string()
}

fn default_container_name() -> String {
    "application".to_string()
}

fn default_container_port() -> u16 {
    80
}

fn default_cpu() -> u32 {
    512
}

fn default_memory() -> u32 {
    1024
}

fn default_desired_count() -> u32 {
    1
}

fn default_min_healthy_percent() -> u32 {
    100
}

fn default_max_healthy_percent() -> u32 {
    200
}

fn default_circuit_breaker_rollback() -> bool {
    true
}

fn default_platform_version() -> String {
    "1.4.0".to_string()
}

fn default_load_balancer() -> String {
    "application-elb".to_string()
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            cluster: default_cluster(),
            name: default_service_name(),
            task_family: default_task_family(),
            log_group: default_log_group(),
            stream_prefix: default_stream_prefix(),
            container_name: default_container_name(),
            container_port: default_container_port(),
            cpu: default_cpu(),
            memory: default_memory(),
            desired_count: default_desired_count(),
            min_healthy_percent: default_min_healthy_percent(),
            max_healthy_percent: default_max_healthy_percent(),
            circuit_breaker_rollback: default_circuit_breaker_rollback(),
            platform_version: default_platform_version(),
            load_balancer: default_load_balancer(),
        }
    }
}

const VALID_CPU_UNITS: [u32; 5] = [256, 512, 1024, 2048, 4096];

impl ServiceConfig {
    pub fn validate(&self, errors: &mut Vec<String>) {
        if self.cluster.is_empty() || self.name.is_empty() || self.task_family.is_empty() {
            errors.push("service.cluster, service.name, and service.task_family are required".to_string());
        }
        // The manifest embeds this name via direct string formatting; restrict
        // it to characters that cannot break the JSON literal.
        if !matches_pattern(r"^[a-zA-Z][a-zA-Z0-9_-]*$", &self.container_name) {
            errors.push(format!(
                "service.container_name must match [a-zA-Z][a-zA-Z0-9_-]*, got: {}",
                self.container_name
            ));
        }
        if !VALID_CPU_UNITS.contains(&self.cpu) {
            errors.push(format!(
                "service.cpu must be one of {:?}, got {}",
                VALID_CPU_UNITS, self.cpu
            ));
        }
        if self.memory < 512 {
            errors.push(format!("service.memory must be at least 512 MiB, got {}", self.memory));
        }
        if self.desired_count == 0 {
            errors.push("service.desired_count must be at least 1".to_string());
        }
        if self.min_healthy_percent > 100 {
            errors.push(format!(
                "service.min_healthy_percent cannot exceed 100, got {}",
                self.min_healthy_percent
            ));
        }
        if self.max_healthy_percent <= 100 {
            errors.push(format!(
                "service.max_healthy_percent must exceed 100 to allow surge capacity, got {}",
                self.max_healthy_percent
            ));
        }
        if self.min_healthy_percent < 100 {
            eprintln!(
                "⚠️  service.min_healthy_percent below 100 permits a capacity dip during rollout"
            );
        }
        if self.memory / self.cpu.max(1) > 8 {
            eprintln!(
                "⚠️  service.memory {} MiB is an unusual pairing for {} CPU units",
                self.memory, self.cpu
            );
        }
    }
}
