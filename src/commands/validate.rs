use std::path::Path;

use anyhow::Result;
use tracing::info;

use crate::config::DeployConfig;
use crate::tools::{missing_tools, tools};
use crate::ui;

/// Validate the delivery configuration and print the resolved topology
pub async fn execute(config_path: &Path) -> Result<()> {
    ui::print_header("Configuration Check");

    let config = if config_path.exists() {
        info!("📄 Loading {}", config_path.display());
        DeployConfig::load(config_path)?
    } else {
        info!("📄 {} not found, using built-in defaults", config_path.display());
        DeployConfig::default()
    };

    match config.validate() {
        Ok(()) => ui::print_success("Configuration is valid"),
        Err(errors) => {
            for error in &errors {
                ui::print_error(error);
            }
            anyhow::bail!("Configuration has {} error(s)", errors.len());
        }
    }

    println!();
    ui::print_kv("Prefix", &config.project.prefix);
    ui::print_kv("Region", &config.project.region);
    ui::print_kv("Repository", &config.source_repository());
    ui::print_kv("Branch", &config.pipeline.branch);
    let registry = match &config.project.account {
        Some(account) if !account.is_empty() => config.registry_uri(account),
        _ => format!(
            "<account>.dkr.ecr.{}.amazonaws.com/{}",
            config.project.region,
            config.repository_name()
        ),
    };
    ui::print_kv("Registry", &registry);
    ui::print_kv("Cluster", &config.cluster_name());
    ui::print_kv("Service", &config.service.name);
    ui::print_kv("Container", &config.service.container_name);
    ui::print_kv("Task family", &config.task_family());
    ui::print_kv("Log group", &config.log_group());
    ui::print_kv(
        "Network",
        &format!(
            "{} ({} AZs, /{} subnets, {} NAT gateways)",
            config.network.cidr,
            config.network.max_azs,
            config.network.subnet_mask,
            config.network.nat_gateways
        ),
    );
    ui::print_kv(
        "Rollout",
        &format!(
            "min {}% / max {}% healthy, circuit breaker {}",
            config.service.min_healthy_percent,
            config.service.max_healthy_percent,
            if config.service.circuit_breaker_rollback {
                "on"
            } else {
                "off"
            }
        ),
    );

    println!();
    let missing = missing_tools(&[tools::GIT, tools::DOCKER, tools::AWS]);
    if missing.is_empty() {
        ui::print_success("All required tools found (git, docker, aws)");
    } else {
        for tool in &missing {
            ui::print_warning(&format!("{} not found on PATH", tool));
        }
    }
    println!();

    Ok(())
}
