use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::config::DeployConfig;
use crate::domain::manifest::parse_image_definitions;
use crate::services::PipelineService;
use crate::tools::{missing_tools, tools};
use crate::ui;

/// Submit a rolling update from an existing image definitions manifest
pub async fn execute(config_path: &Path, manifest: String) -> Result<()> {
    let config = DeployConfig::load_or_default(config_path)?;
    if let Err(errors) = config.validate() {
        anyhow::bail!("Invalid configuration:\n  - {}", errors.join("\n  - "));
    }

    let missing = missing_tools(&[tools::AWS]);
    if !missing.is_empty() {
        anyhow::bail!("Required tools not found on PATH: {}", missing.join(", "));
    }

    ui::print_header("Rolling Update");

    let manifest_path = PathBuf::from(&manifest);
    let content = tokio::fs::read_to_string(&manifest_path)
        .await
        .with_context(|| format!("Failed to read manifest: {}", manifest_path.display()))?;
    let definitions = parse_image_definitions(&content)?;
    for definition in &definitions {
        info!("📦 {} -> {}", definition.name, definition.image_uri);
    }

    let service = PipelineService::production(config);

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    spinner.set_message("Submitting rolling update...");
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));

    // Use scopeguard so the spinner is cleared even when the submission errors
    let rollout = {
        let _guard = scopeguard::guard(spinner.clone(), |s| s.finish_and_clear());
        service.submit_deployment(&definitions).await
    }?;

    info!("🚀 Rollout submitted: {}", rollout.deployment_id);
    info!("📋 Task definition: {}", rollout.task_definition);
    info!("   The orchestrator drives the rollout from here");
    println!();
    println!("{}", "✅ Rolling update submitted!".bright_green().bold());
    println!();

    Ok(())
}
