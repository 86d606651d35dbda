use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use colored::Colorize;
use tracing::warn;

use crate::config::DeployConfig;
use crate::services::PipelineService;
use crate::tools::{missing_tools, tools};

/// Run the full delivery pipeline: Source, Build, Deployment
pub async fn execute(config_path: &Path) -> Result<()> {
    let config = DeployConfig::load_or_default(config_path)?;
    if let Err(errors) = config.validate() {
        anyhow::bail!("Invalid configuration:\n  - {}", errors.join("\n  - "));
    }

    let missing = missing_tools(&[tools::GIT, tools::DOCKER, tools::AWS]);
    if !missing.is_empty() {
        anyhow::bail!("Required tools not found on PATH: {}", missing.join(", "));
    }

    // Ctrl-C stops the run at the next stage boundary, never mid-stage
    let cancel = Arc::new(AtomicBool::new(false));
    let flag = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("🛑 Cancellation requested, stopping at the next stage boundary");
            flag.store(true, Ordering::SeqCst);
        }
    });

    let service = PipelineService::production(config);
    service.run(&cancel).await?;

    println!("{}", "✅ Delivery complete!".bright_green().bold());
    println!();

    Ok(())
}
