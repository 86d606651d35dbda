use std::path::{Path, PathBuf};

use anyhow::Result;
use colored::Colorize;
use tracing::info;

use crate::config::DeployConfig;
use crate::error::BuildError;
use crate::infrastructure::source::GitSource;
use crate::services::PipelineService;
use crate::tools::{missing_tools, tools};
use crate::ui;

/// Build, tag, and push the image from an existing source tree.
///
/// Writes the image definitions manifest into the output directory so a
/// separate `deploy` invocation (or an external deploy job) can pick it up.
pub async fn execute(
    config_path: &Path,
    source_dir: String,
    output_dir: String,
    revision: Option<String>,
) -> Result<()> {
    let config = DeployConfig::load_or_default(config_path)?;
    if let Err(errors) = config.validate() {
        anyhow::bail!("Invalid configuration:\n  - {}", errors.join("\n  - "));
    }

    let missing = missing_tools(&[tools::DOCKER, tools::AWS]);
    if !missing.is_empty() {
        anyhow::bail!("Required tools not found on PATH: {}", missing.join(", "));
    }

    let source_path = PathBuf::from(&source_dir);
    if !source_path.is_dir() {
        anyhow::bail!("Source directory does not exist: {}", source_dir);
    }

    ui::print_header("Build Image");

    let revision = match revision {
        Some(revision) => revision,
        None => GitSource::new().resolve_revision(&source_path).await,
    };
    if revision.is_empty() {
        info!("⚠️  No revision id available, image tag falls back to latest");
    } else {
        info!("📦 Revision: {}", revision);
    }

    let manifest_file = config.pipeline.manifest_file.clone();
    let service = PipelineService::production(config);
    let (products, _) = service.execute_build(&source_path, &revision).await?;

    let output_path = PathBuf::from(&output_dir).join(&manifest_file);
    tokio::fs::write(&output_path, &products.manifest_content)
        .await
        .map_err(|e| BuildError::ManifestWriteFailed {
            message: format!("{}: {}", output_path.display(), e),
        })?;

    info!("📝 Manifest written to {}", output_path.display());
    info!("📦 Image: {}", products.image);
    println!();
    println!("{}", "✅ Build complete!".bright_green().bold());
    println!();

    Ok(())
}
