//! CLI definitions for gantry
//!
//! This module contains all CLI argument parsing structures using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "gantry",
    version,
    about = "Rolling-update delivery pipeline for containerized services",
    long_about = "Fetches a branch head, builds and pushes the container image,\nand submits a rolling update to the service orchestrator."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the delivery configuration file
    #[arg(short, long, global = true, env = "GANTRY_CONFIG", default_value = "deploy.yaml")]
    pub config: PathBuf,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full delivery pipeline (source, build, deployment)
    Run,

    /// Build, tag, and push the image from an existing source tree
    Build {
        /// Directory containing the Dockerfile
        #[arg(long, default_value = ".")]
        source_dir: String,

        /// Directory to write the image definitions manifest into
        #[arg(long, default_value = ".")]
        output_dir: String,

        /// Revision id for the short image tag (defaults to the tree's HEAD)
        #[arg(long)]
        revision: Option<String>,
    },

    /// Submit a rolling update from an existing manifest
    Deploy {
        /// Path to the image definitions manifest
        #[arg(long, default_value = "imagedefinitions.json")]
        manifest: String,
    },

    /// Validate configuration and print the resolved topology
    Validate,
}
