use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;
mod config;
mod domain;
mod error;
mod infrastructure;
mod services;
mod tools;
mod ui;

use cli::{Cli, Commands};
use commands::{build, deploy, run, validate};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging with LOGGING env var support
    // LOGGING=debug,info,warn,error or just LOGGING=debug
    let log_level = std::env::var("LOGGING")
        .or_else(|_| std::env::var("LOG_LEVEL"))
        .unwrap_or_else(|_| {
            if cli.verbose {
                "debug".to_string()
            } else {
                "info".to_string()
            }
        });

    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_ansi(false) // Disable ANSI escape codes for cleaner output
        .init();

    match cli.command {
        Commands::Run => run::execute(&cli.config).await,
        Commands::Build {
            source_dir,
            output_dir,
            revision,
        } => build::execute(&cli.config, source_dir, output_dir, revision).await,
        Commands::Deploy { manifest } => deploy::execute(&cli.config, manifest).await,
        Commands::Validate => validate::execute(&cli.config).await,
    }
}
