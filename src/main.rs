//! fedcarrier CLI entry point

use anyhow::{Context, Result};
use clap::Parser;
use fedcarrier::config::cli::{Cli, Command};
use fedcarrier::config::toml::{merge_cli_with_config, parse_toml_file};
use fedcarrier::config::{validator, Config};
use fedcarrier::encryption::salthash;
use fedcarrier::output::{self, Report};
use fedcarrier::pipeline::{reconstruct_pipeline, Pipeline, PipelineDescription};
use fedcarrier::util::logging::init_tracing;
use fedcarrier::Analytics;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load and merge configuration
    let config = match &cli.config {
        Some(path) => parse_toml_file(path)?,
        None => Config::default(),
    };
    let config = merge_cli_with_config(&cli, config);

    init_tracing(&config.logging.level);

    validator::validate_config(&config).context("Configuration validation failed")?;
    debug!(?config, "Loaded configuration");

    let report = run(cli.command, &config)?;
    output::write_report(&report, &config.output)
}

/// Execute one command
fn run(command: Command, config: &Config) -> Result<Report> {
    if command.needs_peers() && config.peers.is_empty() {
        anyhow::bail!("No peers configured, pass a collaboration file with --config");
    }

    match command {
        Command::Hash { salt, input } => Ok(Report::Hash(salthash(&salt, &input)?)),
        Command::Sanitize { pipeline } => {
            let pipeline = load_pipeline(&pipeline)?;
            Ok(Report::Pipeline(pipeline.describe()))
        }
        command => run_analytics(command, config),
    }
}

/// Execute a command against the configured collaboration
fn run_analytics(command: Command, config: &Config) -> Result<Report> {
    let collaboration = config.collaboration()?;
    info!(peers = collaboration.num_peers(), "Loaded collaboration");

    let analytics = Analytics::new(collaboration, config.master.clone());
    let max_attempts = config.master.max_attempts;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("Failed to create tokio runtime")?;

    runtime.block_on(async {
        let report = match command {
            Command::ColumnNames { exclude } => {
                Report::ColumnNames(analytics.column_names(&exclude, max_attempts).await?)
            }
            Command::Correlation { keys } => {
                Report::Correlation(analytics.correlation_matrix(&keys, max_attempts).await?)
            }
            Command::Fit {
                pipeline,
                features,
                target,
                keys,
                ..
            } => {
                let mut pipeline = load_pipeline(&pipeline)?;
                let fit = analytics
                    .fit_model(&mut pipeline, &features, &target, &keys, max_attempts)
                    .await?;
                Report::Fit(fit)
            }
            Command::Hash { .. } | Command::Sanitize { .. } => {
                anyhow::bail!("Command does not run against peers")
            }
        };
        Ok::<_, anyhow::Error>(report)
    })
}

/// Read a pipeline description and rebuild it from allow-listed steps
fn load_pipeline(path: &Path) -> Result<Pipeline> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read pipeline file: {}", path.display()))?;

    let description: PipelineDescription = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse pipeline file: {}", path.display()))?;

    reconstruct_pipeline(&description)
        .with_context(|| format!("Rejected pipeline: {}", path.display()))
}
