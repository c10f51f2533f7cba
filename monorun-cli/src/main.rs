//! Monorun CLI - feed numeric input through the monotonic run analysis pipeline

use std::io::Write;

use anyhow::{Context, Result};
use clap::Parser;
use monorun_cli::cli::{Cli, Commands};
use monorun_cli::commands::{run_pipeline, run_stream};
use monorun_cli::config::ConfigManager;
use monorun_cli::input::{parse_values, read_source};
use monorun_cli::output::{Format, render_batch, render_result};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over --log-level; logs go to stderr so stdout stays parseable
    let filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&cli.log_level))?;
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut manager = ConfigManager::resolve(cli.config.as_deref())?;
    manager.config_mut().apply(&cli.command.overrides());
    let config = manager.config().pipeline.clone();
    if let Some(path) = manager.path() {
        tracing::debug!(path = %path.display(), "configuration loaded");
    }

    let mut stdout = std::io::stdout().lock();
    match cli.command {
        Commands::Pipeline { input, json, .. } => {
            let values = parse_values(&read_source(input.as_deref())?)?;
            let format = Format::from_json_flag(json);
            for report in run_pipeline(&values, &config).await? {
                writeln!(stdout, "{}", render_batch(&report, format)?)?;
            }
        }
        Commands::Stream { input, json, .. } => {
            let values = parse_values(&read_source(input.as_deref())?)?;
            let result = run_stream(&values, &config).await?;
            writeln!(
                stdout,
                "{}",
                render_result(&result, &values, Format::from_json_flag(json))?
            )?;
        }
        Commands::Config => {
            write!(stdout, "{}", manager.config().to_toml()?)?;
        }
    }
    stdout.flush().context("failed to flush output")?;

    Ok(())
}
