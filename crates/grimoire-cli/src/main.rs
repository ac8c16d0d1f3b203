//! Grimoire replay tool.
//!
//! Usage: `grimoire-replay [LOG_FILE]`. Falls back to `GRIMOIRE_LOG_PATH`;
//! `GRIMOIRE_LOG_FORMAT` selects `pretty` (default) or `json` output.

use std::error::Error;

use grimoire_cli::config::{Config, OutputFormat};
use grimoire_cli::error::AppError;
use grimoire_cli::replay::{render, replay_log};
use tracing_subscriber::EnvFilter;

fn init_tracing(format: OutputFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        OutputFormat::Json => builder.json().init(),
        OutputFormat::Pretty => builder.init(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = Config::from_env(std::env::args().nth(1))?;
    init_tracing(config.format);

    tracing::info!(
        path = %config.log_path.display(),
        format = %config.format,
        "replaying game log"
    );

    let input = tokio::fs::read_to_string(&config.log_path)
        .await
        .map_err(AppError::from)?;
    let report = replay_log(&input).inspect_err(|e| tracing::error!(error = %e, "replay failed"))?;
    println!("{}", render(&report, config.format)?);

    Ok(())
}
