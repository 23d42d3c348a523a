use anyhow::{Context, Result};
use clap::Parser;
use portal_recon::cli::{handle_command, Cli};
use portal_recon::error::PipelineError;
use std::fs::OpenOptions;
use std::process::ExitCode;
use tracing::error;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

fn init_logging(cli: &Cli) -> Result<()> {
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let json_layer = match &cli.log_json {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(path)
                .with_context(|| format!("Failed to open log file: {}", path.display()))?;
            Some(
                fmt::layer()
                    .json()
                    .with_writer(file)
                    .with_current_span(false)
                    .with_span_list(false),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(json_layer)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = init_logging(&cli) {
        eprintln!("{:#}", e);
        return ExitCode::from(2);
    }

    match handle_command(cli).await {
        Ok(reports) => match reports.iter().find(|r| r.is_total_failure()) {
            Some(report) => {
                error!("Every item failed in stage {}", report.stage);
                ExitCode::from(1)
            }
            None => ExitCode::SUCCESS,
        },
        Err(e) => {
            error!("{:#}", e);
            match e.downcast_ref::<PipelineError>() {
                Some(inner) if inner.is_config() => ExitCode::from(2),
                _ => ExitCode::from(1),
            }
        }
    }
}
