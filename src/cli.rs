// src/cli.rs
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::core::config_manager::DEFAULT_CONFIG_FILE;
use crate::core::ConfigManager;
use crate::discovery::QueryGenerator;
use crate::pipeline::Pipeline;
use crate::types::{Platform, StageReport};

#[derive(Parser)]
#[command(name = "portal-recon")]
#[command(about = "Discover job portals on recruiting platforms and scrape their listings")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Debug-level logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Also write JSON logs to this file
    #[arg(long, global = true, value_name = "FILE")]
    pub log_json: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the search queries generated for a platform
    Queries {
        #[arg(short = 's', long)]
        platform: Platform,
    },
    /// Run search queries and collect candidate portal links
    Collect {
        #[arg(short = 's', long)]
        platform: Platform,
    },
    /// Extract company portals from collected links
    Extract {
        #[arg(short = 's', long)]
        platform: Platform,
    },
    /// Scrape job listings from every extracted portal
    Scrape {
        #[arg(short = 's', long)]
        platform: Platform,
    },
    /// Merge all platforms' job lists into one filtered dataset
    Merge,
    /// Collect, extract and scrape a platform, then merge
    Run {
        #[arg(short = 's', long)]
        platform: Platform,
    },
}

/// A missing file at the default location means built-in defaults.
pub fn load_config(path: &Path) -> Result<ConfigManager> {
    if !path.exists() && path == Path::new(DEFAULT_CONFIG_FILE) {
        warn!(
            "{} not found, using built-in defaults",
            DEFAULT_CONFIG_FILE
        );
        return Ok(ConfigManager::default());
    }
    Ok(ConfigManager::load(path)?)
}

/// Run the requested command and return the reports of the stages it ran.
pub async fn handle_command(cli: Cli) -> Result<Vec<StageReport>> {
    let config = load_config(&cli.config)?;

    let reports = match cli.command {
        Command::Queries { platform } => {
            let queries = QueryGenerator::new(&config).queries(platform)?;
            info!("{} queries for {}", queries.len(), platform);
            for query in queries {
                println!("{}", query);
            }
            Vec::new()
        }
        Command::Collect { platform } => {
            vec![Pipeline::from_config(config)?.collect(platform).await?]
        }
        Command::Extract { platform } => {
            vec![Pipeline::from_config(config)?.extract(platform).await?]
        }
        Command::Scrape { platform } => {
            vec![Pipeline::from_config(config)?.scrape(platform).await?]
        }
        Command::Merge => vec![Pipeline::from_config(config)?.merge()?],
        Command::Run { platform } => Pipeline::from_config(config)?.run(platform).await?,
    };
    Ok(reports)
}
