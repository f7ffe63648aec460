//! Sites Loader - push harvested site records into PostgreSQL

use anyhow::{Context, Result};
use clap::Parser;
use sites_common::logging::{init_logging, LogConfig, LogLevel};
use sites_loader::{config::LoaderConfig, db::DbConfig, pipeline, storage::DEFAULT_BATCH_SIZE};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "sites-loader")]
#[command(author, version, about = "Load harvested site records into PostgreSQL")]
struct Cli {
    /// PostgreSQL connection string (falls back to NEON_URL)
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: Option<String>,

    /// Input JSON file (default: db.json beside the executable)
    #[arg(short, long, env = "SITES_INPUT")]
    input: Option<PathBuf>,

    /// Rows per INSERT statement
    #[arg(short, long, env = "SITES_BATCH_SIZE", default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Read and normalize records without touching the database
    #[arg(long)]
    dry_run: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn log_config(&self) -> Result<LogConfig> {
        let log_level = if self.verbose {
            LogLevel::Debug
        } else {
            LogLevel::Info
        };

        // Environment variables take precedence over the flag
        LogConfig::builder()
            .level(log_level)
            .log_file_prefix("sites-loader")
            .build()
            .merge_env()
    }

    fn into_config(self) -> Result<LoaderConfig> {
        let database = self
            .database_url
            .map(DbConfig::new)
            .or_else(|| DbConfig::from_env().ok());

        let config = LoaderConfig {
            database,
            input_path: self.input.unwrap_or_else(|| LoaderConfig::default().input_path),
            batch_size: self.batch_size,
            dry_run: self.dry_run,
        };

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    // Before parsing, so `.env` feeds both clap's env fallbacks and LOG_*
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let _log_guard = init_logging(&cli.log_config()?)?;

    let config = cli.into_config().context("Invalid loader configuration")?;
    info!(
        input = %config.input_path.display(),
        batch_size = config.batch_size,
        dry_run = config.dry_run,
        "Starting sites loader"
    );

    match pipeline::run(&config).await {
        Ok(report) => {
            info!(rows = report.rows, origin = %report.origin, "Loader finished");
            println!("{}", report);
            Ok(ExitCode::SUCCESS)
        },
        Err(e) => {
            error!(error = %e, "Loader failed");
            eprintln!("Error: {}", e);
            Ok(ExitCode::FAILURE)
        },
    }
}
