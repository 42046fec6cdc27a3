use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nice_autofill_cli::config::{default_config_path, AppConfig};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;

use crate::cli::{
    cmd_capture, cmd_config, cmd_detect, cmd_fetch, cmd_fill_evals, cmd_fill_plans, cmd_health,
    cmd_sample, cmd_students, CaptureArgs, CliContext, ConfigArgs, FetchArgs, FillArgs,
    OutputFormat, SampleArgs, StudentsArgs,
};

/// NICE autofill - bulk entry of monthly plans and evaluations into NEIS
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Enable debug mode
    #[arg(short, long)]
    debug: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "human")]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fill the monthly plan grid of the open NEIS tab
    FillPlans(FillArgs),

    /// Fill the monthly evaluation grid of the open NEIS tab
    FillEvals(FillArgs),

    /// Report which NEIS page the tab shows
    Detect,

    /// Save a JSON snapshot of the page structure
    Capture(CaptureArgs),

    /// Print sample records
    Sample(SampleArgs),

    /// List students from the companion website
    Students(StudentsArgs),

    /// Fetch a student's monthly plans from the companion website
    Fetch(FetchArgs),

    /// Check the companion website connection
    Health,

    /// Configuration management
    Config(ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level, cli.debug, cli.log_json)?;

    info!("Starting NICE autofill v{}", env!("CARGO_PKG_VERSION"));

    let config_path = match cli.config.clone() {
        Some(path) => path,
        None => default_config_path()?,
    };
    let mut config = AppConfig::load_file(&config_path).await?;
    config.apply_env_overrides();

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping after the current record");
            ctrl_c.cancel();
        }
    });

    let ctx = CliContext::new(config, config_path, cli.output, cancel);

    let result = match cli.command {
        Commands::FillPlans(args) => cmd_fill_plans(args, &ctx).await,
        Commands::FillEvals(args) => cmd_fill_evals(args, &ctx).await,
        Commands::Detect => cmd_detect(&ctx).await,
        Commands::Capture(args) => cmd_capture(args, &ctx).await,
        Commands::Sample(args) => cmd_sample(args),
        Commands::Students(args) => cmd_students(args, &ctx).await,
        Commands::Fetch(args) => cmd_fetch(args, &ctx).await,
        Commands::Health => cmd_health(&ctx).await,
        Commands::Config(args) => cmd_config(args, &ctx).await,
    };

    match result {
        Ok(()) => {
            info!("Command completed successfully");
            Ok(())
        }
        Err(e) => {
            error!("Command failed: {}", e);
            std::process::exit(1);
        }
    }
}

fn init_logging(level: &str, debug: bool, json: bool) -> Result<()> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string()));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}
