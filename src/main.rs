use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod cycle;
mod diagnostics;
mod engine;
mod log;
mod models;
mod report;
mod roster;
mod store;
mod tracker;
mod window;

use config::Config;
use diagnostics::Diagnostics;

#[derive(Parser)]
#[command(name = "reviewer-stats")]
#[command(about = "Program committee statistics from HotCRP action logs", long_about = None)]
struct Cli {
    /// Multi-cycle configuration file
    #[arg(long, global = true, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the per-reviewer CSV report
    Report {
        /// Output file; stdout when omitted
        #[arg(long)]
        out: Option<PathBuf>,
        /// Only list members referenced by at least one log event
        #[arg(long)]
        active_only: bool,
    },
    /// Load every cycle and report warnings without writing a report
    Check,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("reviewer_stats=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let mut diagnostics = Diagnostics::new();

    let config = Config::load(&cli.config, &mut diagnostics)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    if let Some(name) = &config.conference_name {
        info!("processing {} cycles for {name}", config.cycles.len());
    }

    match cli.command {
        Commands::Report { out, active_only } => {
            let include_inactive = config.include_inactive && !active_only;
            let store = cycle::run(&config, include_inactive, &mut diagnostics)?;
            let records = store.into_records();

            match &out {
                Some(path) => {
                    let file = std::fs::File::create(path)
                        .with_context(|| format!("failed to create {}", path.display()))?;
                    report::write_report(file, &records)?;
                    info!("Report for {} reviewers written to {}.", records.len(), path.display());
                }
                None => report::write_report(std::io::stdout().lock(), &records)?,
            }
        }
        Commands::Check => {
            let store = cycle::run(&config, config.include_inactive, &mut diagnostics)?;
            info!(
                "Configuration ok: {} cycles, {} reviewers, {} warnings.",
                config.cycles.len(),
                store.len(),
                diagnostics.warnings().len()
            );
        }
    }

    if !diagnostics.is_empty() {
        diagnostics.flush();
    }

    Ok(())
}
