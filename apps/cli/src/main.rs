//! # kitwise
//!
//! Command-line front end: reconcile a product catalog with user-authored
//! compositions, then decompose composite sales into component movements.
//!
//! ## Typical Session
//! ```text
//! kitwise unify --products catalogue.csv --compositions kits.json
//! kitwise price KIT-01 149,00
//! kitwise decompose --sales ventes-mars.csv --out report.json
//! kitwise status --components
//! kitwise export --out catalog.json
//! ```
//!
//! Logs go to stderr (`RUST_LOG` overrides the default filter); results go
//! to stdout.

mod commands;
mod config;
mod error;
mod ingest;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use commands::decompose::DecomposeArgs;
use commands::export::ExportArgs;
use commands::price::PriceArgs;
use commands::status::StatusArgs;
use commands::unify::UnifyArgs;
use config::AppConfig;

#[derive(Debug, Parser)]
#[command(name = "kitwise", version, about = "Catalog unification and composite sales decomposition")]
struct Cli {
    /// Config file (default: platform config dir / kitwise.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Trace-level logging; ignored when RUST_LOG is set
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Merge products and compositions into the unified catalog and store it
    Unify(UnifyArgs),
    /// Classify and decompose a sales export against the stored catalog
    Decompose(DecomposeArgs),
    /// Show the stored catalog
    Status(StatusArgs),
    /// Write the stored catalog document to a file
    Export(ExportArgs),
    /// Set the sell price of a composite
    Price(PriceArgs),
    /// Print the effective configuration
    Config {
        /// Also write it to the config file
        #[arg(long)]
        write: bool,
    },
}

/// Initialize the tracing subscriber on stderr.
fn init_tracing(verbose: u8) {
    let default_filter = match verbose {
        0 => "info,kitwise=debug,sqlx=warn",
        _ => "debug,kitwise=trace,sqlx=info",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = AppConfig::load(cli.config.clone()).context("Cannot load configuration")?;
    debug!(?config, "Configuration loaded");

    if let Command::Config { write } = cli.command {
        let text = toml::to_string_pretty(&config).context("Cannot encode configuration")?;
        print!("{}", text);
        if write {
            let path = config.save(cli.config.clone())?;
            println!("# written to {}", path.display());
        }
        return Ok(());
    }

    let store = commands::open_store(&config).await?;
    let pretty = config.output.pretty;

    match &cli.command {
        Command::Unify(args) => {
            let summary = commands::unify::execute(args, &store).await?;
            commands::unify::print(&summary);
        }
        Command::Decompose(args) => {
            let summary =
                commands::decompose::execute(args, &store, &config.pipeline_options(), pretty).await?;
            commands::decompose::print(&summary);
        }
        Command::Status(args) => {
            let summary =
                commands::status::execute(args, &store, store.backend_name(), config.tax_rate()).await?;
            commands::status::print(&summary);
        }
        Command::Export(args) => {
            let catalog = commands::export::execute(args, &store, pretty).await?;
            commands::export::print(args, &catalog);
        }
        Command::Price(args) => {
            let change = commands::price::execute(args, &store).await?;
            commands::price::print(&change);
        }
        Command::Config { .. } => {}
    }

    Ok(())
}
