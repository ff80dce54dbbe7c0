//! trackexport CLI - Work-item status history export
//!
//! Reads a project dump, aggregates the status history of its items into
//! daily counts, and writes the result as a spreadsheet or prints it.

mod config;
mod dump;
mod exit;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use trackexport_core::{DateRange, ExportReport, Renderer};
use trackexport_render::TextRenderer;

use crate::config::Config;
use crate::dump::ProjectDump;
use crate::exit::ExitCode;

#[derive(Parser)]
#[command(name = "trackexport")]
#[command(author, version, about = "Work-item status history export", long_about = None)]
struct Cli {
    /// Verbose output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command
#[derive(clap::Args)]
struct ReportArgs {
    /// Project dump (JSON)
    #[arg(long, value_name = "FILE")]
    dump: PathBuf,

    /// First day of the report (YYYY-MM-DD)
    #[arg(long, value_name = "DATE", requires = "to")]
    from: Option<NaiveDate>,

    /// Last day of the report (YYYY-MM-DD)
    #[arg(long, value_name = "DATE", requires = "from")]
    to: Option<NaiveDate>,

    /// Configuration file (TOML)
    #[arg(long, value_name = "FILE", env = "TRACKEXPORT_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Export the daily status report to an Excel workbook
    Export {
        #[command(flatten)]
        report: ReportArgs,

        /// Output file path
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        /// Leave out the Items sheet
        #[arg(long)]
        no_items: bool,
    },

    /// Print the daily status report
    Status {
        #[command(flatten)]
        report: ReportArgs,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = tokio::runtime::Runtime::new()
        .context("Failed to start async runtime")
        .and_then(|runtime| runtime.block_on(run(cli.command)));

    let code = match result {
        Ok(()) => ExitCode::Success,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::from_error(&error)
        }
    };
    tracing::debug!(code = code.code(), "exiting");
    code.into()
}

/// Log to stderr; `RUST_LOG` overrides the verbosity flag
fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

async fn run(command: Commands) -> Result<()> {
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling export");
            on_interrupt.cancel();
        }
    });

    match command {
        Commands::Export {
            report,
            output,
            no_items,
        } => cmd_export(&report, &output, no_items, &cancel).await,
        Commands::Status { report, format } => cmd_status(&report, format, &cancel).await,
    }
}

/// Build the report for the dump named in `args`
async fn build_report(
    args: &ReportArgs,
    config: &Config,
    with_items: bool,
    cancel: &CancellationToken,
) -> Result<ExportReport> {
    let engine = config.engine()?;
    let columns = config.status_columns()?;

    let range = match (args.from, args.to) {
        (Some(first), Some(last)) => Some(DateRange::new(first, last)?),
        _ => None,
    };

    let dump = ProjectDump::load(&args.dump)?;
    let items = dump.items();
    tracing::info!(project = %dump.project, items = items.len(), "loaded dump");

    let source = dump.source();
    let snapshots = engine
        .daily_report(&source, &items, range, cancel)
        .await
        .with_context(|| format!("Export of '{}' failed", dump.project))?;
    for item in &items {
        tracing::debug!(item = %item.id, polls = source.polls(&item.history_key), "history served");
    }

    let mut report = ExportReport::new(dump.project.clone(), snapshots).columns(columns);
    if with_items {
        report = report.with_items(dump.item_table()?);
    }
    Ok(report)
}

async fn cmd_export(
    args: &ReportArgs,
    output: &Path,
    no_items: bool,
    cancel: &CancellationToken,
) -> Result<()> {
    let config = Config::load(args.config.as_deref())?;
    let mut renderer = config.excel_renderer();
    if no_items {
        renderer = renderer.no_items();
    }

    let report = build_report(args, &config, renderer.include_items, cancel).await?;
    let bytes = renderer.render(&report)?;
    std::fs::write(output, bytes)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    tracing::info!(days = report.snapshots.len(), output = %output.display(), "export written");
    println!("Wrote {} days to {}", report.snapshots.len(), output.display());
    Ok(())
}

async fn cmd_status(args: &ReportArgs, format: Format, cancel: &CancellationToken) -> Result<()> {
    let config = Config::load(args.config.as_deref())?;
    let report = build_report(args, &config, false, cancel).await?;

    match format {
        Format::Text => print!("{}", TextRenderer::new().render(&report)?),
        Format::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}
