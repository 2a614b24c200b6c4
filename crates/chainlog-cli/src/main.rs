//! # chainlog CLI entry point
//!
//! Parses command-line arguments, opens the archive log, and dispatches to
//! subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use chainlog_cli::archive::{run_archive, ArchiveArgs};
use chainlog_cli::inspect::{run_list, run_show, ListArgs, ShowArgs};
use chainlog_cli::metadata::{run_pin, run_tag, PinArgs, TagArgs};
use chainlog_cli::open_log;
use chainlog_cli::verify::{run_verify, VerifyArgs};

/// Tamper-evident archive log.
///
/// Every archived file is appended to a single SHA-256 hash chain; any
/// later modification, reordering, or deletion is detectable by `verify`.
#[derive(Parser, Debug)]
#[command(name = "chainlog", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Archive database path. Overrides CHAINLOG_DB_PATH.
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Hash a file and append it to the chain.
    Archive(ArchiveArgs),

    /// Verify the integrity of the whole chain.
    Verify(VerifyArgs),

    /// List entries, newest first.
    List(ListArgs),

    /// Show one entry in full.
    Show(ShowArgs),

    /// Attach an external pin locator to an entry.
    Pin(PinArgs),

    /// Replace the tags of an entry.
    Tag(TagArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<u8> {
    let log = open_log(cli.db).await?;

    let result = match &cli.command {
        Commands::Archive(args) => run_archive(args, &log).await,
        Commands::Verify(args) => run_verify(args, &log).await,
        Commands::List(args) => run_list(args, &log).await,
        Commands::Show(args) => run_show(args, &log).await,
        Commands::Pin(args) => run_pin(args, &log).await,
        Commands::Tag(args) => run_tag(args, &log).await,
    };

    log.close().await;
    result
}
