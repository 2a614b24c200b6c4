//! # Verify Subcommand
//!
//! Runs chain verification over the whole log and prints `OK` or `FAIL`
//! with every discrepancy. Exit code 1 on any discrepancy.

use anyhow::Result;
use clap::Args;

use chainlog_core::{Confidence, VerificationReport};
use chainlog_store::ArchiveLog;

/// Arguments for the `chainlog verify` subcommand.
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Print the full report as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Execute the verify subcommand.
pub async fn run_verify(args: &VerifyArgs, log: &ArchiveLog) -> Result<u8> {
    let report = log.verify().await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_report(&report));
    }
    Ok(if report.is_valid() { 0 } else { 1 })
}

/// Human-readable verification summary, one line per finding.
pub fn render_report(report: &VerificationReport) -> String {
    let mut out = String::new();
    if report.is_valid() {
        out.push_str(&format!(
            "OK: chain integrity valid ({} entries)\n",
            report.entries_checked
        ));
    } else {
        out.push_str(&format!(
            "FAIL: {} discrepancies in {} entries, first at entry {}\n",
            report.discrepancies.len(),
            report.entries_checked,
            report.first_divergence().unwrap_or(0)
        ));
        for d in &report.discrepancies {
            out.push_str(&format!("  - {d}\n"));
        }
    }
    if let Confidence::LinkageOnly { unverified } = report.confidence {
        out.push_str(&format!(
            "WARNING: linkage-only for {unverified} entries without a retained link timestamp; their chain hashes were not recomputed\n"
        ));
    }
    out
}
