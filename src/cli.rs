//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use harvester_core::DEFAULT_MAX_RETRIES;

/// Harvest content from sources that resist automated access.
///
/// Harvester scrapes a named source through a rendering backend, extracts
/// structured entities, and persists them with durable checkpoints. Runs
/// interrupted by CAPTCHA or blocking pause and resume on the next
/// invocation.
#[derive(Parser, Debug)]
#[command(name = "harvester")]
#[command(author, version, about)]
pub struct Args {
    /// Source to harvest (e.g. codeforces, aman, fourminutebooks)
    pub source: String,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Path to the SQLite database (overrides HARVESTER_DB)
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Maximum retry attempts for transient failures (0-10)
    #[arg(short = 'r', long, default_value_t = DEFAULT_MAX_RETRIES as u8, value_parser = clap::value_parser!(u8).range(0..=10))]
    pub max_retries: u8,

    /// Minimum delay between requests in milliseconds (overrides the source default, max 60000)
    #[arg(short = 'l', long, value_parser = clap::value_parser!(u64).range(0..=60000))]
    pub delay_ms: Option<u64>,

    /// Process at most this many URLs of the discovered set
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
}
