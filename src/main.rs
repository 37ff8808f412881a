//! CLI entry point for the harvester tool.

use anyhow::Result;
use clap::Parser;
use harvester_core::{Config, Database, JobStatus, SourcePipeline, find_source};
use tracing::{debug, info, warn};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Determine log level based on verbose/quiet flags
    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    // Logs go to stderr; stdout carries only the run summary JSON
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let spec = find_source(&args.source).ok_or_else(|| {
        let known: Vec<&str> = harvester_core::SOURCES.iter().map(|s| s.name).collect();
        anyhow::anyhow!(
            "unknown source '{}' (known sources: {})",
            args.source,
            known.join(", ")
        )
    })?;

    let mut config = Config::from_env();
    config.max_retries = u32::from(args.max_retries);
    if let Some(db) = args.db {
        config.db_path = db;
    }

    let mut profile = config.source_profile(spec.name, spec.default_delay_ms);
    if let Some(delay_ms) = args.delay_ms {
        profile.delay = std::time::Duration::from_millis(delay_ms);
    }

    info!(source = spec.name, db = %config.db_path.display(), "Harvester starting");

    let db = Database::new(&config.db_path).await?;
    let pipeline = SourcePipeline::new(db.clone(), &config);

    let summary = pipeline.run(spec.name, &profile, args.limit).await?;

    match summary.status {
        JobStatus::PausedCaptcha | JobStatus::PausedBlocked => {
            warn!(
                job_id = summary.job_id,
                reason = summary.paused_reason.map(|r| r.as_str()).unwrap_or(""),
                "Run paused; resolve the notification and re-run to resume"
            );
        }
        status => {
            info!(
                job_id = summary.job_id,
                processed = summary.processed,
                failed = summary.failed,
                %status,
                "Run finished"
            );
        }
    }

    // Machine-readable summary on stdout
    println!("{}", serde_json::to_string_pretty(&summary)?);

    db.close().await;
    Ok(())
}
