use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use music_enrich::checkpoint::CheckpointStore;
use music_enrich::completion::RetryPolicy;
use music_enrich::context::{RunConfig, RunContext};
use music_enrich::dataset::load_dataset;
use music_enrich::driver;
use music_enrich::models::FailureTag;
use music_enrich::page::HttpPageDriver;
use music_enrich::playcount::PlaycountTask;
use music_enrich::progress::{init_logging, ProgressMode};
use music_enrich::work_unit::{track_ids, track_units};

#[derive(Parser)]
#[command(name = "fetch-playcounts")]
#[command(about = "Scrape per-track play counts into a resumable checkpoint file")]
struct Args {
    /// Input dataset (JSON array of artists with tracks)
    input: PathBuf,

    /// Checkpoint file mapping track id to play count or failure tag
    #[arg(long, default_value = "playcount.json")]
    checkpoint: PathBuf,

    /// Save the checkpoint after this many looked-up tracks (0 = only at the end)
    #[arg(long, default_value = "50")]
    flush_every: usize,

    /// Upper bound for page loads and the play counter wait, in seconds
    #[arg(long, default_value = "10")]
    timeout_secs: u64,

    /// Failure tags to look up again instead of keeping them (comma-separated)
    #[arg(long, value_delimiter = ',')]
    retry: Vec<FailureTag>,

    /// Disable progress bars, emit periodic log lines instead (for background runs)
    #[arg(long)]
    log_only: bool,

    /// Write run statistics to this JSON file
    #[arg(long)]
    stats_json: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging();

    let artists = load_dataset(&args.input)
        .with_context(|| format!("Failed to load dataset {:?}", args.input))?;
    let store = CheckpointStore::new(&args.checkpoint);
    let counts = store
        .load()
        .with_context(|| format!("Failed to load checkpoint {:?}", args.checkpoint))?;

    info!(
        "{} track ids ({} distinct), {} already in checkpoint",
        track_ids(&artists).len(),
        track_units(&artists).len(),
        counts.len()
    );

    let retry = RetryPolicy::retrying(args.retry.iter().copied());
    if !retry.is_sticky() {
        let tags: Vec<String> = retry.retry_tags().map(|t| t.to_string()).collect();
        info!("Retrying cached failures tagged: {}", tags.join(", "));
    }

    let mut ctx = RunContext::new(RunConfig {
        flush_interval: args.flush_every,
        timeout: Duration::from_secs(args.timeout_secs),
        progress: ProgressMode::from_log_only(args.log_only),
        retry,
    });

    let pages = HttpPageDriver::new(ctx.config.timeout);
    let mut task = PlaycountTask::new(&artists, store, counts, pages, &ctx.config);
    let report = driver::run(&mut task, &mut ctx);

    report.stats.print_summary("Play count scrape complete!");
    println!("  Cached at start: {}", task.cached_at_start());
    println!("  Checkpoint entries: {}", task.counts().len());
    println!("  Checkpoint: {:?}", args.checkpoint);

    if let Some(path) = &args.stats_json {
        report
            .stats
            .write_to_file(path)
            .with_context(|| format!("Failed to write stats to {:?}", path))?;
        println!("Stats written to: {:?}", path);
    }

    if let Some(e) = report.final_flush_error {
        return Err(e).context("Final checkpoint save failed");
    }

    Ok(())
}
