use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use music_enrich::context::{RunConfig, RunContext};
use music_enrich::dataset::{count_tracks, load_dataset};
use music_enrich::driver;
use music_enrich::genius::GeniusClient;
use music_enrich::metadata::MetadataTask;
use music_enrich::progress::{init_logging, ProgressMode};
use music_enrich::safety::{default_output_path, validate_output_path};
use music_enrich::work_unit::track_units;

#[derive(Parser)]
#[command(name = "enrich-tracks")]
#[command(about = "Enrich a track dataset with song metadata, resuming where the last run stopped")]
struct Args {
    /// Input dataset (JSON array of artists with tracks)
    input: PathBuf,

    /// Output dataset [default: <input>_enriched.json]
    output: Option<PathBuf>,

    /// Write enrichment back into the input file
    #[arg(long)]
    in_place: bool,

    /// Genius API access token
    #[arg(long, env = "GENIUS_ACCESS_TOKEN", hide_env_values = true)]
    token: String,

    /// Save the dataset after this many looked-up tracks (0 = only at the end)
    #[arg(long, default_value = "100")]
    flush_every: usize,

    /// Upper bound for each API request, in seconds
    #[arg(long, default_value = "10")]
    timeout_secs: u64,

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

    let output = match (&args.output, args.in_place) {
        (Some(path), _) => path.clone(),
        (None, true) => args.input.clone(),
        (None, false) => default_output_path(&args.input),
    };
    validate_output_path(&output, &[args.input.as_path()], args.in_place)?;

    // A previous run's output is the checkpoint
    let resume_from = if output != args.input && output.exists() {
        &output
    } else {
        &args.input
    };
    println!("Loading dataset: {:?}", resume_from);
    let artists = load_dataset(resume_from)
        .with_context(|| format!("Failed to load dataset {:?}", resume_from))?;
    info!(
        "{} artists, {} tracks, {} distinct track ids",
        artists.len(),
        count_tracks(&artists),
        track_units(&artists).len()
    );

    let mut ctx = RunContext::new(RunConfig {
        flush_interval: args.flush_every,
        timeout: Duration::from_secs(args.timeout_secs),
        progress: ProgressMode::from_log_only(args.log_only),
        ..RunConfig::default()
    });
    let client = GeniusClient::new(args.token, ctx.config.timeout)
        .context("Failed to create Genius client")?;

    println!("Writing enriched dataset to: {:?}", output);
    let mut task = MetadataTask::new(artists, client, &output);
    let report = driver::run(&mut task, &mut ctx);

    report.stats.print_summary("Enrichment complete!");

    if let Some(path) = &args.stats_json {
        report
            .stats
            .write_to_file(path)
            .with_context(|| format!("Failed to write stats to {:?}", path))?;
        println!("Stats written to: {:?}", path);
    }

    if let Some(e) = report.final_flush_error {
        return Err(e).context("Final dataset save failed");
    }

    Ok(())
}
