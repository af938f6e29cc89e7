use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use music_enrich::context::{RunConfig, RunContext};
use music_enrich::dataset::load_dataset;
use music_enrich::discovery::{discover_artists, CollectTask, DEFAULT_COUNTRIES, DEFAULT_GENRES};
use music_enrich::driver;
use music_enrich::progress::{create_spinner, init_logging, ProgressMode};
use music_enrich::spotify::SpotifyClient;

#[derive(Parser)]
#[command(name = "collect-artists")]
#[command(about = "Build an artist/track dataset from Spotify genre searches and chart playlists")]
struct Args {
    /// Output dataset
    #[arg(default_value = "artists_with_tracks.json")]
    output: PathBuf,

    /// Maximum number of artists to collect
    #[arg(long, default_value = "1000")]
    limit: usize,

    #[arg(long, env = "SPOTIFY_CLIENT_ID", hide_env_values = true)]
    client_id: String,

    #[arg(long, env = "SPOTIFY_CLIENT_SECRET", hide_env_values = true)]
    client_secret: String,

    /// Genres to search (comma-separated) [default: built-in list of 36]
    #[arg(long, value_delimiter = ',')]
    genres: Vec<String>,

    /// Chart markets (comma-separated country codes) [default: US,GB,DE,JP,KR,BR,FR,ES,IT]
    #[arg(long, value_delimiter = ',')]
    countries: Vec<String>,

    /// Continue filling an existing output dataset instead of discovering again
    #[arg(long)]
    resume: bool,

    /// Save the dataset after this many collected artists (0 = only at the end)
    #[arg(long, default_value = "10")]
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

fn or_defaults(values: Vec<String>, defaults: &[&str]) -> Vec<String> {
    if values.is_empty() {
        defaults.iter().map(|s| s.to_string()).collect()
    } else {
        values
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging();

    if args.output.exists() && !args.resume {
        bail!(
            "Output {:?} already exists; pass --resume to continue it or choose another path",
            args.output
        );
    }

    let mut ctx = RunContext::new(RunConfig {
        flush_interval: args.flush_every,
        timeout: Duration::from_secs(args.timeout_secs),
        progress: ProgressMode::from_log_only(args.log_only),
        ..RunConfig::default()
    });
    let mode = ctx.config.progress;

    let spinner = create_spinner("Authenticating with Spotify...", mode);
    let mut client = SpotifyClient::new(args.client_id, args.client_secret, ctx.config.timeout)
        .context("Failed to create Spotify client")?;
    client.authenticate()?;
    spinner.finish_and_clear();

    let artists = if args.resume && args.output.exists() {
        let artists = load_dataset(&args.output)
            .with_context(|| format!("Failed to load dataset {:?}", args.output))?;
        info!("Resuming {} artists from {:?}", artists.len(), args.output);
        artists
    } else {
        let genres = or_defaults(args.genres, &DEFAULT_GENRES);
        let countries = or_defaults(args.countries, &DEFAULT_COUNTRIES);
        discover_artists(&mut client, &genres, &countries, args.limit, mode)
    };
    println!("Collecting tracks for {} artists", artists.len());

    let mut task = CollectTask::new(artists, client, &args.output);
    let report = driver::run(&mut task, &mut ctx);

    report.stats.print_summary("Collection complete!");
    println!("  Artists: {}", task.artists().len());
    println!("  Tracks: {}", task.track_count());
    println!("  Average tracks per artist: {:.1}", task.average_tracks());
    println!("  Output: {:?}", task.output());

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
