use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use harpy_client::{ChromiumLauncher, ListingClient, LiveSource};
use harpy_core::{Extractor, ExtractorConfig, ExtractorStats, LaunchProfile, Outcome};

#[derive(Parser)]
#[command(name = "harpy", version, about = "HLS playlist extractor driving a headless browser")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract playlist URLs from the given embed pages
    Extract {
        /// Target page URLs
        targets: Vec<String>,

        /// File with one target URL per line ('#' lines are comments)
        #[arg(short, long)]
        input: Option<PathBuf>,

        #[command(flatten)]
        extraction: ExtractionArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Discover live matches from a listing service and extract their streams
    Live {
        /// Base URL of the listing service
        #[arg(long, env = "HARPY_API_BASE", default_value = "https://streamed.pk")]
        api_base: String,

        #[command(flatten)]
        extraction: ExtractionArgs,

        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(Args)]
struct ExtractionArgs {
    /// Per-page deadline in milliseconds
    #[arg(long, default_value_t = 20_000)]
    timeout_ms: u64,

    /// Number of parallel browser instances
    #[arg(short, long, default_value_t = 10)]
    concurrency: usize,

    /// Extra full passes over failed targets
    #[arg(short, long, default_value_t = 1)]
    retries: u32,

    /// URL pattern (regex, case-insensitive); repeatable, replaces the defaults
    #[arg(long = "pattern")]
    patterns: Vec<String>,

    /// Browser binary to use instead of auto-discovery
    #[arg(long, env = "CHROME_BIN")]
    chrome: Option<PathBuf>,

    /// Run the browser with a visible window
    #[arg(long, default_value_t = false)]
    headful: bool,

    /// Per-window progress logging
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

#[derive(Args)]
struct OutputArgs {
    /// Print outcomes as JSON instead of the human report
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Write successful streams to an M3U playlist file
    #[arg(long)]
    playlist: Option<PathBuf>,
}

impl ExtractionArgs {
    fn to_config(&self) -> ExtractorConfig {
        let mut launch = LaunchProfile::default().with_headless(!self.headful);
        if let Some(chrome) = &self.chrome {
            launch = launch.with_executable(chrome);
        }

        let mut config = ExtractorConfig::default()
            .with_timeout(Duration::from_millis(self.timeout_ms))
            .with_concurrency(self.concurrency)
            .with_retries(self.retries)
            .with_verbose(self.verbose)
            .with_launch(launch);
        if !self.patterns.is_empty() {
            config = config.with_patterns(self.patterns.clone());
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let level = match &cli.command {
        Commands::Extract { extraction, .. } | Commands::Live { extraction, .. }
            if extraction.verbose =>
        {
            "debug"
        }
        _ => "info",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(format!("harpy_core={level}").parse()?)
                .add_directive(format!("harpy_client={level}").parse()?),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Extract {
            targets,
            input,
            extraction,
            output,
        } => {
            let mut targets = targets;
            if let Some(path) = input {
                targets.extend(read_targets(&path)?);
            }
            anyhow::ensure!(!targets.is_empty(), "no targets given (arguments or --input)");
            cmd_extract(targets, &extraction, &output).await?;
        }
        Commands::Live {
            api_base,
            extraction,
            output,
        } => {
            cmd_live(&api_base, &extraction, &output).await?;
        }
    }

    Ok(())
}

/// One URL per line; blank lines and '#' comments are skipped.
fn read_targets(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read target list: {}", path.display()))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect())
}

async fn cmd_extract(
    targets: Vec<String>,
    extraction: &ExtractionArgs,
    output: &OutputArgs,
) -> Result<()> {
    let (outcomes, stats) = run_extraction(&targets, extraction).await?;

    if output.json {
        println!("{}", serde_json::to_string_pretty(&outcomes)?);
    } else {
        print_report(&outcomes, &stats, |outcome| outcome.target_url.clone());
    }

    if let Some(path) = &output.playlist {
        let entries: Vec<(String, String)> = outcomes
            .iter()
            .filter_map(|o| o.resource_url.clone().map(|url| (o.target_url.clone(), url)))
            .collect();
        write_playlist(path, &entries)?;
        tracing::info!(count = entries.len(), path = %path.display(), "Playlist written");
    }

    Ok(())
}

async fn cmd_live(api_base: &str, extraction: &ExtractionArgs, output: &OutputArgs) -> Result<()> {
    let listing = ListingClient::new(api_base).map_err(|e| anyhow::anyhow!(e))?;
    let sources = listing.live_sources().await.map_err(|e| anyhow::anyhow!(e))?;

    if sources.is_empty() {
        println!("No live sources found.");
        return Ok(());
    }

    let targets: Vec<String> = sources.iter().map(|s| s.embed_url.clone()).collect();
    let (outcomes, stats) = run_extraction(&targets, extraction).await?;

    if output.json {
        let report: Vec<serde_json::Value> = outcomes
            .iter()
            .zip(&sources)
            .map(|(outcome, source)| {
                serde_json::json!({
                    "match": source.match_title,
                    "source": source.source,
                    "sourceId": source.source_id,
                    "category": source.category,
                    "outcome": outcome,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&outcomes, &stats, |outcome| {
            sources
                .iter()
                .find(|s| s.embed_url == outcome.target_url)
                .map(|s| format!("{} ({}/{})", s.match_title, s.source, s.source_id))
                .unwrap_or_else(|| outcome.target_url.clone())
        });
    }

    if let Some(path) = &output.playlist {
        let entries: Vec<(String, String)> = outcomes
            .iter()
            .zip(&sources)
            .filter_map(|(outcome, source)| {
                outcome
                    .resource_url
                    .clone()
                    .map(|url| (playlist_title(source), url))
            })
            .collect();
        write_playlist(path, &entries)?;
        tracing::info!(count = entries.len(), path = %path.display(), "Playlist written");
    }

    Ok(())
}

/// Drives the extractor and returns the outcomes plus a stats snapshot
/// taken before teardown.
async fn run_extraction(
    targets: &[String],
    extraction: &ExtractionArgs,
) -> Result<(Vec<Outcome>, ExtractorStats)> {
    let config = extraction.to_config();
    let launcher = ChromiumLauncher::new(config.launch.clone());

    let mut extractor = Extractor::new(launcher, config).map_err(|e| anyhow::anyhow!(e))?;
    let result = extractor.extract_with_retry(targets).await;
    let stats = extractor.stats();
    extractor.close().await;

    let outcomes = result.map_err(|e| anyhow::anyhow!(e))?;
    Ok((outcomes, stats))
}

fn print_report(
    outcomes: &[Outcome],
    stats: &ExtractorStats,
    label: impl Fn(&Outcome) -> String,
) {
    let successful: Vec<&Outcome> = outcomes.iter().filter(|o| o.is_success()).collect();
    let failed: Vec<&Outcome> = outcomes.iter().filter(|o| !o.is_success()).collect();

    println!("Successful: {}", successful.len());
    println!("Failed:     {}\n", failed.len());

    for outcome in &successful {
        println!("{}", label(outcome));
        println!(
            "  {}  ({:.2}s)",
            outcome.resource_url.as_deref().unwrap_or_default(),
            outcome.elapsed_ms as f64 / 1000.0
        );
    }
    if !failed.is_empty() {
        println!();
        for outcome in &failed {
            println!(
                "FAILED {}: {}",
                label(outcome),
                outcome.error.as_deref().unwrap_or_default()
            );
        }
    }

    if stats.successful + stats.failed > 0 {
        println!(
            "\nAttempts: {} ok / {} failed, avg {:.2}s per success",
            stats.successful,
            stats.failed,
            stats.average_time_ms / 1000.0
        );
    }
}

fn playlist_title(source: &LiveSource) -> String {
    format!("{} [{}]", source.match_title, source.category)
}

/// Extended-M3U playlist with one entry per discovered stream.
fn write_playlist(path: &Path, entries: &[(String, String)]) -> Result<()> {
    let mut out = String::from("#EXTM3U\n");
    out.push_str(&format!(
        "# Generated by harpy on {}\n",
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    ));
    for (title, url) in entries {
        out.push_str(&format!("#EXTINF:-1,{title}\n{url}\n"));
    }
    std::fs::write(path, out)
        .with_context(|| format!("Failed to write playlist: {}", path.display()))
}
