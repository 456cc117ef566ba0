/// Smoke-test for the Chromium engine end to end.
///
/// Launches a headless Chromium, points the extractor at a public HLS demo
/// player, and verifies a playlist URL is captured off the wire.
///
/// Run with:
///   cargo run -p harpy-client --example live_smoke
use std::time::Duration;

use harpy_client::ChromiumLauncher;
use harpy_core::{ExtractorConfig, LaunchProfile, extract_with};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let config = ExtractorConfig::default()
        .with_concurrency(1)
        .with_timeout(Duration::from_secs(20))
        .with_retries(0)
        .with_verbose(true);
    let launcher = ChromiumLauncher::new(LaunchProfile::default());

    let targets = vec!["https://hls-js.netlify.app/demo/".to_string()];
    println!("Extracting from {} …", targets[0]);

    let outcomes = extract_with(launcher, &targets, config).await?;
    let outcome = &outcomes[0];

    anyhow::ensure!(
        outcome.is_success(),
        "no playlist found: {:?}",
        outcome.error
    );
    println!(
        "OK — found {} in {}ms",
        outcome.resource_url.as_deref().unwrap_or_default(),
        outcome.elapsed_ms
    );
    Ok(())
}
