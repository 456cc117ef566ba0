pub mod chromium;
pub mod listing;

pub use chromium::{ChromiumInstance, ChromiumLauncher, ChromiumPage};
pub use listing::{ListingClient, LiveSource};

use harpy_core::{AppError, ExtractorConfig, Outcome, extract_with};

/// One-shot extraction against headless Chromium.
///
/// Builds the launcher from the configuration's launch profile, runs the
/// batch with retry, and tears the pool down before returning.
pub async fn extract(
    targets: &[String],
    config: ExtractorConfig,
) -> Result<Vec<Outcome>, AppError> {
    let launcher = ChromiumLauncher::new(config.launch.clone());
    extract_with(launcher, targets, config).await
}
