use std::collections::HashMap;
use std::time::Instant;

use futures::{StreamExt, future};

use crate::config::ExtractorConfig;
use crate::error::AppError;
use crate::models::Outcome;
use crate::pattern::PatternSet;
use crate::pool::ContextPool;
use crate::stats::{ExtractorStats, StatsRecorder};
use crate::traits::{BrowserInstance, BrowserPage, EngineLauncher};

/// Fixed failure message for the common no-match case.
pub const NO_MATCH_ERROR: &str = "no matching playlist URL observed before the deadline";

type InstanceOf<E> = <E as EngineLauncher>::Instance;
type PageOf<E> = <InstanceOf<E> as BrowserInstance>::Page;

/// Orchestrates manifest extraction: pool, navigate, observe, race, retry.
///
/// Generic over the browser engine via [`EngineLauncher`], enabling
/// dependency injection and testability without a real browser. One
/// extractor owns one context pool and one set of running statistics;
/// batches may be issued repeatedly against the same pool.
pub struct Extractor<E: EngineLauncher> {
    launcher: E,
    config: ExtractorConfig,
    patterns: PatternSet,
    pool: ContextPool<InstanceOf<E>>,
    stats: StatsRecorder,
}

impl<E: EngineLauncher> Extractor<E> {
    /// Validate the configuration, compile its patterns, and build an
    /// extractor with an empty pool. No browser is touched yet.
    pub fn new(launcher: E, config: ExtractorConfig) -> Result<Self, AppError> {
        config.validate()?;
        let patterns = PatternSet::compile(&config.patterns)?;
        Ok(Self {
            launcher,
            config,
            patterns,
            pool: ContextPool::new(),
            stats: StatsRecorder::new(),
        })
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Bring up the context pool. Reuses an already-initialized pool.
    pub async fn initialize(&mut self) -> Result<(), AppError> {
        self.pool
            .initialize(&self.launcher, self.config.concurrency)
            .await
    }

    /// Tear down the context pool. Safe to call repeatedly; the next batch
    /// re-initializes from scratch.
    pub async fn close(&mut self) {
        self.pool.close().await;
    }

    /// Snapshot of the running counters.
    pub fn stats(&self) -> ExtractorStats {
        self.stats.snapshot()
    }

    pub fn reset_stats(&self) {
        self.stats.reset();
    }

    /// Run one extraction attempt on a borrowed context.
    ///
    /// Never errors: every failure is captured in the returned outcome so a
    /// bad target page cannot abort its siblings. Updates the shared
    /// counters exactly once.
    pub async fn extract_one(&self, target: &str, context: &InstanceOf<E>) -> Outcome {
        let started = Instant::now();

        let page = match context.new_page().await {
            Ok(page) => page,
            Err(e) => {
                tracing::debug!(target_url = %target, error = %e, "Failed to open page");
                self.stats.record_failure();
                return Outcome::failed(target, started.elapsed(), e.to_string());
            }
        };

        let resolution = self.race_first_match(&page, target).await;
        let elapsed = started.elapsed();

        // Release the page on every path; a close failure must not mask the
        // real outcome.
        if let Err(e) = page.close().await {
            tracing::warn!(target_url = %target, error = %e, "Failed to close page");
        }

        match resolution {
            Ok(Some(resource_url)) => {
                tracing::debug!(
                    target_url = %target,
                    resource_url = %resource_url,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Manifest found"
                );
                self.stats.record_success(elapsed);
                Outcome::found(target, resource_url, elapsed)
            }
            Ok(None) => {
                tracing::debug!(target_url = %target, "No manifest before deadline");
                self.stats.record_failure();
                Outcome::failed(target, elapsed, NO_MATCH_ERROR)
            }
            Err(e) => {
                tracing::debug!(target_url = %target, error = %e, "Extraction attempt failed");
                self.stats.record_failure();
                Outcome::failed(target, elapsed, e.to_string())
            }
        }
    }

    /// The core race: the first matching response wins, else the deadline.
    ///
    /// `Ok(Some(url))` is a match before the deadline, `Ok(None)` the
    /// deadline, `Err` an observer that could not be installed.
    async fn race_first_match(
        &self,
        page: &PageOf<E>,
        target: &str,
    ) -> Result<Option<String>, AppError> {
        // Subscribe before navigating so an early response is not missed.
        let mut responses = page.responses().await?;

        let deadline = tokio::time::sleep(self.config.timeout);
        tokio::pin!(deadline);

        let navigation = page.navigate(target, self.config.timeout);
        tokio::pin!(navigation);
        let mut navigating = true;

        loop {
            tokio::select! {
                Some(url) = responses.next() => {
                    if self.patterns.is_match(&url) {
                        return Ok(Some(url));
                    }
                }
                // Navigation settling, failing, or timing out is not a
                // resolution by itself: a slow or broken page can still
                // surface the manifest before the deadline.
                result = &mut navigation, if navigating => {
                    navigating = false;
                    if let Err(e) = result {
                        tracing::debug!(target_url = %target, error = %e, "Navigation did not settle");
                    }
                }
                () = &mut deadline => return Ok(None),
            }
        }
    }

    /// Extract every target, in windows of pool size run back to back.
    ///
    /// The returned list matches the input in length and order. An error
    /// means the pool could not be established; per-target failures are
    /// carried inside the outcomes instead.
    pub async fn extract_batch(&mut self, targets: &[String]) -> Result<Vec<Outcome>, AppError> {
        self.initialize().await?;

        let window_size = self.pool.len();
        let total_windows = targets.len().div_ceil(window_size);
        let verbose = self.config.verbose;
        let mut outcomes = Vec::with_capacity(targets.len());

        for (window_index, window) in targets.chunks(window_size).enumerate() {
            let window_started = Instant::now();
            if verbose {
                tracing::info!(
                    window = window_index + 1,
                    total_windows,
                    size = window.len(),
                    "Processing window"
                );
            } else {
                tracing::debug!(
                    window = window_index + 1,
                    total_windows,
                    size = window.len(),
                    "Processing window"
                );
            }

            let window_outcomes = future::join_all(
                window
                    .iter()
                    .enumerate()
                    .map(|(offset, target)| self.extract_one(target, self.pool.slot(offset))),
            )
            .await;

            let succeeded = window_outcomes.iter().filter(|o| o.is_success()).count();
            let elapsed_ms = window_started.elapsed().as_millis() as u64;
            if verbose {
                tracing::info!(
                    window = window_index + 1,
                    succeeded,
                    size = window.len(),
                    elapsed_ms,
                    "Window complete"
                );
            } else {
                tracing::debug!(
                    window = window_index + 1,
                    succeeded,
                    size = window.len(),
                    elapsed_ms,
                    "Window complete"
                );
            }

            outcomes.extend(window_outcomes);
        }

        Ok(outcomes)
    }

    /// Extract every target, then re-run still-failing targets for up to
    /// `retries` more passes, splicing successful retries back into their
    /// original positions. Stops early once nothing is failing.
    pub async fn extract_with_retry(
        &mut self,
        targets: &[String],
    ) -> Result<Vec<Outcome>, AppError> {
        let mut outcomes = self.extract_batch(targets).await?;

        for pass in 1..=self.config.retries {
            let failing: Vec<String> = outcomes
                .iter()
                .filter(|o| !o.is_success())
                .map(|o| o.target_url.clone())
                .collect();
            if failing.is_empty() {
                break;
            }

            if self.config.verbose {
                tracing::info!(pass, count = failing.len(), "Retrying failed targets");
            } else {
                tracing::debug!(pass, count = failing.len(), "Retrying failed targets");
            }
            let retried = self.extract_batch(&failing).await?;
            merge_retries(&mut outcomes, retried);
        }

        Ok(outcomes)
    }
}

/// Write successful retry outcomes over the failing originals, leaving
/// everything else untouched. Slots are matched by target URL, so input
/// order and length survive, and every failing position of a duplicated
/// URL receives its successful retry.
fn merge_retries(outcomes: &mut [Outcome], retried: Vec<Outcome>) {
    let mut failing_slots: HashMap<String, Vec<usize>> = HashMap::new();
    for (index, outcome) in outcomes.iter().enumerate() {
        if !outcome.is_success() {
            failing_slots
                .entry(outcome.target_url.clone())
                .or_default()
                .push(index);
        }
    }

    for retry in retried {
        if !retry.is_success() {
            continue; // the original failure stays
        }
        if let Some(slots) = failing_slots.get(&retry.target_url) {
            for &index in slots {
                outcomes[index] = retry.clone();
            }
        }
    }
}

/// One-shot convenience: build an extractor, run with retry, tear the pool
/// down, and hand back the outcomes. Teardown happens before any error
/// propagates.
pub async fn extract_with<E: EngineLauncher>(
    launcher: E,
    targets: &[String],
    config: ExtractorConfig,
) -> Result<Vec<Outcome>, AppError> {
    let mut extractor = Extractor::new(launcher, config)?;
    let result = extractor.extract_with_retry(targets).await;
    extractor.close().await;
    result
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::testutil::{MockEngine, PageScript};

    const MANIFEST: &str = "https://cdn.example.com/live/index.m3u8";

    fn config(concurrency: usize, timeout_ms: u64) -> ExtractorConfig {
        ExtractorConfig::default()
            .with_concurrency(concurrency)
            .with_timeout(Duration::from_millis(timeout_ms))
            .with_retries(0)
    }

    fn targets(urls: &[&str]) -> Vec<String> {
        urls.iter().map(|u| u.to_string()).collect()
    }

    #[tokio::test]
    async fn match_before_deadline_succeeds() {
        let engine = MockEngine::new().script(
            "https://site/watch/1",
            PageScript::new().emit_after(Duration::from_millis(50), MANIFEST),
        );
        let mut extractor = Extractor::new(engine, config(1, 5000)).unwrap();

        let outcomes = extractor
            .extract_batch(&targets(&["https://site/watch/1"]))
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].is_success());
        assert_eq!(outcomes[0].resource_url.as_deref(), Some(MANIFEST));
        assert!(
            outcomes[0].elapsed_ms >= 50 && outcomes[0].elapsed_ms < 1000,
            "elapsed should track the emission, got {}ms",
            outcomes[0].elapsed_ms
        );
        extractor.close().await;
    }

    #[tokio::test]
    async fn no_match_fails_at_the_deadline() {
        let engine = MockEngine::new().script(
            "https://site/watch/1",
            PageScript::new().emit_after(Duration::from_millis(10), "https://cdn/poster.jpg"),
        );
        let mut extractor = Extractor::new(engine, config(1, 200)).unwrap();

        let outcomes = extractor
            .extract_batch(&targets(&["https://site/watch/1"]))
            .await
            .unwrap();

        assert!(!outcomes[0].is_success());
        assert_eq!(outcomes[0].error.as_deref(), Some(NO_MATCH_ERROR));
        assert!(
            outcomes[0].elapsed_ms >= 200 && outcomes[0].elapsed_ms < 1500,
            "failure should take about the deadline, got {}ms",
            outcomes[0].elapsed_ms
        );
        extractor.close().await;
    }

    #[tokio::test]
    async fn late_match_is_ignored() {
        let engine = MockEngine::new().script(
            "https://site/watch/1",
            PageScript::new().emit_after(Duration::from_millis(500), MANIFEST),
        );
        let mut extractor = Extractor::new(engine.clone(), config(1, 100)).unwrap();

        let outcomes = extractor
            .extract_batch(&targets(&["https://site/watch/1"]))
            .await
            .unwrap();

        assert!(!outcomes[0].is_success());
        assert!(outcomes[0].elapsed_ms < 400, "the deadline resolves first");
        assert_eq!(engine.pages_closed(), 1);
        extractor.close().await;
    }

    #[tokio::test]
    async fn non_matching_responses_are_skipped() {
        let engine = MockEngine::new().script(
            "https://site/watch/1",
            PageScript::new()
                .emit_after(Duration::from_millis(10), "https://cdn/app.js")
                .emit_after(Duration::from_millis(10), "https://cdn/poster.jpg")
                .emit_after(Duration::from_millis(10), MANIFEST),
        );
        let mut extractor = Extractor::new(engine, config(1, 2000)).unwrap();

        let outcomes = extractor
            .extract_batch(&targets(&["https://site/watch/1"]))
            .await
            .unwrap();

        assert!(outcomes[0].is_success());
        assert_eq!(outcomes[0].resource_url.as_deref(), Some(MANIFEST));
        extractor.close().await;
    }

    #[tokio::test]
    async fn first_match_wins() {
        let engine = MockEngine::new().script(
            "https://site/watch/1",
            PageScript::new()
                .emit_after(Duration::from_millis(20), MANIFEST)
                .emit_after(Duration::from_millis(20), "https://cdn/other/playlist.m3u8"),
        );
        let mut extractor = Extractor::new(engine, config(1, 2000)).unwrap();

        let outcomes = extractor
            .extract_batch(&targets(&["https://site/watch/1"]))
            .await
            .unwrap();

        assert_eq!(outcomes[0].resource_url.as_deref(), Some(MANIFEST));
        extractor.close().await;
    }

    #[tokio::test]
    async fn navigation_error_does_not_resolve_the_race() {
        let engine = MockEngine::new().script(
            "https://site/watch/1",
            PageScript::new()
                .nav_error("net::ERR_CONNECTION_RESET")
                .emit_after(Duration::from_millis(50), MANIFEST),
        );
        let mut extractor = Extractor::new(engine, config(1, 2000)).unwrap();

        let outcomes = extractor
            .extract_batch(&targets(&["https://site/watch/1"]))
            .await
            .unwrap();

        assert!(
            outcomes[0].is_success(),
            "a failed navigation must still leave the deadline to govern: {:?}",
            outcomes[0]
        );
        extractor.close().await;
    }

    #[tokio::test]
    async fn match_wins_while_navigation_is_still_pending() {
        let engine = MockEngine::new().script(
            "https://site/watch/1",
            PageScript::new()
                .nav_after(Duration::from_secs(60))
                .emit_after(Duration::from_millis(80), MANIFEST),
        );
        let mut extractor = Extractor::new(engine, config(1, 300)).unwrap();

        let outcomes = extractor
            .extract_batch(&targets(&["https://site/watch/1"]))
            .await
            .unwrap();

        assert!(outcomes[0].is_success());
        assert!(outcomes[0].elapsed_ms < 300, "must not wait for navigation");
        extractor.close().await;
    }

    #[tokio::test]
    async fn page_open_failure_is_task_local() {
        let engine = MockEngine::new()
            .with_page_open_failure(AppError::PageOpenError("tab crashed".into()))
            .script(
                "https://site/b",
                PageScript::new().emit_after(Duration::from_millis(10), MANIFEST),
            );
        let mut extractor = Extractor::new(engine, config(1, 1000)).unwrap();

        let outcomes = extractor
            .extract_batch(&targets(&["https://site/a", "https://site/b"]))
            .await
            .unwrap();

        assert!(!outcomes[0].is_success());
        assert_eq!(
            outcomes[0].error.as_deref(),
            Some("Page open error: tab crashed")
        );
        assert!(outcomes[1].is_success(), "sibling tasks are unaffected");

        let stats = extractor.stats();
        assert_eq!(stats.successful, 1);
        assert_eq!(stats.failed, 1);
        extractor.close().await;
    }

    #[tokio::test]
    async fn page_close_failure_does_not_mask_success() {
        let engine = MockEngine::new().with_page_close_failure().script(
            "https://site/watch/1",
            PageScript::new().emit_after(Duration::from_millis(10), MANIFEST),
        );
        let mut extractor = Extractor::new(engine, config(1, 1000)).unwrap();

        let outcomes = extractor
            .extract_batch(&targets(&["https://site/watch/1"]))
            .await
            .unwrap();

        assert!(outcomes[0].is_success());
        extractor.close().await;
    }

    #[tokio::test]
    async fn batch_preserves_input_order_and_length() {
        let engine = MockEngine::new()
            .script(
                "https://site/0",
                PageScript::new().emit_after(Duration::from_millis(80), MANIFEST),
            )
            .script(
                "https://site/1",
                PageScript::new().emit_after(Duration::from_millis(10), MANIFEST),
            )
            .script(
                "https://site/3",
                PageScript::new().emit_after(Duration::from_millis(10), MANIFEST),
            )
            .script(
                "https://site/4",
                PageScript::new().emit_after(Duration::from_millis(20), MANIFEST),
            );
        let mut extractor = Extractor::new(engine, config(2, 200)).unwrap();

        let input = targets(&[
            "https://site/0",
            "https://site/1",
            "https://site/2",
            "https://site/3",
            "https://site/4",
        ]);
        let outcomes = extractor.extract_batch(&input).await.unwrap();

        assert_eq!(outcomes.len(), input.len());
        for (outcome, target) in outcomes.iter().zip(&input) {
            assert_eq!(&outcome.target_url, target);
        }
        let successes: Vec<bool> = outcomes.iter().map(|o| o.is_success()).collect();
        assert_eq!(successes, [true, true, false, true, true]);
        extractor.close().await;
    }

    #[tokio::test]
    async fn tasks_are_assigned_round_robin() {
        let engine = MockEngine::new();
        let mut extractor = Extractor::new(engine.clone(), config(2, 50)).unwrap();

        let input = targets(&[
            "https://site/0",
            "https://site/1",
            "https://site/2",
            "https://site/3",
            "https://site/4",
        ]);
        extractor.extract_batch(&input).await.unwrap();

        // Windows [2, 2, 1]: slot 0 serves three tasks, slot 1 serves two.
        assert_eq!(engine.pages_for_instance(0), 3);
        assert_eq!(engine.pages_for_instance(1), 2);
        extractor.close().await;
    }

    #[tokio::test]
    async fn windows_bound_peak_concurrency_to_pool_size() {
        let mut engine = MockEngine::new();
        for i in 0..4 {
            engine = engine.script(
                &format!("https://site/{i}"),
                PageScript::new().emit_after(Duration::from_millis(50), MANIFEST),
            );
        }
        let mut extractor = Extractor::new(engine.clone(), config(2, 1000)).unwrap();

        extractor
            .extract_batch(&targets(&[
                "https://site/0",
                "https://site/1",
                "https://site/2",
                "https://site/3",
            ]))
            .await
            .unwrap();

        assert_eq!(
            engine.max_open_pages(),
            2,
            "a window runs fully in parallel, and windows never overlap"
        );
        extractor.close().await;
    }

    #[tokio::test]
    async fn empty_batch_returns_empty() {
        let engine = MockEngine::new();
        let mut extractor = Extractor::new(engine.clone(), config(2, 100)).unwrap();

        let outcomes = extractor.extract_batch(&[]).await.unwrap();

        assert!(outcomes.is_empty());
        assert_eq!(engine.launched(), 2, "the pool still comes up");
        extractor.close().await;
    }

    #[tokio::test]
    async fn extract_one_works_on_any_borrowed_instance() {
        let engine = MockEngine::new().script(
            "https://site/watch/1",
            PageScript::new().emit_after(Duration::from_millis(10), MANIFEST),
        );
        let extractor = Extractor::new(engine.clone(), config(1, 1000)).unwrap();
        let instance = engine.launch().await.unwrap();

        let outcome = extractor.extract_one("https://site/watch/1", &instance).await;

        assert!(outcome.is_success());
        instance.close().await.unwrap();
    }

    #[tokio::test]
    async fn retry_recovers_flaky_targets_and_keeps_order() {
        let engine = MockEngine::new()
            // First visit fails (idle page), second succeeds.
            .script("https://site/flaky", PageScript::new())
            .script(
                "https://site/flaky",
                PageScript::new().emit_after(Duration::from_millis(10), MANIFEST),
            )
            .script(
                "https://site/solid",
                PageScript::new().emit_after(Duration::from_millis(10), MANIFEST),
            );
        let config = config(2, 150).with_retries(1);
        let mut extractor = Extractor::new(engine.clone(), config).unwrap();

        let input = targets(&["https://site/flaky", "https://site/solid", "https://site/dead"]);
        let outcomes = extractor.extract_with_retry(&input).await.unwrap();

        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0].target_url, "https://site/flaky");
        assert!(outcomes[0].is_success(), "retry success replaces the failure");
        assert!(outcomes[1].is_success());
        assert!(!outcomes[2].is_success(), "still failing after the retry pass");

        assert_eq!(engine.visits("https://site/flaky"), 2);
        assert_eq!(engine.visits("https://site/solid"), 1, "successes are not re-run");
        assert_eq!(engine.visits("https://site/dead"), 2);
        extractor.close().await;
    }

    #[tokio::test]
    async fn zero_retries_means_a_single_pass() {
        let engine = MockEngine::new();
        let mut extractor = Extractor::new(engine.clone(), config(1, 50)).unwrap();

        let outcomes = extractor
            .extract_with_retry(&targets(&["https://site/dead"]))
            .await
            .unwrap();

        assert!(!outcomes[0].is_success());
        assert_eq!(engine.visits("https://site/dead"), 1);
        extractor.close().await;
    }

    #[tokio::test]
    async fn retry_passes_stop_early_once_clean() {
        let engine = MockEngine::new()
            .script("https://site/flaky", PageScript::new())
            .script(
                "https://site/flaky",
                PageScript::new().emit_after(Duration::from_millis(10), MANIFEST),
            );
        let config = config(1, 100).with_retries(5);
        let mut extractor = Extractor::new(engine.clone(), config).unwrap();

        let outcomes = extractor
            .extract_with_retry(&targets(&["https://site/flaky"]))
            .await
            .unwrap();

        assert!(outcomes[0].is_success());
        assert_eq!(
            engine.visits("https://site/flaky"),
            2,
            "no passes run once nothing is failing"
        );
        extractor.close().await;
    }

    #[test]
    fn merge_keeps_original_failure_when_retry_fails_again() {
        let mut outcomes = vec![
            Outcome::failed("https://a", Duration::from_millis(100), "first failure"),
            Outcome::found("https://b", MANIFEST, Duration::from_millis(10)),
        ];
        let retried = vec![Outcome::failed(
            "https://a",
            Duration::from_millis(999),
            "second failure",
        )];

        merge_retries(&mut outcomes, retried);

        assert_eq!(outcomes[0].error.as_deref(), Some("first failure"));
        assert_eq!(outcomes[0].elapsed_ms, 100);
        assert!(outcomes[1].is_success());
    }

    #[test]
    fn merge_replaces_every_failing_duplicate() {
        let mut outcomes = vec![
            Outcome::failed("https://a", Duration::from_millis(100), NO_MATCH_ERROR),
            Outcome::found("https://b", MANIFEST, Duration::from_millis(10)),
            Outcome::failed("https://a", Duration::from_millis(100), NO_MATCH_ERROR),
        ];
        let retried = vec![Outcome::found("https://a", MANIFEST, Duration::from_millis(20))];

        merge_retries(&mut outcomes, retried);

        assert!(outcomes[0].is_success());
        assert!(outcomes[2].is_success());
        assert_eq!(outcomes[0].resource_url, outcomes[2].resource_url);
    }

    #[tokio::test]
    async fn pool_failure_propagates_from_batch() {
        let engine =
            MockEngine::new().with_launch_failure(AppError::BrowserError("no binary".into()));
        let mut extractor = Extractor::new(engine, config(2, 100)).unwrap();

        let err = extractor
            .extract_batch(&targets(&["https://site/watch/1"]))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::PoolInitError(_)));
    }

    #[tokio::test]
    async fn closed_pool_is_rebuilt_by_the_next_batch() {
        let engine = MockEngine::new().script(
            "https://site/watch/1",
            PageScript::new().emit_after(Duration::from_millis(10), MANIFEST),
        );
        let mut extractor = Extractor::new(engine.clone(), config(2, 500)).unwrap();

        extractor
            .extract_batch(&targets(&["https://site/watch/1"]))
            .await
            .unwrap();
        extractor.close().await;
        extractor
            .extract_batch(&targets(&["https://site/watch/1"]))
            .await
            .unwrap();

        assert_eq!(engine.launched(), 4, "fresh instances after teardown");
        assert_eq!(engine.instances_closed(), 2);
        extractor.close().await;
    }

    #[tokio::test]
    async fn stats_track_batches_until_reset() {
        let engine = MockEngine::new()
            .script(
                "https://site/fast",
                PageScript::new().emit_after(Duration::from_millis(20), MANIFEST),
            )
            .script(
                "https://site/slow",
                PageScript::new().emit_after(Duration::from_millis(60), MANIFEST),
            );
        let mut extractor = Extractor::new(engine, config(1, 150)).unwrap();

        extractor
            .extract_batch(&targets(&[
                "https://site/fast",
                "https://site/slow",
                "https://site/dead",
            ]))
            .await
            .unwrap();

        let stats = extractor.stats();
        assert_eq!(stats.successful, 2);
        assert_eq!(stats.failed, 1);
        assert!(stats.total_time_ms >= 80);
        assert!(stats.average_time_ms >= 40.0 && stats.average_time_ms < 500.0);

        extractor.reset_stats();
        assert_eq!(extractor.stats(), ExtractorStats::default());
        extractor.close().await;
    }

    #[tokio::test]
    async fn extract_with_closes_the_pool_on_success() {
        let engine = MockEngine::new().script(
            "https://site/watch/1",
            PageScript::new().emit_after(Duration::from_millis(10), MANIFEST),
        );

        let outcomes = extract_with(
            engine.clone(),
            &targets(&["https://site/watch/1"]),
            config(2, 1000),
        )
        .await
        .unwrap();

        assert_eq!(outcomes.len(), 1);
        assert_eq!(engine.instances_closed(), 2, "pool torn down before returning");
    }

    #[tokio::test]
    async fn extract_with_tears_down_before_reporting_errors() {
        let engine =
            MockEngine::new().with_launch_failure(AppError::BrowserError("no binary".into()));

        let err = extract_with(engine.clone(), &targets(&["https://site/a"]), config(3, 100))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::PoolInitError(_)));
        assert_eq!(
            engine.instances_closed(),
            2,
            "partially launched instances are not leaked"
        );
    }
}
