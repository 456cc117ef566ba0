use std::path::PathBuf;
use std::time::Duration;

use crate::error::AppError;

/// Default URL patterns: HLS playlist manifests, most specific first.
pub const DEFAULT_PATTERNS: [&str; 3] = [r"playlist\.m3u8", r"index\.m3u8", r"\.m3u8"];

/// Engine startup options for one browser instance.
#[derive(Debug, Clone)]
pub struct LaunchProfile {
    /// Browser binary location. Auto-discovered when `None`.
    pub executable: Option<PathBuf>,

    /// Run without a visible window.
    pub headless: bool,

    /// Extra command-line flags passed to the engine.
    pub args: Vec<String>,
}

impl LaunchProfile {
    pub fn with_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable = Some(path.into());
        self
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }
}

impl Default for LaunchProfile {
    /// Headless with the container-safe flag set: no sandbox, no /dev/shm
    /// reliance, no GPU. Suitable for CI boxes and minimal images.
    fn default() -> Self {
        Self {
            executable: None,
            headless: true,
            args: [
                "--no-sandbox",
                "--disable-setuid-sandbox",
                "--disable-dev-shm-usage",
                "--disable-accelerated-2d-canvas",
                "--no-first-run",
                "--no-zygote",
                "--disable-gpu",
            ]
            .map(String::from)
            .to_vec(),
        }
    }
}

/// Configuration for an [`Extractor`](crate::extractor::Extractor).
///
/// Immutable once the extractor is constructed. Callers start from
/// `Default::default()` and override the fields they care about.
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Deadline for discovering the target resource on one task.
    pub timeout: Duration,

    /// Pool size, and therefore the maximum number of parallel tasks.
    pub concurrency: usize,

    /// Additional full passes over still-failing items after the first batch.
    pub retries: u32,

    /// Regex sources matched case-insensitively against every observed
    /// response URL. Any single match resolves the task.
    pub patterns: Vec<String>,

    /// Emit per-window progress at info level instead of debug.
    pub verbose: bool,

    /// Engine startup options.
    pub launch: LaunchProfile,
}

impl ExtractorConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_patterns(mut self, patterns: Vec<String>) -> Self {
        self.patterns = patterns;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_launch(mut self, launch: LaunchProfile) -> Self {
        self.launch = launch;
        self
    }

    /// Check the invariants the engine relies on.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.concurrency == 0 {
            return Err(AppError::ConfigError(
                "concurrency must be at least 1".into(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(AppError::ConfigError("timeout must be positive".into()));
        }
        if self.patterns.is_empty() {
            return Err(AppError::ConfigError(
                "at least one URL pattern is required".into(),
            ));
        }
        Ok(())
    }
}

impl Default for ExtractorConfig {
    /// 20s per-task deadline, 10 parallel contexts, one retry pass over
    /// failures, the default playlist patterns.
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(20),
            concurrency: 10,
            retries: 1,
            patterns: DEFAULT_PATTERNS.map(String::from).to_vec(),
            verbose: false,
            launch: LaunchProfile::default(),
        }
    }
}
