pub mod config;
pub mod error;
pub mod extractor;
pub mod models;
pub mod pattern;
pub mod pool;
pub mod stats;
pub mod testutil;
pub mod traits;

pub use config::{DEFAULT_PATTERNS, ExtractorConfig, LaunchProfile};
pub use error::AppError;
pub use extractor::{Extractor, extract_with};
pub use models::Outcome;
pub use stats::ExtractorStats;
pub use traits::{BrowserInstance, BrowserPage, EngineLauncher, ResponseStream};
