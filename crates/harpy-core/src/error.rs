use thiserror::Error;

/// Application-wide error types for Harpy.
#[derive(Error, Debug)]
pub enum AppError {
    /// Browser instance launch or engine session failure.
    #[error("Browser error: {0}")]
    BrowserError(String),

    /// Could not open an isolated page on an execution context.
    #[error("Page open error: {0}")]
    PageOpenError(String),

    /// Navigation did not settle within its budget.
    #[error("Navigation error: {0}")]
    NavigationError(String),

    /// One or more instance launches failed while building the context pool.
    #[error("Pool initialization error: {0}")]
    PoolInitError(String),

    /// A configured URL pattern is not a valid regular expression.
    #[error("Invalid URL pattern: {0}")]
    PatternError(#[from] regex::Error),

    /// Invalid configuration value.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// HTTP request failed (listing/discovery integrations).
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_formats() {
        let err = AppError::PoolInitError("launch 2 of 10 failed".into());
        assert_eq!(
            err.to_string(),
            "Pool initialization error: launch 2 of 10 failed"
        );
        assert_eq!(AppError::Timeout(30).to_string(), "Request timed out after 30 seconds");
    }

    #[test]
    fn test_pattern_error_from_regex() {
        let bad = regex::Regex::new("[unclosed").unwrap_err();
        let err = AppError::from(bad);
        assert!(matches!(err, AppError::PatternError(_)));
        assert!(err.to_string().starts_with("Invalid URL pattern:"));
    }
}
