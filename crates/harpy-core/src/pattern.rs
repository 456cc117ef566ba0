use regex::{RegexSet, RegexSetBuilder};

use crate::error::AppError;

/// Compiled URL matchers for observed network responses.
///
/// Patterns are OR'd: a URL matching any one of them is accepted. Matching is
/// case-insensitive because manifest paths show up in the wild with arbitrary
/// casing (`INDEX.M3U8`, `Playlist.m3u8`).
#[derive(Debug, Clone)]
pub struct PatternSet {
    set: RegexSet,
}

impl PatternSet {
    /// Compile the pattern sources once, up front. An invalid pattern fails
    /// the whole compilation rather than being silently skipped.
    pub fn compile(patterns: &[String]) -> Result<Self, AppError> {
        let set = RegexSetBuilder::new(patterns)
            .case_insensitive(true)
            .build()?;
        Ok(Self { set })
    }

    /// Test a response URL against every pattern.
    pub fn is_match(&self, url: &str) -> bool {
        self.set.is_match(url)
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_PATTERNS;

    fn default_set() -> PatternSet {
        PatternSet::compile(&DEFAULT_PATTERNS.map(String::from)).unwrap()
    }

    #[test]
    fn default_patterns_match_playlist_urls() {
        let set = default_set();
        assert!(set.is_match("https://cdn.example.com/live/playlist.m3u8"));
        assert!(set.is_match("https://cdn.example.com/hls/index.m3u8?token=abc"));
        assert!(set.is_match("https://cdn.example.com/v1/chunklist.m3u8"));
    }

    #[test]
    fn matching_is_case_insensitive() {
        let set = default_set();
        assert!(set.is_match("https://cdn.example.com/LIVE/INDEX.M3U8"));
        assert!(set.is_match("https://cdn.example.com/Playlist.M3u8"));
    }

    #[test]
    fn non_manifest_urls_do_not_match() {
        let set = default_set();
        assert!(!set.is_match("https://cdn.example.com/player.js"));
        assert!(!set.is_match("https://cdn.example.com/poster.jpg"));
        assert!(!set.is_match("https://example.com/watch/12345"));
    }

    #[test]
    fn dot_is_escaped_in_defaults() {
        // `\.m3u8` must not match an embedded "xm3u8" token
        let set = default_set();
        assert!(!set.is_match("https://cdn.example.com/not-a-manifest-xm3u8"));
    }

    #[test]
    fn any_pattern_wins() {
        let set = PatternSet::compile(&["\\.mpd".into(), "\\.m3u8".into()]).unwrap();
        assert!(set.is_match("https://cdn.example.com/dash/stream.mpd"));
        assert!(set.is_match("https://cdn.example.com/hls/stream.m3u8"));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn invalid_pattern_fails_compilation() {
        let err = PatternSet::compile(&["[unclosed".into()]).unwrap_err();
        assert!(matches!(err, AppError::PatternError(_)));
    }
}
