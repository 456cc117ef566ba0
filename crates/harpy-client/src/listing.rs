use std::time::Duration;

use harpy_core::AppError;
use serde::Deserialize;
use url::Url;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Client for a live-match listing service.
///
/// Discovers candidate embed pages in two steps: fetch the live matches,
/// then resolve each advertised source to its embed URL. A source that
/// fails to resolve is skipped, not fatal, since listings routinely
/// advertise dead streams.
#[derive(Debug)]
pub struct ListingClient {
    client: reqwest::Client,
    base: Url,
    timeout_secs: u64,
}

/// One resolvable stream discovered from the listing.
#[derive(Debug, Clone)]
pub struct LiveSource {
    pub match_title: String,
    pub source: String,
    pub source_id: String,
    pub embed_url: String,
    pub category: String,
    pub start_time: Option<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MatchDto {
    title: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    start_time: Option<i64>,
    #[serde(default)]
    sources: Vec<SourceDto>,
}

#[derive(Deserialize)]
struct SourceDto {
    source: String,
    id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StreamDto {
    #[serde(default)]
    embed_url: Option<String>,
}

impl ListingClient {
    pub fn new(base_url: &str) -> Result<Self, AppError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, AppError> {
        let base = Url::parse(base_url)
            .map_err(|e| AppError::HttpError(format!("invalid listing base URL: {e}")))?;
        let client = reqwest::Client::builder()
            .user_agent("Harpy/0.2")
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self {
            client,
            base,
            timeout_secs: timeout.as_secs(),
        })
    }

    /// Fetch all live matches and resolve their sources to embed URLs.
    ///
    /// The returned list is flat: one entry per resolvable source, in
    /// listing order, so its index lines up with a batch built from the
    /// embed URLs.
    pub async fn live_sources(&self) -> Result<Vec<LiveSource>, AppError> {
        let matches: Vec<MatchDto> = self.get_json("api/matches/live").await?;
        tracing::info!(count = matches.len(), "Fetched live matches");

        let mut sources = Vec::new();
        for m in &matches {
            for s in &m.sources {
                match self.resolve_embed(&s.source, &s.id).await {
                    Ok(Some(embed_url)) => sources.push(LiveSource {
                        match_title: m.title.clone(),
                        source: s.source.clone(),
                        source_id: s.id.clone(),
                        embed_url,
                        category: m.category.clone().unwrap_or_else(|| "Other".into()),
                        start_time: m.start_time,
                    }),
                    Ok(None) => {
                        tracing::debug!(source = %s.source, id = %s.id, "Source has no embed URL");
                    }
                    Err(e) => {
                        tracing::debug!(source = %s.source, id = %s.id, error = %e, "Skipping source");
                    }
                }
            }
        }

        tracing::info!(count = sources.len(), "Resolved sources with embed URLs");
        Ok(sources)
    }

    async fn resolve_embed(&self, source: &str, id: &str) -> Result<Option<String>, AppError> {
        let streams: Vec<StreamDto> = self.get_json(&format!("api/stream/{source}/{id}")).await?;
        Ok(streams.into_iter().find_map(|s| s.embed_url))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, AppError> {
        let url = self
            .base
            .join(path)
            .map_err(|e| AppError::HttpError(format!("invalid listing path: {e}")))?;

        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            if e.is_timeout() {
                AppError::Timeout(self.timeout_secs)
            } else {
                AppError::HttpError(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::HttpError(format!(
                "HTTP {} for {}",
                status.as_u16(),
                url
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::HttpError(format!("invalid listing response: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_dto_tolerates_missing_fields() {
        let matches: Vec<MatchDto> = serde_json::from_str(
            r#"[
                {"title": "Team A vs Team B",
                 "category": "football",
                 "startTime": 1735689600000,
                 "sources": [{"source": "alpha", "id": "42"}]},
                {"title": "Bare match"}
            ]"#,
        )
        .unwrap();

        assert_eq!(matches[0].sources.len(), 1);
        assert_eq!(matches[0].start_time, Some(1735689600000));
        assert!(matches[1].sources.is_empty());
        assert!(matches[1].category.is_none());
    }

    #[test]
    fn stream_dto_reads_camel_case_embed_url() {
        let streams: Vec<StreamDto> = serde_json::from_str(
            r#"[{"embedUrl": "https://embed.example/e/42"}, {}]"#,
        )
        .unwrap();

        assert_eq!(
            streams[0].embed_url.as_deref(),
            Some("https://embed.example/e/42")
        );
        assert!(streams[1].embed_url.is_none());
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let err = ListingClient::new("not a url").unwrap_err();
        assert!(matches!(err, AppError::HttpError(_)));
    }
}
