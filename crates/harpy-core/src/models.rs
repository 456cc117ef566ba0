use std::time::Duration;

/// The record of one extraction attempt against one target URL.
///
/// Immutable once produced. Exactly one of `resource_url` / `error` is
/// present; the constructors are the only way to build an outcome, so the
/// invariant holds everywhere downstream.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Outcome {
    /// The input page this record corresponds to. Join key for retry merging.
    pub target_url: String,

    /// The discovered manifest URL, present iff `success`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_url: Option<String>,

    pub success: bool,

    /// Wall-clock duration of the attempt, measured regardless of outcome.
    pub elapsed_ms: u64,

    /// What went wrong, present iff not `success`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Outcome {
    /// A successful attempt: the observer saw a matching response in time.
    pub fn found(
        target_url: impl Into<String>,
        resource_url: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        Self {
            target_url: target_url.into(),
            resource_url: Some(resource_url.into()),
            success: true,
            elapsed_ms: elapsed.as_millis() as u64,
            error: None,
        }
    }

    /// A failed attempt with its cause.
    pub fn failed(
        target_url: impl Into<String>,
        elapsed: Duration,
        error: impl Into<String>,
    ) -> Self {
        Self {
            target_url: target_url.into(),
            resource_url: None,
            success: false,
            elapsed_ms: elapsed.as_millis() as u64,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }
}
