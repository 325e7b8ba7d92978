use serde::{Deserialize, Serialize};
use std::fmt;

/// The three content variants produced from one commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DraftKind {
    Twitter,
    LinkedIn,
    Blog,
}

impl DraftKind {
    pub const ALL: [DraftKind; 3] = [DraftKind::Twitter, DraftKind::LinkedIn, DraftKind::Blog];

    pub fn as_str(&self) -> &'static str {
        match self {
            DraftKind::Twitter => "twitter",
            DraftKind::LinkedIn => "linkedin",
            DraftKind::Blog => "blog",
        }
    }
}

impl fmt::Display for DraftKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One generated content variant, returned to the caller and never persisted
/// by this core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentDraft {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: DraftKind,
    pub tone: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Provider API key. A missing key fails every generation request with a
    /// configuration error before any external call is attempted.
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub backoff_base_ms: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-2.0-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            timeout_ms: 30_000,
            max_retries: 3,
            backoff_base_ms: 500,
        }
    }
}

/// Transport-level failures from the generation provider.
///
/// Transient failures are worth a bounded retry; permanent ones
/// (rejected prompt, exhausted quota) fail fast.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    #[error("request timed out")]
    Timeout,
    #[error("provider unavailable: {0}")]
    Unavailable(String),
    #[error("quota exhausted: {0}")]
    QuotaExhausted(String),
    #[error("request rejected: {0}")]
    Rejected(String),
}

impl ProviderError {
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Timeout | ProviderError::Unavailable(_) => true,
            ProviderError::QuotaExhausted(_) | ProviderError::Rejected(_) => false,
        }
    }
}
