use crate::generation::types::{GenerationConfig, ProviderError};
use futures::future::BoxFuture;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Generation-provider boundary consumed by [`ContentGenerator`].
///
/// Implementations return the model's raw text output; prompt construction
/// and response parsing stay in the generator so every provider is held to
/// the same output contract.
///
/// [`ContentGenerator`]: crate::generation::ContentGenerator
pub trait GenerationProvider: Send + Sync {
    fn generate_content<'a>(&'a self, prompt: &'a str)
    -> BoxFuture<'a, Result<String, ProviderError>>;

    fn provider_name(&self) -> &'static str;
}

/// Gemini `generateContent` implementation of [`GenerationProvider`].
pub struct GeminiProvider {
    http: reqwest::Client,
    endpoint: Url,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

impl GeminiProvider {
    pub fn new(config: &GenerationConfig) -> Result<Self, ProviderError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| ProviderError::Rejected("API key is required".to_string()))?;

        let endpoint = Url::parse(&config.base_url)
            .and_then(|base| {
                base.join(&format!("v1beta/models/{}:generateContent", config.model))
            })
            .map_err(|e| ProviderError::Rejected(format!("invalid provider base url: {e}")))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(concat!("commitcast/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProviderError::Unavailable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoint,
            api_key,
        })
    }

    fn classify_status(status: StatusCode, body: &str) -> ProviderError {
        let summary: String = body.chars().take(200).collect();
        match status {
            StatusCode::TOO_MANY_REQUESTS => ProviderError::QuotaExhausted(summary),
            s if s.is_server_error() => ProviderError::Unavailable(format!("status {s}")),
            s => ProviderError::Rejected(format!("status {s}: {summary}")),
        }
    }
}

impl GenerationProvider for GeminiProvider {
    fn generate_content<'a>(
        &'a self,
        prompt: &'a str,
    ) -> BoxFuture<'a, Result<String, ProviderError>> {
        Box::pin(async move {
            let request = GenerateContentRequest {
                contents: vec![Content {
                    parts: vec![Part { text: prompt }],
                }],
            };

            debug!(prompt_chars = prompt.len(), "calling generateContent");

            let response = self
                .http
                .post(self.endpoint.clone())
                .header("x-goog-api-key", &self.api_key)
                .json(&request)
                .send()
                .await
                .map_err(|e| {
                    if e.is_timeout() {
                        ProviderError::Timeout
                    } else {
                        ProviderError::Unavailable(e.to_string())
                    }
                })?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(Self::classify_status(status, &body));
            }

            let parsed: GenerateContentResponse = response
                .json()
                .await
                .map_err(|e| ProviderError::Unavailable(format!("malformed response: {e}")))?;

            let text: String = parsed
                .candidates
                .first()
                .map(|c| {
                    c.content
                        .parts
                        .iter()
                        .map(|p| p.text.as_str())
                        .collect::<Vec<_>>()
                        .join("")
                })
                .unwrap_or_default();

            if text.is_empty() {
                return Err(ProviderError::Rejected(
                    "response contained no candidates".to_string(),
                ));
            }

            Ok(text)
        })
    }

    fn provider_name(&self) -> &'static str {
        "gemini"
    }
}
