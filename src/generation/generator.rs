use crate::diff::DiffDocument;
use crate::error::ApiError;
use crate::generation::provider::GenerationProvider;
use crate::generation::types::{ContentDraft, DraftKind};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

const API_NAME: &str = "generation-provider";
const ENDPOINT: &str = "generateContent";

/// Largest diff rendering included in a prompt.
const MAX_DIFF_CHARS: usize = 60_000;

const PREAMBLE: &str = "\
You are a developer-advocate content writer. From the commit context and \
unified diff below, write exactly three content variants:
1. type \"twitter\": a casual short-form social post.
2. type \"linkedin\": a professional long-form post.
3. type \"blog\": an educational outline.

Respond with ONLY a strict JSON array of three objects, each shaped as
{\"id\": string, \"type\": \"twitter\" | \"linkedin\" | \"blog\", \"content\": string, \"tone\": string}.
Do not wrap the array in markdown code fencing and do not add commentary.";

/// Builds the prompt, drives the provider with bounded retries, and parses
/// the structured response into exactly three drafts.
///
/// Output is not deterministic across calls; callers must not assume
/// idempotence.
pub struct ContentGenerator {
    provider: Arc<dyn GenerationProvider>,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl ContentGenerator {
    pub fn new(provider: Arc<dyn GenerationProvider>, max_retries: u32, backoff_base_ms: u64) -> Self {
        Self {
            provider,
            max_retries,
            backoff_base_ms,
        }
    }

    pub async fn generate(
        &self,
        diff: &DiffDocument,
        context: &str,
    ) -> Result<Vec<ContentDraft>, ApiError> {
        let prompt = build_prompt(diff, context);

        let mut attempt = 0;
        let raw = loop {
            match self.provider.generate_content(&prompt).await {
                Ok(raw) => break raw,
                Err(err) if err.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    let delay = self.backoff_delay(attempt);
                    warn!(
                        provider = self.provider.provider_name(),
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient generation failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    return Err(ApiError::external(API_NAME, ENDPOINT, err));
                }
            }
        };

        debug!(response_chars = raw.len(), "parsing generation response");
        parse_drafts(&raw).map_err(|reason| ApiError::external(API_NAME, ENDPOINT, reason))
    }

    /// Exponential backoff with ±10% jitter, capped at 30s.
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let base = self.backoff_base_ms.saturating_mul(1 << attempt.min(6).saturating_sub(1));
        let jitter = (rand::random::<f64>() - 0.5) * 0.2;
        let jittered = ((base as f64) * (1.0 + jitter)).max(0.0) as u64;
        Duration::from_millis(jittered.min(30_000))
    }
}

pub(crate) fn build_prompt(diff: &DiffDocument, context: &str) -> String {
    format!(
        "{PREAMBLE}\n\nContext: {context}\n\nUnified diff of {}:\n{}",
        diff.commit_ref,
        diff.render(MAX_DIFF_CHARS)
    )
}

#[derive(Debug, serde::Deserialize)]
struct RawDraft {
    #[serde(default)]
    id: Option<String>,
    #[serde(rename = "type")]
    kind: DraftKind,
    #[serde(default)]
    tone: Option<String>,
    #[serde(default)]
    content: Option<String>,
}

/// Parse and validate the model's structured output.
///
/// The error string is the internal diagnosis; callers wrap it into the
/// taxonomy so a raw parser failure never reaches a client.
pub(crate) fn parse_drafts(raw: &str) -> Result<Vec<ContentDraft>, String> {
    let cleaned = strip_code_fences(raw);

    let parsed: Vec<RawDraft> = serde_json::from_str(cleaned)
        .map_err(|e| format!("response is not a JSON draft array: {e}"))?;

    if parsed.len() != 3 {
        return Err(format!("expected 3 drafts, got {}", parsed.len()));
    }

    let kinds: HashSet<DraftKind> = parsed.iter().map(|d| d.kind).collect();
    if kinds.len() != 3 {
        return Err("drafts must cover twitter, linkedin and blog exactly once".to_string());
    }

    let mut seen_ids = HashSet::new();
    let mut drafts = Vec::with_capacity(3);
    for kind in DraftKind::ALL {
        let raw_draft = parsed
            .iter()
            .find(|d| d.kind == kind)
            .ok_or_else(|| format!("missing {kind} draft"))?;

        let content = raw_draft
            .content
            .as_deref()
            .map(str::trim)
            .unwrap_or_default();
        if content.is_empty() {
            return Err(format!("{kind} draft has empty content"));
        }

        // Ids must be unique within the batch; a missing or colliding id is
        // replaced rather than failing an otherwise valid response.
        let id = match raw_draft.id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() && seen_ids.insert(id.to_string()) => id.to_string(),
            _ => {
                let fresh = Uuid::new_v4().to_string();
                seen_ids.insert(fresh.clone());
                fresh
            }
        };

        drafts.push(ContentDraft {
            id,
            kind,
            tone: raw_draft
                .tone
                .clone()
                .unwrap_or_else(|| default_tone(kind).to_string()),
            content: content.to_string(),
        });
    }

    Ok(drafts)
}

fn default_tone(kind: DraftKind) -> &'static str {
    match kind {
        DraftKind::Twitter => "casual",
        DraftKind::LinkedIn => "professional",
        DraftKind::Blog => "educational",
    }
}

/// Models often fence JSON despite instructions; strip one layer of
/// markdown code fencing (with or without a language tag) before parsing.
pub(crate) fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    let body = match rest.split_once('\n') {
        Some((_lang, body)) => body,
        None => rest,
    };
    body.trim().strip_suffix("```").unwrap_or(body).trim()
}
