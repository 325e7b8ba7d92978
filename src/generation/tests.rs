use super::generator::{build_prompt, parse_drafts, strip_code_fences};
use super::*;
use crate::diff::DiffDocument;
use crate::error::ApiError;
use futures::future::BoxFuture;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

fn draft_json() -> String {
    serde_json::json!([
        {"id": "d1", "type": "twitter", "content": "shipped a thing", "tone": "casual"},
        {"id": "d2", "type": "linkedin", "content": "We improved reliability.", "tone": "professional"},
        {"id": "d3", "type": "blog", "content": "1. Intro\n2. Details", "tone": "educational"},
    ])
    .to_string()
}

fn sample_diff() -> DiffDocument {
    DiffDocument::parse(
        "acme/demo@abc",
        "diff --git a/main.rs b/main.rs\n@@ -1,1 +1,2 @@\n context\n+added\n",
    )
}

struct ScriptedProvider {
    responses: std::sync::Mutex<VecDeque<Result<String, ProviderError>>>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    fn new(responses: Vec<Result<String, ProviderError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: std::sync::Mutex::new(responses.into()),
            calls: AtomicUsize::new(0),
        })
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl GenerationProvider for ScriptedProvider {
    fn generate_content<'a>(
        &'a self,
        _prompt: &'a str,
    ) -> BoxFuture<'a, Result<String, ProviderError>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ProviderError::Unavailable("script exhausted".into())))
        })
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}

#[tokio::test]
async fn well_formed_response_yields_three_typed_drafts() {
    let provider = ScriptedProvider::new(vec![Ok(draft_json())]);
    let generator = ContentGenerator::new(provider.clone(), 3, 1);

    let drafts = generator
        .generate(&sample_diff(), "Commit abc in acme/demo")
        .await
        .unwrap();

    assert_eq!(drafts.len(), 3);
    let kinds: Vec<DraftKind> = drafts.iter().map(|d| d.kind).collect();
    assert_eq!(
        kinds,
        vec![DraftKind::Twitter, DraftKind::LinkedIn, DraftKind::Blog]
    );
    assert!(drafts.iter().all(|d| !d.content.is_empty()));
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test]
async fn malformed_response_becomes_external_api_error() {
    let provider = ScriptedProvider::new(vec![Ok("the model rambled instead of JSON".into())]);
    let generator = ContentGenerator::new(provider, 3, 1);

    let err = generator.generate(&sample_diff(), "ctx").await.unwrap_err();
    match err {
        ApiError::ExternalApi { api, endpoint, .. } => {
            assert_eq!(api, "generation-provider");
            assert_eq!(endpoint, "generateContent");
        }
        other => panic!("expected ExternalApi, got {other:?}"),
    }
}

#[tokio::test]
async fn transient_failures_are_retried_then_succeed() {
    let provider = ScriptedProvider::new(vec![
        Err(ProviderError::Unavailable("status 503".into())),
        Err(ProviderError::Timeout),
        Ok(draft_json()),
    ]);
    let generator = ContentGenerator::new(provider.clone(), 3, 1);

    let drafts = generator.generate(&sample_diff(), "ctx").await.unwrap();
    assert_eq!(drafts.len(), 3);
    assert_eq!(provider.call_count(), 3);
}

#[tokio::test]
async fn permanent_failure_fails_fast() {
    let provider = ScriptedProvider::new(vec![Err(ProviderError::QuotaExhausted(
        "daily quota".into(),
    ))]);
    let generator = ContentGenerator::new(provider.clone(), 3, 1);

    let err = generator.generate(&sample_diff(), "ctx").await.unwrap_err();
    assert_eq!(err.code(), "EXTERNAL_API_ERROR");
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test]
async fn retries_exhausted_surface_the_last_failure() {
    let provider = ScriptedProvider::new(vec![
        Err(ProviderError::Timeout),
        Err(ProviderError::Timeout),
        Err(ProviderError::Timeout),
    ]);
    let generator = ContentGenerator::new(provider.clone(), 2, 1);

    let err = generator.generate(&sample_diff(), "ctx").await.unwrap_err();
    assert_eq!(err.status_code(), 502);
    assert_eq!(provider.call_count(), 3);
}

#[test]
fn prompt_carries_instructions_context_and_diff() {
    let prompt = build_prompt(&sample_diff(), "Commit abc in acme/demo");
    assert!(prompt.contains("developer-advocate"));
    assert!(prompt.contains("\"twitter\""));
    assert!(prompt.contains("Commit abc in acme/demo"));
    assert!(prompt.contains("+added"));
    assert!(prompt.contains("Do not wrap the array in markdown code fencing"));
}

#[test]
fn fenced_json_is_stripped_before_parsing() {
    let fenced = format!("```json\n{}\n```", draft_json());
    let drafts = parse_drafts(&fenced).unwrap();
    assert_eq!(drafts.len(), 3);

    let bare_fence = format!("```\n{}\n```", draft_json());
    assert_eq!(parse_drafts(&bare_fence).unwrap().len(), 3);

    assert_eq!(strip_code_fences("no fences"), "no fences");
}

#[test]
fn shape_mismatches_are_rejected() {
    // Two drafts only.
    let two = serde_json::json!([
        {"id": "a", "type": "twitter", "content": "x", "tone": "casual"},
        {"id": "b", "type": "blog", "content": "y", "tone": "educational"},
    ]);
    assert!(parse_drafts(&two.to_string()).unwrap_err().contains("3"));

    // Duplicate kind.
    let duped = serde_json::json!([
        {"id": "a", "type": "twitter", "content": "x", "tone": "casual"},
        {"id": "b", "type": "twitter", "content": "y", "tone": "casual"},
        {"id": "c", "type": "blog", "content": "z", "tone": "educational"},
    ]);
    assert!(parse_drafts(&duped.to_string()).is_err());

    // Empty content.
    let empty = serde_json::json!([
        {"id": "a", "type": "twitter", "content": "  ", "tone": "casual"},
        {"id": "b", "type": "linkedin", "content": "y", "tone": "professional"},
        {"id": "c", "type": "blog", "content": "z", "tone": "educational"},
    ]);
    assert!(
        parse_drafts(&empty.to_string())
            .unwrap_err()
            .contains("empty content")
    );
}

#[test]
fn colliding_or_missing_ids_are_replaced() {
    let collided = serde_json::json!([
        {"id": "same", "type": "twitter", "content": "x", "tone": "casual"},
        {"id": "same", "type": "linkedin", "content": "y", "tone": "professional"},
        {"type": "blog", "content": "z", "tone": "educational"},
    ]);

    let drafts = parse_drafts(&collided.to_string()).unwrap();
    let ids: std::collections::HashSet<_> = drafts.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids.len(), 3);
    assert!(drafts.iter().any(|d| d.id == "same"));
}

#[test]
fn missing_tone_falls_back_per_kind() {
    let toneless = serde_json::json!([
        {"id": "a", "type": "twitter", "content": "x"},
        {"id": "b", "type": "linkedin", "content": "y"},
        {"id": "c", "type": "blog", "content": "z"},
    ]);

    let drafts = parse_drafts(&toneless.to_string()).unwrap();
    assert_eq!(drafts[0].tone, "casual");
    assert_eq!(drafts[1].tone, "professional");
    assert_eq!(drafts[2].tone, "educational");
}
