//! End-to-end tests over a real socket: axum router, orchestrator, bearer
//! auth and the fixed-window limiter are real; the two upstream services are
//! mocked at their boundary traits.

use commitcast::auth::BearerTokenAuthenticator;
use commitcast::diff::{DiffDocument, DiffFetchError, Repository, SourceControlClient};
use commitcast::error::ErrorExposure;
use commitcast::generation::{ContentGenerator, GenerationProvider, ProviderError};
use commitcast::http::{AppState, router};
use commitcast::pipeline::RequestOrchestrator;
use commitcast::ratelimit::{FixedWindowStore, RateLimitConfig};
use futures::future::BoxFuture;
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

struct MockSourceControl {
    fetch_calls: AtomicUsize,
}

impl MockSourceControl {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            fetch_calls: AtomicUsize::new(0),
        })
    }
}

impl SourceControlClient for MockSourceControl {
    fn fetch_commit_diff<'a>(
        &'a self,
        _token: &'a str,
        owner: &'a str,
        repo: &'a str,
        commit_sha: &'a str,
    ) -> BoxFuture<'a, Result<DiffDocument, DiffFetchError>> {
        Box::pin(async move {
            self.fetch_calls.fetch_add(1, Ordering::SeqCst);
            Ok(DiffDocument::parse(
                format!("{owner}/{repo}@{commit_sha}"),
                "diff --git a/app.rs b/app.rs\n@@ -1,1 +1,2 @@\n context\n+let x = 1;\n",
            ))
        })
    }

    fn list_repositories<'a>(
        &'a self,
        _token: &'a str,
    ) -> BoxFuture<'a, Result<Vec<Repository>, DiffFetchError>> {
        Box::pin(async move {
            Ok(vec![Repository {
                owner: "acme".into(),
                name: "demo".into(),
                description: Some("demo repository".into()),
                private: false,
            }])
        })
    }
}

struct CannedProvider {
    response: String,
}

impl GenerationProvider for CannedProvider {
    fn generate_content<'a>(
        &'a self,
        _prompt: &'a str,
    ) -> BoxFuture<'a, Result<String, ProviderError>> {
        Box::pin(async move { Ok(self.response.clone()) })
    }

    fn provider_name(&self) -> &'static str {
        "canned"
    }
}

fn drafts_json() -> String {
    json!([
        {"id": "t", "type": "twitter", "content": "we shipped!", "tone": "casual"},
        {"id": "l", "type": "linkedin", "content": "Reliability improved.", "tone": "professional"},
        {"id": "b", "type": "blog", "content": "1. What changed", "tone": "educational"},
    ])
    .to_string()
}

struct TestServer {
    addr: SocketAddr,
    source: Arc<MockSourceControl>,
    client: reqwest::Client,
}

async fn spawn_server(
    rate_limit: RateLimitConfig,
    provider_response: Option<String>,
    exposure: ErrorExposure,
) -> TestServer {
    let source = MockSourceControl::new();
    let generator = provider_response.map(|response| {
        ContentGenerator::new(Arc::new(CannedProvider { response }), 0, 1)
    });

    let orchestrator = Arc::new(RequestOrchestrator::new(
        Arc::new(BearerTokenAuthenticator::new(None)),
        Arc::new(FixedWindowStore::new(rate_limit)),
        source.clone(),
        generator,
    ));

    let app = router(AppState {
        orchestrator,
        exposure,
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer {
        addr,
        source,
        client: reqwest::Client::new(),
    }
}

fn default_rate_limit() -> RateLimitConfig {
    RateLimitConfig {
        limit: 10,
        window_ms: 60_000,
        max_tracked_keys: 1024,
    }
}

fn generate_body() -> Value {
    json!({
        "repoName": "demo",
        "owner": "acme",
        "commitSha": "a".repeat(40),
    })
}

#[tokio::test]
async fn generate_returns_three_drafts_with_rate_headers() {
    let server = spawn_server(
        default_rate_limit(),
        Some(drafts_json()),
        ErrorExposure::Production,
    )
    .await;

    let response = server
        .client
        .post(format!("http://{}/generate", server.addr))
        .bearer_auth("gh-token")
        .json(&generate_body())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(
        response
            .headers()
            .get("x-ratelimit-limit")
            .and_then(|v| v.to_str().ok()),
        Some("10")
    );
    assert_eq!(
        response
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok()),
        Some("9")
    );
    assert!(response.headers().contains_key("x-ratelimit-reset"));

    let body: Value = response.json().await.unwrap();
    let drafts = body["drafts"].as_array().unwrap();
    assert_eq!(drafts.len(), 3);
    let kinds: Vec<&str> = drafts.iter().map(|d| d["type"].as_str().unwrap()).collect();
    assert_eq!(kinds, vec!["twitter", "linkedin", "blog"]);
    assert!(drafts.iter().all(|d| !d["content"].as_str().unwrap().is_empty()));

    assert_eq!(server.source.fetch_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn missing_credential_is_401_with_generic_body() {
    let server = spawn_server(
        default_rate_limit(),
        Some(drafts_json()),
        ErrorExposure::Production,
    )
    .await;

    let response = server
        .client
        .post(format!("http://{}/generate", server.addr))
        .json(&generate_body())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 401);
    // Auth precedes the rate check, so no quota headers exist yet.
    assert!(!response.headers().contains_key("x-ratelimit-limit"));

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "AUTHENTICATION_ERROR");
    assert_eq!(body["error"], "authentication failed");
    assert_eq!(server.source.fetch_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn missing_provider_key_is_500_before_any_upstream_call() {
    let server = spawn_server(default_rate_limit(), None, ErrorExposure::Production).await;

    let response = server
        .client
        .post(format!("http://{}/generate", server.addr))
        .bearer_auth("gh-token")
        .json(&generate_body())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 500);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "CONFIGURATION_ERROR");
    assert_eq!(server.source.fetch_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn exhausted_quota_is_429_with_retry_after() {
    let server = spawn_server(
        RateLimitConfig {
            limit: 1,
            window_ms: 60_000,
            max_tracked_keys: 1024,
        },
        Some(drafts_json()),
        ErrorExposure::Production,
    )
    .await;

    let first = server
        .client
        .post(format!("http://{}/generate", server.addr))
        .bearer_auth("gh-token")
        .json(&generate_body())
        .send()
        .await
        .unwrap();
    assert_eq!(first.status(), 200);

    let second = server
        .client
        .post(format!("http://{}/generate", server.addr))
        .bearer_auth("gh-token")
        .json(&generate_body())
        .send()
        .await
        .unwrap();

    assert_eq!(second.status(), 429);
    assert!(second.headers().contains_key("retry-after"));
    assert_eq!(
        second
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok()),
        Some("0")
    );
    let body: Value = second.json().await.unwrap();
    assert_eq!(body["code"], "RATE_LIMITED");
    assert!(body["details"]["retryAfter"].as_u64().is_some());
}

#[tokio::test]
async fn invalid_payload_is_400_with_field_details() {
    let server = spawn_server(
        default_rate_limit(),
        Some(drafts_json()),
        ErrorExposure::Production,
    )
    .await;

    let response = server
        .client
        .post(format!("http://{}/generate", server.addr))
        .bearer_auth("gh-token")
        .json(&json!({"repoName": "demo", "owner": "acme", "commitSha": "nope"}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "VALIDATION_ERROR");
    let details = body["details"].as_array().unwrap();
    assert_eq!(details.len(), 1);
    assert_eq!(details[0]["field"], "commitSha");
}

#[tokio::test]
async fn non_json_body_reports_every_field_missing() {
    let server = spawn_server(
        default_rate_limit(),
        Some(drafts_json()),
        ErrorExposure::Production,
    )
    .await;

    let response = server
        .client
        .post(format!("http://{}/generate", server.addr))
        .bearer_auth("gh-token")
        .body("not json at all")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    let details = body["details"].as_array().unwrap();
    assert_eq!(details.len(), 3);
}

#[tokio::test]
async fn malformed_model_output_is_502_and_stays_generic_in_production() {
    let server = spawn_server(
        default_rate_limit(),
        Some("``` totally not json ```".to_string()),
        ErrorExposure::Production,
    )
    .await;

    let response = server
        .client
        .post(format!("http://{}/generate", server.addr))
        .bearer_auth("gh-token")
        .json(&generate_body())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 502);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "EXTERNAL_API_ERROR");
    assert_eq!(body["error"], "generation-provider request failed");
}

#[tokio::test]
async fn development_mode_exposes_the_raw_upstream_message() {
    let server = spawn_server(
        default_rate_limit(),
        Some("not json".to_string()),
        ErrorExposure::Development,
    )
    .await;

    let response = server
        .client
        .post(format!("http://{}/generate", server.addr))
        .bearer_auth("gh-token")
        .json(&generate_body())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 502);
    let body: Value = response.json().await.unwrap();
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("JSON"), "got: {message}");
}

#[tokio::test]
async fn repositories_listing_requires_auth_and_carries_rate_headers() {
    let server = spawn_server(
        default_rate_limit(),
        Some(drafts_json()),
        ErrorExposure::Production,
    )
    .await;

    let unauthenticated = server
        .client
        .get(format!("http://{}/repositories", server.addr))
        .send()
        .await
        .unwrap();
    assert_eq!(unauthenticated.status(), 401);

    let response = server
        .client
        .get(format!("http://{}/repositories", server.addr))
        .bearer_auth("gh-token")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert!(response.headers().contains_key("x-ratelimit-limit"));
    let body: Value = response.json().await.unwrap();
    let repositories = body.as_array().unwrap();
    assert_eq!(repositories.len(), 1);
    assert_eq!(repositories[0]["name"], "demo");
    assert_eq!(repositories[0]["owner"], "acme");
}
