use crate::auth::Authenticator;
use crate::diff::{Repository, SourceControlClient};
use crate::error::ApiError;
use crate::generation::ContentGenerator;
use crate::pipeline::types::{GenerateResponse, PipelineOutcome, PipelineState};
use crate::ratelimit::{RateDecision, RateLimitStore};
use crate::validation::validate_generate_request;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// Sequences one request through the fixed stage order, short-circuiting on
/// the first failure: authenticate, consume one rate-limit unit keyed by the
/// authenticated identity, validate the payload, require the provider key,
/// fetch the diff, generate content. Every request emits exactly one
/// structured log entry with method, path, outcome state and duration.
pub struct RequestOrchestrator {
    authenticator: Arc<dyn Authenticator>,
    rate_limiter: Arc<dyn RateLimitStore>,
    source_control: Arc<dyn SourceControlClient>,
    /// `None` when the generation-provider API key is absent; every generate
    /// request then fails with a configuration error before any external
    /// call is attempted.
    generator: Option<ContentGenerator>,
}

impl RequestOrchestrator {
    pub fn new(
        authenticator: Arc<dyn Authenticator>,
        rate_limiter: Arc<dyn RateLimitStore>,
        source_control: Arc<dyn SourceControlClient>,
        generator: Option<ContentGenerator>,
    ) -> Self {
        Self {
            authenticator,
            rate_limiter,
            source_control,
            generator,
        }
    }

    pub async fn handle_generate(
        &self,
        bearer: Option<&str>,
        payload: &Value,
    ) -> PipelineOutcome<GenerateResponse> {
        let started = Instant::now();
        let mut reached = PipelineState::Received;
        let mut rate = None;

        let result = self
            .run_generate(bearer, payload, &mut reached, &mut rate)
            .await;

        self.finish("POST", "/generate", started, reached, rate, result)
    }

    pub async fn handle_list_repositories(
        &self,
        bearer: Option<&str>,
    ) -> PipelineOutcome<Vec<Repository>> {
        let started = Instant::now();
        let mut reached = PipelineState::Received;
        let mut rate = None;

        let result = self
            .run_list_repositories(bearer, &mut reached, &mut rate)
            .await;

        self.finish("GET", "/repositories", started, reached, rate, result)
    }

    async fn run_generate(
        &self,
        bearer: Option<&str>,
        payload: &Value,
        reached: &mut PipelineState,
        rate: &mut Option<RateDecision>,
    ) -> Result<GenerateResponse, ApiError> {
        let identity = self.authenticator.authenticate(bearer).await?;
        *reached = PipelineState::Authenticated;

        self.consume_rate_unit(&identity.client_key, rate)?;
        *reached = PipelineState::RateChecked;

        let request = validate_generate_request(payload)?;
        *reached = PipelineState::Validated;

        let generator = self.generator.as_ref().ok_or_else(|| {
            ApiError::configuration("generation provider API key is not configured")
        })?;

        let diff = self
            .source_control
            .fetch_commit_diff(
                &identity.access_token,
                &request.owner,
                &request.repo_name,
                &request.commit_sha,
            )
            .await?;
        *reached = PipelineState::DiffFetched;

        let context = format!(
            "Commit {} in repository {}/{}",
            request.commit_sha, request.owner, request.repo_name
        );
        let drafts = generator.generate(&diff, &context).await?;
        *reached = PipelineState::Generated;

        Ok(GenerateResponse { drafts })
    }

    async fn run_list_repositories(
        &self,
        bearer: Option<&str>,
        reached: &mut PipelineState,
        rate: &mut Option<RateDecision>,
    ) -> Result<Vec<Repository>, ApiError> {
        let identity = self.authenticator.authenticate(bearer).await?;
        *reached = PipelineState::Authenticated;

        self.consume_rate_unit(&identity.client_key, rate)?;
        *reached = PipelineState::RateChecked;

        let repositories = self
            .source_control
            .list_repositories(&identity.access_token)
            .await?;

        Ok(repositories)
    }

    fn consume_rate_unit(
        &self,
        client_key: &str,
        rate: &mut Option<RateDecision>,
    ) -> Result<(), ApiError> {
        let decision = self.rate_limiter.consume(client_key);
        let denial = (!decision.allowed).then(|| ApiError::RateLimit {
            retry_after_secs: decision.retry_after_secs.unwrap_or(1),
            limit: decision.limit,
            remaining: decision.remaining,
            reset_at: decision.reset_at,
        });
        *rate = Some(decision);

        match denial {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn finish<T>(
        &self,
        method: &str,
        path: &str,
        started: Instant,
        reached: PipelineState,
        rate: Option<RateDecision>,
        result: Result<T, ApiError>,
    ) -> PipelineOutcome<T> {
        let duration = started.elapsed();
        let state = match &result {
            Ok(_) => PipelineState::Responded,
            Err(_) => PipelineState::Failed,
        };

        match &result {
            Ok(_) => {
                info!(
                    method,
                    path,
                    state = %state,
                    duration_ms = duration.as_millis() as u64,
                    "request completed"
                );
            }
            Err(err @ ApiError::Unknown { message }) => {
                // Unclassified failures always get full server-side context;
                // the client sees only a generic body.
                error!(
                    method,
                    path,
                    state = %state,
                    stage = %reached,
                    duration_ms = duration.as_millis() as u64,
                    code = err.code(),
                    message,
                    "request failed with unclassified error"
                );
            }
            Err(err) => {
                info!(
                    method,
                    path,
                    state = %state,
                    stage = %reached,
                    duration_ms = duration.as_millis() as u64,
                    code = err.code(),
                    error = %err,
                    "request failed"
                );
            }
        }

        PipelineOutcome {
            result,
            rate,
            state,
            reached,
            duration,
        }
    }
}
