use crate::error::ApiError;
use crate::generation::ContentDraft;
use crate::ratelimit::RateDecision;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Stages of the request state machine, in fixed order. `Failed` is the
/// terminal state reachable from every non-terminal one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Received,
    Authenticated,
    RateChecked,
    Validated,
    DiffFetched,
    Generated,
    Responded,
    Failed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Received => "received",
            PipelineState::Authenticated => "authenticated",
            PipelineState::RateChecked => "rate_checked",
            PipelineState::Validated => "validated",
            PipelineState::DiffFetched => "diff_fetched",
            PipelineState::Generated => "generated",
            PipelineState::Responded => "responded",
            PipelineState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Successful `/generate` body: exactly three drafts.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateResponse {
    pub drafts: Vec<ContentDraft>,
}

/// Everything the transport layer needs to shape a response.
#[derive(Debug)]
pub struct PipelineOutcome<T> {
    pub result: Result<T, ApiError>,
    /// Present when the pipeline reached the rate check; drives the
    /// X-RateLimit response headers.
    pub rate: Option<RateDecision>,
    /// Terminal state: `Responded` on success, `Failed` otherwise.
    pub state: PipelineState,
    /// Last stage that completed before the terminal state.
    pub reached: PipelineState,
    pub duration: Duration,
}
