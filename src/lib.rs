//! # Commitcast
//!
//! Turns a single commit's code diff into ready-to-post marketing drafts
//! (short-form social, professional post, long-form outline) by
//! orchestrating two external services: a source-control API for diff
//! retrieval and a generative-language API for content synthesis.
//!
//! ## Architecture Overview
//!
//! One request flows top-down through a fixed pipeline:
//!
//! ```text
//! authenticate -> rate limit -> validate -> fetch diff -> generate -> respond
//! ```
//!
//! - **[`auth`]**: authentication boundary; the identity provider is an
//!   external collaborator behind the `Authenticator` trait
//! - **[`ratelimit`]**: per-client fixed-window counters, the only shared
//!   mutable state in the core
//! - **[`validation`]**: schema check of the generation payload
//! - **[`diff`]**: diff model, unified-diff parsing, and the source-control
//!   client boundary
//! - **[`generation`]**: prompt construction, provider boundary, structured
//!   response parsing with bounded retries
//! - **[`pipeline`]**: the request orchestrator and its state machine
//! - **[`error`]**: the closed error taxonomy every failure maps into
//! - **[`http`]**: axum routing and response shaping
//! - **[`config`]**: configuration discovery and environment overrides
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use commitcast::auth::BearerTokenAuthenticator;
//! use commitcast::config::AppConfig;
//! use commitcast::diff::GitHubClient;
//! use commitcast::pipeline::RequestOrchestrator;
//! use commitcast::ratelimit::FixedWindowStore;
//! use std::sync::Arc;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = AppConfig::default();
//! let orchestrator = RequestOrchestrator::new(
//!     Arc::new(BearerTokenAuthenticator::new(None)),
//!     Arc::new(FixedWindowStore::new(config.rate_limit.clone())),
//!     Arc::new(GitHubClient::new(&config.source_control)?),
//!     None, // no generation key configured
//! );
//! # Ok(())
//! # }
//! ```

/// Authentication boundary: `Authenticator` trait, identities, and the
/// bearer-token implementation.
pub mod auth;

/// Configuration discovery, TOML loading, and environment overrides.
pub mod config;

/// Diff model, unified-diff parsing, and the source-control client boundary.
pub mod diff;

/// Closed error taxonomy with stable codes and the exposure policy.
pub mod error;

/// Content drafts, the generation-provider boundary, and the generator.
pub mod generation;

/// HTTP routing and response shaping.
pub mod http;

/// Request orchestration state machine.
pub mod pipeline;

/// Per-client rate limiting behind the `RateLimitStore` seam.
pub mod ratelimit;

/// Schema validation of the inbound generation payload.
pub mod validation;

pub use auth::{Authenticator, BearerTokenAuthenticator, Identity};
pub use config::AppConfig;
pub use diff::{DiffDocument, GitHubClient, SourceControlClient};
pub use error::{ApiError, ErrorExposure};
pub use generation::{ContentDraft, ContentGenerator, DraftKind, GeminiProvider};
pub use pipeline::{PipelineState, RequestOrchestrator};
pub use ratelimit::{FixedWindowStore, RateLimitStore};
pub use validation::{GenerateRequest, validate_generate_request};
