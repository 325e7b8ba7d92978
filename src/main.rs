use anyhow::{Context, Result};
use clap::Parser;
use commitcast::auth::BearerTokenAuthenticator;
use commitcast::config::AppConfig;
use commitcast::diff::GitHubClient;
use commitcast::error::ErrorExposure;
use commitcast::generation::{ContentGenerator, GeminiProvider};
use commitcast::http::{AppState, router};
use commitcast::pipeline::RequestOrchestrator;
use commitcast::ratelimit::FixedWindowStore;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "commitcast", version, about = "Commit diff to marketing drafts service")]
struct Args {
    /// Configuration file path; skips the discovery hierarchy.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Bind address override, e.g. 0.0.0.0:8080.
    #[arg(long)]
    bind: Option<String>,

    /// Development mode: error bodies include raw upstream messages.
    #[arg(long)]
    dev: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "commitcast=info".to_string()),
        )
        .init();

    info!("Starting commitcast");

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => AppConfig::from_toml_file(path)?,
        None => AppConfig::discover()?,
    };
    config.apply_env();

    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if args.dev {
        config.development_mode = true;
    }

    let exposure = if config.development_mode {
        ErrorExposure::Development
    } else {
        ErrorExposure::Production
    };

    let accepted_tokens = if config.accepted_tokens.is_empty() {
        None
    } else {
        Some(config.accepted_tokens.clone())
    };
    let authenticator = Arc::new(BearerTokenAuthenticator::new(accepted_tokens));
    let rate_limiter = Arc::new(FixedWindowStore::new(config.rate_limit.clone()));
    let source_control = Arc::new(
        GitHubClient::new(&config.source_control)
            .context("failed to construct source-control client")?,
    );

    let generator = if config.generation.api_key.is_some() {
        let provider = GeminiProvider::new(&config.generation)
            .context("failed to construct generation provider")?;
        Some(ContentGenerator::new(
            Arc::new(provider),
            config.generation.max_retries,
            config.generation.backoff_base_ms,
        ))
    } else {
        warn!("generation provider API key is not configured; /generate will fail until it is set");
        None
    };

    let orchestrator = Arc::new(RequestOrchestrator::new(
        authenticator,
        rate_limiter,
        source_control,
        generator,
    ));

    let app = router(AppState {
        orchestrator,
        exposure,
    });

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "listening");

    axum::serve(listener, app)
        .await
        .context("server terminated unexpectedly")?;

    Ok(())
}
