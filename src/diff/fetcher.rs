use crate::config::SourceControlConfig;
use crate::diff::types::{DiffDocument, DiffFetchError, Repository};
use futures::future::BoxFuture;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Source-control boundary consumed by the orchestrator.
///
/// The pipeline depends only on this contract; the underlying protocol is an
/// external collaborator concern. Mock implementations back the tests.
pub trait SourceControlClient: Send + Sync {
    fn fetch_commit_diff<'a>(
        &'a self,
        token: &'a str,
        owner: &'a str,
        repo: &'a str,
        commit_sha: &'a str,
    ) -> BoxFuture<'a, Result<DiffDocument, DiffFetchError>>;

    fn list_repositories<'a>(
        &'a self,
        token: &'a str,
    ) -> BoxFuture<'a, Result<Vec<Repository>, DiffFetchError>>;
}

/// GitHub implementation of [`SourceControlClient`].
pub struct GitHubClient {
    http: reqwest::Client,
    base_url: Url,
}

#[derive(Debug, Deserialize)]
struct RawRepository {
    name: String,
    owner: RawOwner,
    description: Option<String>,
    #[serde(default)]
    private: bool,
}

#[derive(Debug, Deserialize)]
struct RawOwner {
    login: String,
}

impl GitHubClient {
    pub fn new(config: &SourceControlConfig) -> Result<Self, DiffFetchError> {
        let base_url =
            Url::parse(&config.base_url).map_err(|e| DiffFetchError::UpstreamUnavailable {
                message: format!("invalid source-control base url: {e}"),
            })?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(concat!("commitcast/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DiffFetchError::UpstreamUnavailable {
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self { http, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url, DiffFetchError> {
        self.base_url
            .join(path)
            .map_err(|e| DiffFetchError::UpstreamUnavailable {
                message: format!("invalid endpoint path {path}: {e}"),
            })
    }

    fn auth_headers(token: &str, accept: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(accept));
        if let Ok(value) = HeaderValue::from_str(&format!("Bearer {token}")) {
            headers.insert(AUTHORIZATION, value);
        }
        headers
    }

    fn classify_status(status: StatusCode, resource: &str, headers: &HeaderMap) -> DiffFetchError {
        match status {
            StatusCode::UNAUTHORIZED => DiffFetchError::Unauthorized,
            StatusCode::FORBIDDEN => {
                // GitHub signals API quota exhaustion as 403 with a zeroed
                // remaining counter; anything else is a credential problem.
                let quota_exhausted = headers
                    .get("x-ratelimit-remaining")
                    .and_then(|v| v.to_str().ok())
                    .is_some_and(|v| v == "0");
                if quota_exhausted {
                    let retry_after_secs = headers
                        .get("retry-after")
                        .and_then(|v| v.to_str().ok())
                        .and_then(|v| v.parse().ok());
                    DiffFetchError::UpstreamRateLimited { retry_after_secs }
                } else {
                    DiffFetchError::Unauthorized
                }
            }
            StatusCode::NOT_FOUND | StatusCode::UNPROCESSABLE_ENTITY => DiffFetchError::NotFound {
                resource: resource.to_string(),
            },
            StatusCode::TOO_MANY_REQUESTS => DiffFetchError::UpstreamRateLimited {
                retry_after_secs: headers
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse().ok()),
            },
            other => DiffFetchError::UpstreamUnavailable {
                message: format!("unexpected status {other}"),
            },
        }
    }

    fn transport_error(err: reqwest::Error) -> DiffFetchError {
        if err.is_timeout() {
            DiffFetchError::UpstreamUnavailable {
                message: "request timed out".to_string(),
            }
        } else {
            DiffFetchError::UpstreamUnavailable {
                message: err.to_string(),
            }
        }
    }
}

impl SourceControlClient for GitHubClient {
    fn fetch_commit_diff<'a>(
        &'a self,
        token: &'a str,
        owner: &'a str,
        repo: &'a str,
        commit_sha: &'a str,
    ) -> BoxFuture<'a, Result<DiffDocument, DiffFetchError>> {
        Box::pin(async move {
            let url = self.endpoint(&format!("repos/{owner}/{repo}/commits/{commit_sha}"))?;
            debug!(%owner, %repo, %commit_sha, "fetching commit diff");

            let response = self
                .http
                .get(url)
                .headers(Self::auth_headers(token, "application/vnd.github.v3.diff"))
                .send()
                .await
                .map_err(Self::transport_error)?;

            let status = response.status();
            if !status.is_success() {
                let headers = response.headers().clone();
                warn!(%status, %owner, %repo, "commit diff fetch failed");
                return Err(Self::classify_status(
                    status,
                    &format!("commit {commit_sha}"),
                    &headers,
                ));
            }

            let raw = response.text().await.map_err(Self::transport_error)?;
            Ok(DiffDocument::parse(
                format!("{owner}/{repo}@{commit_sha}"),
                &raw,
            ))
        })
    }

    fn list_repositories<'a>(
        &'a self,
        token: &'a str,
    ) -> BoxFuture<'a, Result<Vec<Repository>, DiffFetchError>> {
        Box::pin(async move {
            let url = self.endpoint("user/repos?per_page=100")?;

            let response = self
                .http
                .get(url)
                .headers(Self::auth_headers(token, "application/vnd.github+json"))
                .send()
                .await
                .map_err(Self::transport_error)?;

            let status = response.status();
            if !status.is_success() {
                let headers = response.headers().clone();
                warn!(%status, "repository listing failed");
                return Err(Self::classify_status(status, "repositories", &headers));
            }

            let raw: Vec<RawRepository> = response
                .json()
                .await
                .map_err(|e| DiffFetchError::UpstreamUnavailable {
                    message: format!("malformed repository listing: {e}"),
                })?;

            Ok(raw
                .into_iter()
                .map(|r| Repository {
                    owner: r.owner.login,
                    name: r.name,
                    description: r.description,
                    private: r.private,
                })
                .collect())
        })
    }
}
