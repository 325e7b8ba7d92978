//! Authentication boundary.
//!
//! The identity provider itself (sessions, accounts, storage) is an external
//! collaborator; the pipeline only depends on the [`Authenticator`] trait.
//! Failures are always generic toward the caller so nothing about which
//! check rejected them can be enumerated.

use crate::error::ApiError;
use futures::future::BoxFuture;
use std::collections::HashSet;
use std::hash::{DefaultHasher, Hash, Hasher};

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Stable key for rate limiting and logging. Derived from the
    /// credential; never the raw token.
    pub client_key: String,
    /// Bearer value forwarded to the source-control API on the caller's
    /// behalf.
    pub access_token: String,
}

pub trait Authenticator: Send + Sync {
    fn authenticate<'a>(
        &'a self,
        bearer: Option<&'a str>,
    ) -> BoxFuture<'a, Result<Identity, ApiError>>;
}

/// Bearer-token gate: rejects missing or empty credentials and, when an
/// accept list is configured, any token outside it. The accepted token
/// doubles as the source-host access token.
pub struct BearerTokenAuthenticator {
    accepted: Option<HashSet<String>>,
}

impl BearerTokenAuthenticator {
    /// `accepted = None` admits any non-empty bearer (an upstream identity
    /// provider is assumed to front the service); `Some` restricts to the
    /// listed tokens.
    pub fn new(accepted: Option<Vec<String>>) -> Self {
        Self {
            accepted: accepted.map(|tokens| tokens.into_iter().collect()),
        }
    }

    fn rejection() -> ApiError {
        ApiError::Authentication {
            message: "missing or invalid credential".to_string(),
        }
    }
}

impl Authenticator for BearerTokenAuthenticator {
    fn authenticate<'a>(
        &'a self,
        bearer: Option<&'a str>,
    ) -> BoxFuture<'a, Result<Identity, ApiError>> {
        Box::pin(async move {
            let token = match bearer {
                Some(token) if !token.trim().is_empty() => token.trim(),
                _ => return Err(Self::rejection()),
            };

            if let Some(accepted) = &self.accepted
                && !accepted.contains(token)
            {
                return Err(Self::rejection());
            }

            Ok(Identity {
                client_key: client_key_for(token),
                access_token: token.to_string(),
            })
        })
    }
}

fn client_key_for(token: &str) -> String {
    let mut hasher = DefaultHasher::new();
    token.hash(&mut hasher);
    format!("client-{:016x}", hasher.finish())
}
