//! Schema validation of the inbound generation payload.
//!
//! Pure over its input. All failing fields are aggregated into a single
//! `VALIDATION_ERROR` with a per-field `details` list, so a caller can fix
//! everything in one round trip.

use crate::error::{ApiError, FieldError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::LazyLock;

static OWNER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9-]{0,37}[A-Za-z0-9])?$").unwrap());
static REPO_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._-]{1,100}$").unwrap());
static COMMIT_SHA_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9a-f]{40}$").unwrap());

/// A validated generation request. Only the validator constructs this;
/// downstream stages can rely on every invariant holding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenerateRequest {
    pub owner: String,
    pub repo_name: String,
    pub commit_sha: String,
}

pub fn validate_generate_request(payload: &Value) -> Result<GenerateRequest, ApiError> {
    let mut failures = Vec::new();

    let owner = checked_field(payload, "owner", &OWNER_RE, "host identifier", &mut failures);
    let repo_name = checked_field(payload, "repoName", &REPO_RE, "repository name", &mut failures);
    let commit_sha = checked_field(
        payload,
        "commitSha",
        &COMMIT_SHA_RE,
        "40 lowercase hex characters",
        &mut failures,
    );

    if !failures.is_empty() {
        return Err(ApiError::Validation { details: failures });
    }

    Ok(GenerateRequest {
        owner: owner.unwrap_or_default(),
        repo_name: repo_name.unwrap_or_default(),
        commit_sha: commit_sha.unwrap_or_default(),
    })
}

fn checked_field(
    payload: &Value,
    field: &'static str,
    pattern: &Regex,
    expectation: &str,
    failures: &mut Vec<FieldError>,
) -> Option<String> {
    let value = match payload.get(field) {
        None | Some(Value::Null) => {
            failures.push(FieldError {
                field,
                rule: "required",
                message: format!("{field} is required"),
            });
            return None;
        }
        Some(value) => value,
    };

    let text = match value.as_str() {
        Some(text) => text,
        None => {
            failures.push(FieldError {
                field,
                rule: "type",
                message: format!("{field} must be a string"),
            });
            return None;
        }
    };

    if text.is_empty() {
        failures.push(FieldError {
            field,
            rule: "non_empty",
            message: format!("{field} must not be empty"),
        });
        return None;
    }

    if !pattern.is_match(text) {
        failures.push(FieldError {
            field,
            rule: "format",
            message: format!("{field} must be {expectation}"),
        });
        return None;
    }

    Some(text.to_string())
}
