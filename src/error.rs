//! Unified error taxonomy for the request pipeline.
//!
//! Every failure in the pipeline is expressed as one [`ApiError`] kind with a
//! stable machine-readable code and an HTTP status. The enum is closed: the
//! response-building boundary matches it exhaustively, so adding a kind is a
//! compile-visible change everywhere a response is shaped.

use serde::Serialize;
use std::fmt;

/// One failing field reported by the input validator.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub rule: &'static str,
    pub message: String,
}

/// Controls how much upstream detail reaches the client.
///
/// Production keeps external-API and unknown failures generic; development
/// mode includes the raw message for diagnosis. Server-side logs always carry
/// the full context regardless of mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorExposure {
    Production,
    Development,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    #[error("authentication failed")]
    Authentication { message: String },
    #[error("request validation failed")]
    Validation { details: Vec<FieldError> },
    #[error("{resource} not found")]
    NotFound { resource: String },
    #[error("rate limit exceeded")]
    RateLimit {
        retry_after_secs: u64,
        limit: u32,
        remaining: u32,
        reset_at: chrono::DateTime<chrono::Utc>,
    },
    #[error("upstream call to {api} ({endpoint}) failed: {message}")]
    ExternalApi {
        api: &'static str,
        endpoint: &'static str,
        message: String,
    },
    #[error("missing configuration: {message}")]
    Configuration { message: String },
    #[error("internal error: {message}")]
    Unknown { message: String },
}

/// Response body shape shared by every failure, serialized as
/// `{error, code, details?}`.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn external(api: &'static str, endpoint: &'static str, message: impl fmt::Display) -> Self {
        Self::ExternalApi {
            api,
            endpoint,
            message: message.to_string(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Stable machine-readable code for the client.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Authentication { .. } => "AUTHENTICATION_ERROR",
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::RateLimit { .. } => "RATE_LIMITED",
            Self::ExternalApi { .. } => "EXTERNAL_API_ERROR",
            Self::Configuration { .. } => "CONFIGURATION_ERROR",
            Self::Unknown { .. } => "INTERNAL_ERROR",
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            Self::Authentication { .. } => 401,
            Self::Validation { .. } => 400,
            Self::NotFound { .. } => 404,
            Self::RateLimit { .. } => 429,
            Self::ExternalApi { .. } => 502,
            Self::Configuration { .. } | Self::Unknown { .. } => 500,
        }
    }

    /// Seconds the client should wait before retrying, when the failure is a
    /// rate-limit denial.
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            Self::RateLimit {
                retry_after_secs, ..
            } => Some(*retry_after_secs),
            _ => None,
        }
    }

    /// Shape the client-facing body under the given exposure policy.
    ///
    /// Authentication failures are always generic so a caller cannot probe
    /// which check rejected them. Validation and rate-limit failures carry
    /// actionable detail in every mode.
    pub fn to_body(&self, exposure: ErrorExposure) -> ErrorBody {
        match self {
            Self::Authentication { .. } => ErrorBody {
                error: "authentication failed".to_string(),
                code: self.code(),
                details: None,
            },
            Self::Validation { details } => ErrorBody {
                error: "request validation failed".to_string(),
                code: self.code(),
                details: serde_json::to_value(details).ok(),
            },
            Self::NotFound { resource } => ErrorBody {
                error: format!("{resource} not found"),
                code: self.code(),
                details: None,
            },
            Self::RateLimit {
                retry_after_secs, ..
            } => ErrorBody {
                error: "rate limit exceeded".to_string(),
                code: self.code(),
                details: Some(serde_json::json!({ "retryAfter": retry_after_secs })),
            },
            Self::ExternalApi { api, message, .. } => ErrorBody {
                error: match exposure {
                    ErrorExposure::Production => format!("{api} request failed"),
                    ErrorExposure::Development => format!("{api} request failed: {message}"),
                },
                code: self.code(),
                details: None,
            },
            Self::Configuration { message } => ErrorBody {
                error: match exposure {
                    ErrorExposure::Production => "server configuration error".to_string(),
                    ErrorExposure::Development => message.clone(),
                },
                code: self.code(),
                details: None,
            },
            Self::Unknown { message } => ErrorBody {
                error: match exposure {
                    ErrorExposure::Production => "internal server error".to_string(),
                    ErrorExposure::Development => message.clone(),
                },
                code: self.code(),
                details: None,
            },
        }
    }
}

/// Classifier for failures that escaped the typed paths.
///
/// Known kinds pass through untouched; anything else collapses into
/// [`ApiError::Unknown`] and the caller is expected to log it with full
/// context before responding.
impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<ApiError>() {
            Ok(known) => known,
            Err(other) => Self::Unknown {
                message: other.to_string(),
            },
        }
    }
}
