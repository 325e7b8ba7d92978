//! HTTP surface over the request pipeline.
//!
//! Routing stays thin: handlers extract the bearer credential and the raw
//! JSON body, hand both to the orchestrator, and shape its outcome into a
//! response. Rate-limit headers ride on every response for which the
//! pipeline produced a decision; denials additionally carry `Retry-After`.
//!
//! A client disconnect drops the handler future, cancelling any in-flight
//! upstream call with it; nothing runs detached from the request.

use crate::error::ErrorExposure;
use crate::pipeline::{PipelineOutcome, RequestOrchestrator};
use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::{AUTHORIZATION, RETRY_AFTER};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

static X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
static X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
static X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<RequestOrchestrator>,
    pub exposure: ErrorExposure,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/generate", post(generate))
        .route("/repositories", get(list_repositories))
        .with_state(state)
}

async fn generate(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let bearer = bearer_token(&headers);
    // A non-JSON body validates the same as an empty payload: every field
    // is reported missing rather than leaking a parser error shape.
    let payload: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);

    let outcome = state
        .orchestrator
        .handle_generate(bearer.as_deref(), &payload)
        .await;
    shape_response(outcome, state.exposure)
}

async fn list_repositories(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let bearer = bearer_token(&headers);

    let outcome = state
        .orchestrator
        .handle_list_repositories(bearer.as_deref())
        .await;
    shape_response(outcome, state.exposure)
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    scheme
        .eq_ignore_ascii_case("bearer")
        .then(|| token.trim().to_string())
}

fn shape_response<T: Serialize>(outcome: PipelineOutcome<T>, exposure: ErrorExposure) -> Response {
    let mut response = match &outcome.result {
        Ok(value) => (StatusCode::OK, Json(value)).into_response(),
        Err(err) => {
            let status = StatusCode::from_u16(err.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            let mut response = (status, Json(err.to_body(exposure))).into_response();
            if let Some(secs) = err.retry_after_secs()
                && let Ok(value) = HeaderValue::from_str(&secs.to_string())
            {
                response.headers_mut().insert(RETRY_AFTER, value);
            }
            response
        }
    };

    if let Some(rate) = &outcome.rate {
        let headers = response.headers_mut();
        if let Ok(value) = HeaderValue::from_str(&rate.limit.to_string()) {
            headers.insert(X_RATELIMIT_LIMIT.clone(), value);
        }
        if let Ok(value) = HeaderValue::from_str(&rate.remaining.to_string()) {
            headers.insert(X_RATELIMIT_REMAINING.clone(), value);
        }
        if let Ok(value) = HeaderValue::from_str(&rate.reset_at.timestamp().to_string()) {
            headers.insert(X_RATELIMIT_RESET.clone(), value);
        }
    }

    response
}
