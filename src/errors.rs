use std::path::PathBuf;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Input rejected before any computation runs. `field` names the offending
/// request field using its wire (camelCase) name.
#[derive(Clone, Debug, Error, PartialEq)]
#[error("invalid `{field}`: {reason}")]
pub struct ValidationError {
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self { field: field.into(), reason: reason.into() }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: serde_json::Error },
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

/// Failures of the narrative collaborator. Never surfaced to API callers:
/// the narrator swaps in a templated summary instead.
#[derive(Debug, Error)]
pub enum NarrativeError {
    #[error("narrative request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("narrative service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("narrative service returned no text")]
    EmptyResponse,
    #[error("narrative service timed out after {0}s")]
    Timeout(u64),
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("malformed request body: {0}")]
    MalformedBody(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match &self {
            ApiError::Validation(err) => serde_json::json!({
                "error": err.to_string(),
                "field": err.field,
            }),
            ApiError::MalformedBody(_) => serde_json::json!({ "error": self.to_string() }),
        };
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_names_field_and_reason() {
        let err = ValidationError::new("monthlyConsumption", "must not be negative");
        assert_eq!(err.to_string(), "invalid `monthlyConsumption`: must not be negative");
    }

    #[test]
    fn api_errors_map_to_bad_request() {
        let resp = ApiError::from(ValidationError::new("usageType", "unknown usage type `shop`"))
            .into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = ApiError::MalformedBody("expected value".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
