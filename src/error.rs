use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        FromRequest, FromRequestParts,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use crate::ai::normalize::NormalizeError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    BadRequest(String),

    #[error("Email already exists")]
    DuplicateAccount,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("AI provider not configured")]
    NotConfigured,

    #[error("AI provider request failed")]
    ProviderUnavailable(String),

    #[error("Unexpected AI provider response")]
    UnexpectedProviderResponse(String),

    #[error("No results found. Try a more specific query.")]
    NoResults,

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

/// JSON error envelope returned for every failed request.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) | ApiError::DuplicateAccount => StatusCode::BAD_REQUEST,
            ApiError::NoResults => StatusCode::NOT_FOUND,
            ApiError::NotConfigured
            | ApiError::ProviderUnavailable(_)
            | ApiError::UnexpectedProviderResponse(_)
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn details(&self) -> Option<String> {
        match self {
            ApiError::ProviderUnavailable(d) | ApiError::UnexpectedProviderResponse(d) => {
                Some(d.clone())
            }
            _ => None,
        }
    }
}

impl From<NormalizeError> for ApiError {
    fn from(e: NormalizeError) -> Self {
        match e {
            NormalizeError::NotConfigured => ApiError::NotConfigured,
            NormalizeError::ProviderUnavailable(d) => ApiError::ProviderUnavailable(d),
            NormalizeError::UnexpectedResponse(d) => ApiError::UnexpectedProviderResponse(d),
            NormalizeError::NoResults => ApiError::NoResults,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            ApiError::Internal(e) => error!(error = ?e, "request failed"),
            e if status.is_server_error() => {
                error!(error = %e, details = ?e.details(), "request failed")
            }
            e => warn!(%status, error = %e, "request rejected"),
        }

        let body = ErrorBody {
            error: self.to_string(),
            details: self.details(),
        };
        (status, Json(body)).into_response()
    }
}

/// `Json` extractor whose rejections use the API error envelope.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// `Query` extractor with the same envelope on rejection.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);
