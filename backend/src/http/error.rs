//! HTTP error handling and response types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::db::repository::RepositoryError;

pub const UNAUTHED_ERR_MSG: &str = "Please login (10001)";
pub const NOT_ADMIN_ERR_MSG: &str = "Admin access required";

/// API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Application error type for HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// No valid session
    Unauthorized,
    /// Session present but the user is not an admin
    Forbidden,
    /// Repository error
    Repository(RepositoryError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Repository(e) => match e {
                RepositoryError::NotFound { .. } => StatusCode::NOT_FOUND,
                RepositoryError::ValidationError { .. } => StatusCode::BAD_REQUEST,
                RepositoryError::Conflict { .. } => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

fn repository_body(e: &RepositoryError) -> ApiError {
    let (code, message) = match e {
        RepositoryError::NotFound { message, .. } => ("NOT_FOUND", message.clone()),
        RepositoryError::ValidationError { message, .. } => ("BAD_REQUEST", message.clone()),
        RepositoryError::Conflict { message, .. } => ("CONFLICT", message.clone()),
        other => ("REPOSITORY_ERROR", other.to_string()),
    };
    let body = ApiError::new(code, message);
    match e.context().details.as_deref() {
        Some(details) if code == "BAD_REQUEST" => body.with_details(details),
        _ => body,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = match self {
            AppError::Unauthorized => ApiError::new("UNAUTHORIZED", UNAUTHED_ERR_MSG),
            AppError::Forbidden => ApiError::new("FORBIDDEN", NOT_ADMIN_ERR_MSG),
            AppError::Repository(e) => {
                if status.is_server_error() {
                    tracing::error!("Repository error: {}", e);
                }
                repository_body(&e)
            }
        };

        (status, Json(error)).into_response()
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        AppError::Repository(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_errors_map_to_statuses() {
        let cases = [
            (RepositoryError::not_found("x"), StatusCode::NOT_FOUND),
            (RepositoryError::validation("x"), StatusCode::BAD_REQUEST),
            (RepositoryError::conflict("x"), StatusCode::CONFLICT),
            (RepositoryError::connection("x"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).status(), status);
        }
    }

    #[test]
    fn test_auth_errors() {
        assert_eq!(AppError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::Forbidden.status(), StatusCode::FORBIDDEN);
    }
}
