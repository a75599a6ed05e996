//! Error responses for covid-api

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use covid_common::QueryError;
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or out-of-range date (400)
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// Unknown date or entity (404)
    #[error("Resource not found: {0}")]
    NotFound(String),
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::InvalidDate(msg) => ApiError::InvalidDate(msg),
            QueryError::NotFound(msg) => ApiError::NotFound(msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::InvalidDate(msg) => (StatusCode::BAD_REQUEST, "INVALID_DATE", msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_errors_map_to_client_statuses() {
        let invalid = ApiError::from(QueryError::InvalidDate("2020-13-01".to_string()));
        assert_eq!(invalid.into_response().status(), StatusCode::BAD_REQUEST);

        let missing = ApiError::from(QueryError::NotFound("Atlantis".to_string()));
        assert_eq!(missing.into_response().status(), StatusCode::NOT_FOUND);
    }
}
