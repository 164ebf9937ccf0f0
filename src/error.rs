//! Tracker error types with HTTP status code mapping.
//!
//! [`TrackerError`] is the closed error taxonomy for the whole service:
//! caller input problems, metrics registry misuse, and storage failures.
//! Handlers wrap it in [`ApiError`] to attach a human-readable context
//! before it becomes a JSON response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": "Failed to fetch logs",
///   "details": "pool closed: connection pool has been shut down",
///   "code": 3003
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// What the request was trying to do.
    pub error: String,
    /// Underlying cause, when one is available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Numeric error code (see [`TrackerError::error_code`]).
    pub code: u32,
}

/// Service-wide error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category          | HTTP Status               |
/// |-----------|-------------------|---------------------------|
/// | 1000–1999 | Caller input      | 500 Internal Server Error |
/// | 2000–2999 | Metrics registry  | 500 Internal Server Error |
/// | 3000–3999 | Storage           | 500 Internal Server Error |
/// | 4000–4999 | Startup           | 500 Internal Server Error |
///
/// Every core failure surfaces as a 500. The health endpoint is the only
/// route that answers 503, and it does so from a [`crate::domain::PoolState`]
/// rather than from an error.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    /// Malformed caller input, such as a non-positive limit.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A metric name was used before it was registered.
    #[error("unknown instrument: {0}")]
    UnknownInstrument(String),

    /// A metric name was registered twice.
    #[error("instrument already registered: {0}")]
    DuplicateInstrument(String),

    /// Label keys supplied to an instrument differ from its declared keys.
    #[error("label mismatch for {name}: expected [{expected}], got [{actual}]")]
    LabelCardinality {
        /// Instrument name.
        name: String,
        /// Declared label keys, comma separated.
        expected: String,
        /// Supplied label keys, comma separated.
        actual: String,
    },

    /// No pooled connection became available within the acquire timeout.
    #[error("timed out acquiring a database connection")]
    ConnectionTimeout,

    /// The storage layer rejected or failed the operation.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// The connection pool has been shut down.
    #[error("pool closed: connection pool has been shut down")]
    PoolClosed,

    /// Startup configuration could not be parsed.
    #[error("configuration error: {0}")]
    Config(String),
}

impl TrackerError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidArgument(_) => 1001,
            Self::UnknownInstrument(_) => 2001,
            Self::DuplicateInstrument(_) => 2002,
            Self::LabelCardinality { .. } => 2003,
            Self::ConnectionTimeout => 3001,
            Self::Persistence(_) => 3002,
            Self::PoolClosed => 3003,
            Self::Config(_) => 4001,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidArgument(_)
            | Self::UnknownInstrument(_)
            | Self::DuplicateInstrument(_)
            | Self::LabelCardinality { .. }
            | Self::ConnectionTimeout
            | Self::Persistence(_)
            | Self::PoolClosed
            | Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns `true` for failures raised by the storage layer.
    #[must_use]
    pub const fn is_storage(&self) -> bool {
        matches!(
            self,
            Self::ConnectionTimeout | Self::Persistence(_) | Self::PoolClosed
        )
    }
}

impl From<sqlx::Error> for TrackerError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut => Self::ConnectionTimeout,
            sqlx::Error::PoolClosed => Self::PoolClosed,
            other => Self::Persistence(other.to_string()),
        }
    }
}

impl IntoResponse for TrackerError {
    fn into_response(self) -> Response {
        ApiError::new("Request failed", self).into_response()
    }
}

/// A [`TrackerError`] paired with a description of the failed request.
///
/// Renders as `{"error": context, "details": source}`.
#[derive(Debug)]
pub struct ApiError {
    context: &'static str,
    source: TrackerError,
}

impl ApiError {
    /// Wraps `source` with a request-level description.
    #[must_use]
    pub const fn new(context: &'static str, source: TrackerError) -> Self {
        Self { context, source }
    }

    /// Returns a closure suitable for `map_err` that attaches `context`.
    pub fn context(context: &'static str) -> impl FnOnce(TrackerError) -> Self {
        move |source| Self::new(context, source)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.source.status_code();
        tracing::error!(code = self.source.error_code(), error = %self.source, "{}", self.context);
        let body = ErrorResponse {
            error: self.context.to_string(),
            details: Some(self.source.to_string()),
            code: self.source.error_code(),
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlx_pool_errors_map_to_dedicated_variants() {
        assert!(matches!(
            TrackerError::from(sqlx::Error::PoolTimedOut),
            TrackerError::ConnectionTimeout
        ));
        assert!(matches!(
            TrackerError::from(sqlx::Error::PoolClosed),
            TrackerError::PoolClosed
        ));
        assert!(matches!(
            TrackerError::from(sqlx::Error::RowNotFound),
            TrackerError::Persistence(_)
        ));
    }

    #[test]
    fn every_variant_is_a_server_error() {
        let errors = [
            TrackerError::InvalidArgument("limit".into()),
            TrackerError::UnknownInstrument("x".into()),
            TrackerError::ConnectionTimeout,
            TrackerError::PoolClosed,
        ];
        for err in errors {
            assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    #[test]
    fn storage_classification() {
        assert!(TrackerError::PoolClosed.is_storage());
        assert!(TrackerError::Persistence("boom".into()).is_storage());
        assert!(!TrackerError::InvalidArgument("limit".into()).is_storage());
    }

    #[test]
    fn api_error_uses_source_status() {
        let response = ApiError::new("Failed to fetch logs", TrackerError::PoolClosed).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
