//! Error types for the Halseth authorization server.
//!
//! Uses `thiserror` for structured error handling with automatic `From` implementations.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};

/// Errors from the credential store layer.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// Query or statement failed
    #[error("Database error: {0}")]
    Database(String),

    /// Stored value could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Persistence layer could not be reached
    #[error("Connection error: {0}")]
    Connection(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                Self::Connection(err.to_string())
            }
            other => Self::Database(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Client-facing OAuth errors.
///
/// Serialized as `{error, error_description}` with the RFC 6749 error codes.
#[derive(thiserror::Error, Debug)]
pub enum OAuthError {
    /// Missing or malformed parameters
    #[error("{0}")]
    InvalidRequest(String),

    /// Code not found, used, expired, mismatched, or failed PKCE
    #[error("{0}")]
    InvalidGrant(String),

    /// Grant type other than `authorization_code`
    #[error("{0}")]
    UnsupportedGrantType(String),

    /// Bad passphrase or bad bearer credential
    #[error("{0}")]
    Unauthorized(String),

    /// Credential store failure
    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),
}

impl OAuthError {
    /// Create an invalid request error.
    #[must_use]
    pub fn invalid_request(description: impl Into<String>) -> Self {
        Self::InvalidRequest(description.into())
    }

    /// Create an invalid grant error.
    #[must_use]
    pub fn invalid_grant(description: impl Into<String>) -> Self {
        Self::InvalidGrant(description.into())
    }

    /// RFC 6749 error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::InvalidGrant(_) => "invalid_grant",
            Self::UnsupportedGrantType(_) => "unsupported_grant_type",
            Self::Unauthorized(_) => "unauthorized",
            Self::StoreUnavailable(_) => "server_error",
        }
    }

    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::InvalidGrant(_) | Self::UnsupportedGrantType(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::StoreUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Description safe to return to the caller.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::StoreUnavailable(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for OAuthError {
    fn into_response(self) -> Response {
        if let Self::StoreUnavailable(ref err) = self {
            tracing::error!(error = %err, "Credential store failure");
        }

        let mut response = (
            self.status(),
            Json(serde_json::json!({
                "error": self.error_code(),
                "error_description": self.description()
            })),
        )
            .into_response();

        response
            .headers_mut()
            .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
        response
    }
}

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type alias for OAuth operations.
pub type OAuthResult<T> = Result<T, OAuthError>;
