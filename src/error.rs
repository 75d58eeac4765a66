/// Unified error types for the ENS proof service
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the service
///
/// One variant per failure class a caller can observe. Each variant carries the
/// message that is surfaced to clients, and maps to a fixed wire code and
/// HTTP status at the serialization boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProofError {
    /// Malformed, empty or non-string caller input
    #[error("{0}")]
    InvalidInput(String),

    /// Upstream definitively reports no address for the name
    #[error("{0}")]
    NotFound(String),

    /// Upstream kept rate limiting after all retries
    #[error("{0}")]
    RateLimited(String),

    /// Any other upstream or transport failure during resolution
    #[error("{0}")]
    ResolveFailed(String),

    /// Upstream RPC endpoints are not configured
    #[error("{0}")]
    RpcUrlMissing(String),

    /// Invalid startup configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(String),
}

impl ProofError {
    /// Wire code exposed in error payloads
    pub fn code(&self) -> &'static str {
        match self {
            ProofError::InvalidInput(_) => "INVALID_INPUT",
            ProofError::NotFound(_) => "ENS_NOT_FOUND",
            ProofError::RateLimited(_) => "ENS_RESOLVE_RATE_LIMITED",
            ProofError::ResolveFailed(_) => "ENS_RESOLVE_FAILED",
            ProofError::RpcUrlMissing(_) => "RPC_URL_MISSING",
            ProofError::Config(_) | ProofError::Internal(_) | ProofError::Io(_) => {
                "INTERNAL_ERROR"
            }
        }
    }

    /// HTTP status suggested for this failure
    pub fn status(&self) -> StatusCode {
        match self {
            ProofError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ProofError::NotFound(_) => StatusCode::NOT_FOUND,
            ProofError::RateLimited(_) => StatusCode::SERVICE_UNAVAILABLE,
            ProofError::ResolveFailed(_)
            | ProofError::RpcUrlMissing(_)
            | ProofError::Config(_)
            | ProofError::Internal(_)
            | ProofError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing `{code, message}` body
    pub fn body(&self) -> ErrorBody {
        let message = match self {
            ProofError::Config(_) | ProofError::Internal(_) | ProofError::Io(_) => {
                "Unexpected error".to_string() // Don't leak details
            }
            _ => self.to_string(),
        };

        ErrorBody {
            code: self.code().to_string(),
            message,
        }
    }
}

impl From<std::io::Error> for ProofError {
    fn from(err: std::io::Error) -> Self {
        ProofError::Io(err.to_string())
    }
}

/// `{code, message}` pair shared by the single and batch surfaces
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// Top-level error response envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

/// Convert ProofError to HTTP response
impl IntoResponse for ProofError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = self.code(), "Request failed: {}", self);
        }

        let body = Json(ErrorResponse { error: self.body() });

        (status, body).into_response()
    }
}

/// Result type alias for service operations
pub type ProofResult<T> = Result<T, ProofError>;
