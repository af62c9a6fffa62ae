/// Unified error types for the PSQR broadcaster
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the broadcaster
#[derive(Error, Debug)]
pub enum BroadcasterError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Cache store errors
    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    /// DID contains characters reserved for cache-key encoding, or is
    /// structurally unparseable
    #[error("Invalid DID syntax: {0}")]
    InvalidDidSyntax(String),

    /// DID document fetch failed (network, DNS, non-200)
    #[error("DID resolution failed: {0}")]
    ResolutionFailure(String),

    /// Signature token could not be parsed into header/payload/signature
    #[error("Malformed signature token: {0}")]
    MalformedToken(String),

    /// Token header names an algorithm other than the network-wide one
    #[error("Unsupported signature algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Signature verification came back negative
    #[error("Signature verification failed: {0}")]
    VerificationFailed(String),

    /// KID grant name or stored grant level is below what the operation needs
    #[error("Insufficient grant: {0}")]
    InsufficientGrant(String),

    /// No permission grant stored for the signing DID
    #[error("No grant record: {0}")]
    NoGrantRecord(String),

    /// Stored grant pins a KID that differs from the presented one
    #[error("KID mismatch: {0}")]
    KidMismatch(String),

    /// Grant exists but does not extend to the target resource
    #[error("Resource access denied: {0}")]
    ResourceAccessDenied(String),

    /// Feed cache TTL configuration is absent or unusable (fatal at startup)
    #[error("Misconfigured TTL: {0}")]
    MisconfiguredTtl(String),

    /// Index backend unreachable or returned a transport-level failure
    #[error("Index unavailable: {0}")]
    IndexUnavailable(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Convert BroadcasterError to HTTP response
impl IntoResponse for BroadcasterError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            BroadcasterError::InvalidDidSyntax(_) => (
                StatusCode::BAD_REQUEST,
                "InvalidDidSyntax",
                self.to_string(),
            ),
            BroadcasterError::MalformedToken(_) => (
                StatusCode::BAD_REQUEST,
                "MalformedToken",
                self.to_string(),
            ),
            BroadcasterError::UnsupportedAlgorithm(_) => (
                StatusCode::BAD_REQUEST,
                "UnsupportedAlgorithm",
                self.to_string(),
            ),
            BroadcasterError::Validation(_) => (
                StatusCode::BAD_REQUEST,
                "InvalidRequest",
                self.to_string(),
            ),
            BroadcasterError::VerificationFailed(_) => (
                StatusCode::UNAUTHORIZED,
                "VerificationFailed",
                self.to_string(),
            ),
            BroadcasterError::InsufficientGrant(_) => (
                StatusCode::FORBIDDEN,
                "InsufficientGrant",
                self.to_string(),
            ),
            BroadcasterError::NoGrantRecord(_) => (
                StatusCode::FORBIDDEN,
                "NoGrantRecord",
                self.to_string(),
            ),
            BroadcasterError::KidMismatch(_) => (
                StatusCode::FORBIDDEN,
                "KidMismatch",
                self.to_string(),
            ),
            BroadcasterError::ResourceAccessDenied(_) => (
                StatusCode::FORBIDDEN,
                "ResourceAccessDenied",
                self.to_string(),
            ),
            BroadcasterError::NotFound(_) => (
                StatusCode::NOT_FOUND,
                "NotFound",
                self.to_string(),
            ),
            BroadcasterError::ResolutionFailure(_) => (
                StatusCode::BAD_GATEWAY,
                "ResolutionFailure",
                self.to_string(),
            ),
            BroadcasterError::IndexUnavailable(_) => (
                StatusCode::BAD_GATEWAY,
                "IndexUnavailable",
                self.to_string(),
            ),
            BroadcasterError::MisconfiguredTtl(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "MisconfiguredTtl",
                self.to_string(),
            ),
            BroadcasterError::Database(_)
            | BroadcasterError::Cache(_)
            | BroadcasterError::Io(_)
            | BroadcasterError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "InternalServerError",
                "Internal server error".to_string(), // Don't leak details
            ),
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for broadcaster operations
pub type BroadcasterResult<T> = Result<T, BroadcasterError>;
