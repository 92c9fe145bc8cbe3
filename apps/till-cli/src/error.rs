//! # API Error Type
//!
//! Unified error type returned by every CLI command.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Till POS                               │
//! │                                                                         │
//! │  till create --lines '[…]'                                              │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Command Function                                                │  │
//! │  │  Result<T, ApiError>                                             │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  SaleError::Domain(..) ── kind() ──► code + domain message ─────►│  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  SaleError::Storage(..) ── logged ──► INTERNAL + opaque message ►│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  stdout: {"code":"EXPIRED","message":"Coupon SAVE10 has expired"}       │
//! │  exit status: non-zero                                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use till_core::{CoreError, ErrorKind};
use till_db::{DbError, SaleError};

use crate::state::ConfigError;

/// Message shown for every internal failure. Details go to the log only.
pub const INTERNAL_MESSAGE: &str = "Failed to process transaction";

/// API error printed when a command fails.
///
/// ## Serialization
/// ```json
/// {
///   "code": "INSUFFICIENT_STOCK",
///   "message": "Insufficient stock for 8c0e…: available 2, requested 3"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Product, coupon or transaction not found
    NotFound,

    /// Input validation failed (bad arguments, malformed lines)
    ValidationError,

    /// Not enough inventory for a line
    InsufficientStock,

    /// Coupon past its expiration day
    Expired,

    /// Configuration could not be loaded
    ConfigError,

    /// Anything else; the message is opaque
    Internal,
}

impl From<ErrorKind> for ErrorCode {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::NotFound => ErrorCode::NotFound,
            ErrorKind::InsufficientStock => ErrorCode::InsufficientStock,
            ErrorKind::InvalidInput => ErrorCode::ValidationError,
            ErrorKind::Expired => ErrorCode::Expired,
            ErrorKind::Internal => ErrorCode::Internal,
        }
    }
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    /// Creates the opaque internal error.
    pub fn internal() -> Self {
        ApiError::new(ErrorCode::Internal, INTERNAL_MESSAGE)
    }
}

/// Converts Sale Engine errors, hiding storage details.
impl From<SaleError> for ApiError {
    fn from(err: SaleError) -> Self {
        let kind = err.kind();
        match err {
            SaleError::Domain(e) => ApiError::from(e),
            SaleError::Storage(e) if kind == ErrorKind::Internal => {
                tracing::error!(error = %e, "Storage failure");
                ApiError::internal()
            }
            SaleError::Storage(e) => ApiError::new(kind.into(), e.to_string()),
        }
    }
}

/// Converts database errors outside the engine (startup, catalog reads).
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        ApiError::from(SaleError::Storage(err))
    }
}

/// Domain errors keep their message.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        ApiError::new(err.kind().into(), err.to_string())
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::new(ErrorCode::ConfigError, err.to_string())
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}
