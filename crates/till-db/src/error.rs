//! # Database Error Types
//!
//! Storage errors, and the combined error the Sale Engine returns.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  sqlx::Error ──► DbError ──┐                                           │
//! │                            ├──► SaleError ──► ApiError (till-cli)      │
//! │  CoreError ────────────────┘        │                                  │
//! │                                     └── kind(): NotFound | Expired |   │
//! │                                         InsufficientStock |            │
//! │                                         InvalidInput | Internal        │
//! │                                                                         │
//! │  Returning any of these from inside the atomic scope drops the open    │
//! │  sqlx transaction, which rolls the whole sale back.                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;
use till_core::{CoreError, ErrorKind, ValidationError};

// =============================================================================
// DbError
// =============================================================================

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation (e.g. a second coupon with the same name).
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    ///
    /// ## When This Occurs
    /// - A product references a missing category
    /// - Deleting a product that still has ledger lines
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// CHECK constraint violation (negative inventory, percentage > 100).
    #[error("Constraint violation: {message}")]
    CheckViolation { message: String },

    /// Catalog input rejected before reaching SQL.
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// The atomic scope could not complete (lost an inventory race,
    /// commit failed).
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// The write lock was not released within the busy timeout.
    #[error("Database is busy")]
    Busy,

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Analyze message for constraint type / lock
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // SQLite reports constraint failures as
                // "<KIND> constraint failed: <table>.<column>"
                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else if msg.contains("CHECK constraint failed") {
                    DbError::CheckViolation {
                        message: msg.to_string(),
                    }
                } else if msg.contains("database is locked") || msg.contains("database is busy") {
                    DbError::Busy
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// SaleError
// =============================================================================

/// Error returned by the Sale Engine and the query layer.
///
/// Domain errors pass through untouched so the caller sees the same kind
/// that aborted the scope. Storage errors are internal, except a missing
/// ledger row, which is reported as `NotFound`.
#[derive(Debug, Error)]
pub enum SaleError {
    #[error(transparent)]
    Domain(#[from] CoreError),

    #[error(transparent)]
    Storage(#[from] DbError),
}

impl SaleError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SaleError::Domain(err) => err.kind(),
            SaleError::Storage(DbError::NotFound { .. }) => ErrorKind::NotFound,
            SaleError::Storage(DbError::Validation(_)) => ErrorKind::InvalidInput,
            SaleError::Storage(_) => ErrorKind::Internal,
        }
    }

    /// True for failures that must be hidden from the caller.
    pub fn is_internal(&self) -> bool {
        self.kind() == ErrorKind::Internal
    }
}

impl From<ValidationError> for SaleError {
    fn from(err: ValidationError) -> Self {
        SaleError::Domain(CoreError::Validation(err))
    }
}

impl From<sqlx::Error> for SaleError {
    fn from(err: sqlx::Error) -> Self {
        SaleError::Storage(DbError::from(err))
    }
}

/// Result type for Sale Engine operations.
pub type SaleResult<T> = Result<T, SaleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err = DbError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[test]
    fn test_sale_error_kinds() {
        let err = SaleError::from(CoreError::CouponExpired("SAVE10".into()));
        assert_eq!(err.kind(), ErrorKind::Expired);
        assert!(!err.is_internal());

        let err = SaleError::from(ValidationError::Required {
            field: "lines".into(),
        });
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let err = SaleError::from(DbError::not_found("Transaction", "t-1"));
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = SaleError::from(DbError::TransactionFailed("lost race".into()));
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert!(err.is_internal());

        let err = SaleError::from(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, SaleError::Storage(DbError::PoolExhausted)));
    }

    #[test]
    fn test_domain_message_is_preserved() {
        let err = SaleError::from(CoreError::ProductNotFound("p-9".into()));
        assert_eq!(err.to_string(), "Product not found: p-9");
    }
}
