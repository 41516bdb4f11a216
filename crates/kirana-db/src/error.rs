//! # Database Errors
//!
//! [`DbError`] sorts SQLite failures into the cases a caller can act on.
//!
//! ```text
//! sqlx::Error
//!   ├── RowNotFound                       → NotFound
//!   ├── Database(kind = UniqueViolation)  → UniqueViolation { field }
//!   ├── Database(kind = ForeignKey...)    → ForeignKeyViolation
//!   ├── Database(kind = Check/NotNull)    → CheckViolation
//!   ├── Database(other)                   → QueryFailed
//!   ├── PoolTimedOut                      → PoolExhausted
//!   ├── PoolClosed                        → ConnectionFailed
//!   └── anything else                     → Internal
//! ```
//!
//! Inside a bill transaction, `QueryFailed` and `Internal` are promoted to
//! `TransactionFailed` and travel as `CheckoutError::Db`. The billing service
//! logs the detail and shows the cashier a generic message.

use sqlx::error::ErrorKind;
use thiserror::Error;

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// No row matched (lookup, conditional UPDATE or DELETE).
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A unique index rejected the row: SKU, phone, bill number or public id.
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// A CHECK or NOT NULL constraint fired, e.g. a negative loyalty balance.
    #[error("Constraint violation: {message}")]
    CheckViolation { message: String },

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// The bill transaction failed to begin, run or commit; nothing was written.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// The held-cart JSON column could not be encoded or decoded.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Fills in the offending value of a [`DbError::UniqueViolation`].
    /// SQLite only reports the column. Other variants pass through.
    pub fn with_duplicate_value(self, value: impl Into<String>) -> Self {
        match self {
            DbError::UniqueViolation { field, .. } => DbError::UniqueViolation {
                field,
                value: value.into(),
            },
            other => other,
        }
    }

    /// Classifies a failure to begin or commit a transaction.
    pub fn transaction(err: sqlx::Error) -> Self {
        DbError::from(err).in_transaction()
    }

    /// Reclassifies an error raised while a transaction was open. Generic
    /// query failures, such as `database is locked` after the busy timeout,
    /// become [`DbError::TransactionFailed`]; constraint and lookup errors
    /// keep their variant.
    pub fn in_transaction(self) -> Self {
        match self {
            DbError::Internal(msg) | DbError::QueryFailed(msg) => DbError::TransactionFailed(msg),
            other => other,
        }
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),

            sqlx::Error::Database(db_err) => {
                let message = db_err.message().to_string();
                match db_err.kind() {
                    // "UNIQUE constraint failed: products.store_id, products.sku"
                    ErrorKind::UniqueViolation => DbError::UniqueViolation {
                        field: message
                            .rsplit(": ")
                            .next()
                            .and_then(|columns| columns.rsplit(", ").next())
                            .unwrap_or("unknown")
                            .to_string(),
                        value: "unknown".to_string(),
                    },
                    ErrorKind::ForeignKeyViolation => DbError::ForeignKeyViolation { message },
                    ErrorKind::CheckViolation | ErrorKind::NotNullViolation => {
                        DbError::CheckViolation { message }
                    }
                    _ => DbError::QueryFailed(message),
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            other => DbError::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::Serialization(err.to_string())
    }
}
