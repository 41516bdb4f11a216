//! # API Error Type
//!
//! Unified error type returned by [`BillingService`](crate::BillingService).
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Kirana POS                             │
//! │                                                                         │
//! │  ValidationError ──► CoreError ──┐                                      │
//! │                                  ├──► CheckoutError ──► ApiError        │
//! │  sqlx::Error ──────► DbError ────┘                       │              │
//! │                                                          ▼              │
//! │                                         { "code": "INSUFFICIENT_STOCK", │
//! │                                           "message": "Only 3 Toor ..." }│
//! │                                                                         │
//! │  Business rules  → specific, actionable message                         │
//! │  Infrastructure  → logged with tracing::error!, generic message         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;

use kirana_core::CoreError;
use kirana_db::{CheckoutError, DbError};

/// Result type for service operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// Error returned to callers of the billing service.
///
/// ## Serialization
/// ```json
/// {
///   "code": "SPLIT_MISMATCH",
///   "message": "Payments total ₹300.00 but the bill total is ₹350.40"
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
    /// Malformed or incomplete request (400)
    ValidationError,

    /// Unknown product, customer, bill or hold (404)
    NotFound,

    /// Not enough stock for a line (409)
    InsufficientStock,

    /// Split legs do not add up to the grand total (422)
    SplitMismatch,

    /// Any other business rule (422)
    BusinessRule,

    /// The database failed during the write; everything was rolled back (500)
    TransactionError,

    /// Internal error (500)
    Internal,
}

impl ErrorCode {
    /// HTTP status an adapter should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorCode::ValidationError => 400,
            ErrorCode::NotFound => 404,
            ErrorCode::InsufficientStock => 409,
            ErrorCode::SplitMismatch | ErrorCode::BusinessRule => 422,
            ErrorCode::TransactionError | ErrorCode::Internal => 500,
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

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    /// HTTP status for this error.
    pub fn http_status(&self) -> u16 {
        self.code.http_status()
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => ApiError::new(
                ErrorCode::ValidationError,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                ApiError::new(ErrorCode::ValidationError, "Invalid reference")
            }
            DbError::CheckViolation { message } => {
                tracing::error!("Constraint violation: {}", message);
                ApiError::new(ErrorCode::ValidationError, "Value out of range")
            }
            DbError::TransactionFailed(e) => {
                tracing::error!("Transaction failed: {}", e);
                ApiError::new(
                    ErrorCode::TransactionError,
                    "The bill could not be saved. Nothing was charged, please retry.",
                )
            }
            DbError::PoolExhausted => {
                tracing::error!("Database pool exhausted");
                ApiError::new(ErrorCode::TransactionError, "The system is busy, please retry.")
            }
            DbError::ConnectionFailed(e)
            | DbError::MigrationFailed(e)
            | DbError::QueryFailed(e)
            | DbError::Serialization(e)
            | DbError::Internal(e) => {
                tracing::error!("Database error: {}", e);
                ApiError::new(ErrorCode::Internal, "Database operation failed")
            }
        }
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ProductNotFound(id) => ApiError::not_found("Product", &id),
            CoreError::CustomerNotFound(id) => ApiError::not_found("Customer", &id),
            CoreError::BillNotFound(id) => ApiError::not_found("Bill", &id),
            CoreError::HeldBillNotFound(id) => ApiError::not_found("Held bill", &id),
            CoreError::InsufficientStock {
                product,
                available,
                requested,
                ..
            } => ApiError::new(
                ErrorCode::InsufficientStock,
                format!(
                    "Only {} {} in stock, {} requested",
                    available, product, requested
                ),
            ),
            CoreError::SplitMismatch { expected, actual } => ApiError::new(
                ErrorCode::SplitMismatch,
                format!(
                    "Payments total {} but the bill total is {}",
                    actual, expected
                ),
            ),
            CoreError::Validation(e) => ApiError::validation(e.to_string()),
            other @ (CoreError::StoreNotConfigured(_)
            | CoreError::InsufficientLoyaltyPoints { .. }
            | CoreError::ExcessDiscount { .. }
            | CoreError::InvalidBillStatus { .. }
            | CoreError::HeldBillAlreadyResumed(_)) => {
                ApiError::new(ErrorCode::BusinessRule, other.to_string())
            }
        }
    }
}

/// Converts checkout errors to API errors.
impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::Core(e) => {
                tracing::warn!(error = %e, "Checkout rejected");
                ApiError::from(e)
            }
            CheckoutError::Db(e) => ApiError::from(e),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}
