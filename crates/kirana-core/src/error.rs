//! # Error Types
//!
//! Domain-specific error types for kirana-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  kirana-core errors (this file)                                        │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Malformed requests                             │
//! │                                                                         │
//! │  kirana-db errors (separate crate)                                     │
//! │  ├── DbError          - Database operation failures                    │
//! │  └── CheckoutError    - Core | Db, raised inside the bill transaction  │
//! │                                                                         │
//! │  kirana-billing errors                                                 │
//! │  └── ApiError         - What the caller sees (serialized)              │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → CheckoutError → ApiError          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Messages name the product, bill or hold involved; the billing layer
//! shows them to the cashier as they are.

use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// A checkout, hold or cancellation broke a business rule.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product cannot be found.
    ///
    /// ## When This Occurs
    /// - Product ID doesn't exist in the store
    /// - Product was deactivated (not sellable)
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Customer referenced by a cart does not exist in the store.
    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    /// Bill cannot be found (by id or public id).
    #[error("Bill not found: {0}")]
    BillNotFound(String),

    /// Held bill cannot be found (unknown or already deleted).
    #[error("Held bill not found: {0}")]
    HeldBillNotFound(String),

    /// No settings row exists for the store.
    #[error("Store is not configured: {0}")]
    StoreNotConfigured(String),

    /// Insufficient stock to complete the bill.
    ///
    /// ## When This Occurs
    /// - Trying to sell more than available stock
    /// - Product has is_track_inventory=true and allow_negative_stock=false
    ///
    /// ## User Workflow
    /// ```text
    /// Cart line (Toor Dal 1kg, qty: 5)
    ///      │
    ///      ▼
    /// Check stock: available=3
    ///      │
    ///      ▼
    /// InsufficientStock { product: "Toor Dal 1kg", available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// UI shows: "Only 3 Toor Dal 1kg in stock"
    /// ```
    #[error("Insufficient stock for {product} ({sku}): available {available}, requested {requested}")]
    InsufficientStock {
        product: String,
        sku: String,
        available: i64,
        requested: i64,
    },

    /// Split payment legs do not add up to the grand total.
    #[error("Split payments total {actual} but the bill total is {expected}")]
    SplitMismatch { expected: Money, actual: Money },

    /// Customer does not have enough loyalty points for the redemption.
    #[error("Customer has {available} loyalty points, cannot redeem {requested}")]
    InsufficientLoyaltyPoints { available: i64, requested: i64 },

    /// Bill-level and loyalty discounts exceed the payable amount.
    #[error("Discounts of {discount} exceed the payable amount of {payable}")]
    ExcessDiscount { discount: Money, payable: Money },

    /// Bill is not in a state that allows the requested operation.
    ///
    /// ## When This Occurs
    /// - Cancelling a bill that is already cancelled
    /// - Cancelling a draft or refunded bill
    #[error("Bill {bill_id} is {current_status}, cannot perform operation")]
    InvalidBillStatus {
        bill_id: String,
        current_status: String,
    },

    /// Held bill was already resumed into a live cart.
    #[error("Held bill {0} has already been resumed")]
    HeldBillAlreadyResumed(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when a request doesn't meet requirements.
/// Used for early validation before any write happens.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, invalid HSN code).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Duplicate value (e.g., duplicate SKU).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },

    /// Two fields contradict each other.
    #[error("{field}: {reason}")]
    Inconsistent { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            product: "Toor Dal 1kg".to_string(),
            sku: "DAL-TOOR-1KG".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Toor Dal 1kg (DAL-TOOR-1KG): available 3, requested 5"
        );
    }

    #[test]
    fn test_split_mismatch_message_uses_rupees() {
        let err = CoreError::SplitMismatch {
            expected: Money::from_paise(35040),
            actual: Money::from_paise(30000),
        };
        assert_eq!(
            err.to_string(),
            "Split payments total ₹300.00 but the bill total is ₹350.40"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "items".to_string(),
        };
        assert_eq!(err.to_string(), "items is required");

        let err = ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: 9999,
        };
        assert_eq!(err.to_string(), "quantity must be between 1 and 9999");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "items".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
