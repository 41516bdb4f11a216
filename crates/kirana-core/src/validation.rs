//! # Validation Module
//!
//! Field-level validation for checkout requests and catalogue data.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Deserialization                                              │
//! │  └── Types and enum tags (tender mode, discount kind)                  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE (via CartRequest::validate)                      │
//! │  └── Ranges, formats, cross-field rules. Runs before any write.        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── UNIQUE (store_id, bill_number), UNIQUE (public_id)                │
//! │  ├── CHECK (loyalty_points >= 0)                                       │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use kirana_core::validation::{validate_hsn_code, validate_quantity};
//!
//! assert!(validate_quantity(5).is_ok());
//! assert!(validate_hsn_code("1006").is_ok());
//! assert!(validate_hsn_code("10063").is_err());
//! ```

use rust_decimal::Decimal;

use crate::error::ValidationError;
use crate::types::{TaxRate, GST_SLABS_BPS};
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY, MAX_NOTES_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Maximum length of a walk-in phone number.
pub const MAX_PHONE_LEN: usize = 20;

/// Maximum length of a payment reference (UPI txn id, card approval code).
pub const MAX_REFERENCE_LEN: usize = 100;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a SKU (Stock Keeping Unit).
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Only letters, digits, hyphens, underscores
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::Required {
            field: "sku".to_string(),
        });
    }

    if sku.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: 50,
        });
    }

    if !sku
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a product name (1-200 characters).
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.chars().count() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates an HSN code: 4, 6 or 8 ASCII digits.
pub fn validate_hsn_code(code: &str) -> ValidationResult<()> {
    let code = code.trim();

    if !matches!(code.len(), 4 | 6 | 8) || !code.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "hsn_code".to_string(),
            reason: "must be 4, 6 or 8 digits".to_string(),
        });
    }

    Ok(())
}

/// Validates optional free text against a maximum length.
pub fn validate_optional_text(
    field: &str,
    value: Option<&str>,
    max: usize,
) -> ValidationResult<()> {
    match value {
        Some(text) if text.chars().count() > max => Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        }),
        _ => Ok(()),
    }
}

/// Validates bill or hold notes (at most 500 characters).
pub fn validate_notes(notes: Option<&str>) -> ValidationResult<()> {
    validate_optional_text("notes", notes, MAX_NOTES_LEN)
}

/// Validates a walk-in phone number: at most 20 characters of digits,
/// spaces, `+` and `-`.
pub fn validate_phone(phone: Option<&str>) -> ValidationResult<()> {
    validate_optional_text("customer_phone", phone, MAX_PHONE_LEN)?;

    if let Some(phone) = phone {
        if !phone
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '+' | '-'))
        {
            return Err(ValidationError::InvalidFormat {
                field: "customer_phone".to_string(),
                reason: "must contain only digits, spaces, '+' and '-'".to_string(),
            });
        }
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (9999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a discount percentage (0-100 inclusive).
pub fn validate_discount_percent(field: &str, percent: Decimal) -> ValidationResult<()> {
    if percent < Decimal::ZERO || percent > Decimal::ONE_HUNDRED {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: 100,
        });
    }

    Ok(())
}

/// Validates a price in paise (zero allowed for free items).
pub fn validate_price_paise(field: &str, paise: i64) -> ValidationResult<()> {
    if paise < 0 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a payment leg amount in paise (must be positive).
pub fn validate_payment_amount(paise: i64) -> ValidationResult<()> {
    if paise <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "payment amount".to_string(),
        });
    }

    Ok(())
}

/// Validates that a GST rate is one of the slabs 0, 5, 12, 18, 28%.
pub fn validate_gst_rate(rate: TaxRate) -> ValidationResult<()> {
    if !rate.is_gst_slab() {
        return Err(ValidationError::NotAllowed {
            field: "gst_rate".to_string(),
            allowed: GST_SLABS_BPS
                .iter()
                .map(|bps| format!("{}%", bps / 100))
                .collect(),
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates the number of lines on a cart (1..=MAX_CART_ITEMS).
pub fn validate_cart_size(lines: usize) -> ValidationResult<()> {
    if lines == 0 {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }

    if lines > MAX_CART_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_CART_ITEMS as i64,
        });
    }

    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string format.
///
/// ## Example
/// ```rust
/// use kirana_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_validate_sku() {
        assert!(validate_sku("ATTA-5KG").is_ok());
        assert!(validate_sku("rice_basmati_1").is_ok());

        assert!(validate_sku("").is_err());
        assert!(validate_sku("   ").is_err());
        assert!(validate_sku("has space").is_err());
        assert!(validate_sku(&"A".repeat(100)).is_err());
    }

    #[test]
    fn test_validate_product_name() {
        assert!(validate_product_name("Amul Butter 500g").is_ok());
        assert!(validate_product_name("").is_err());
        assert!(validate_product_name(&"A".repeat(201)).is_err());
    }

    #[test]
    fn test_validate_hsn_code() {
        assert!(validate_hsn_code("0401").is_ok());
        assert!(validate_hsn_code("190531").is_ok());
        assert!(validate_hsn_code("21069099").is_ok());

        assert!(validate_hsn_code("123").is_err());
        assert!(validate_hsn_code("12345").is_err());
        assert!(validate_hsn_code("12AB").is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(9999).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(10_000).is_err());
    }

    #[test]
    fn test_validate_discount_percent() {
        assert!(validate_discount_percent("discount", dec!(0)).is_ok());
        assert!(validate_discount_percent("discount", dec!(12.5)).is_ok());
        assert!(validate_discount_percent("discount", dec!(100)).is_ok());

        assert!(validate_discount_percent("discount", dec!(-0.01)).is_err());
        assert!(validate_discount_percent("discount", dec!(100.01)).is_err());
    }

    #[test]
    fn test_validate_gst_rate() {
        for pct in [0, 5, 12, 18, 28] {
            assert!(validate_gst_rate(TaxRate::from_percent(pct)).is_ok());
        }
        assert!(validate_gst_rate(TaxRate::from_percent(10)).is_err());
        assert!(validate_gst_rate(TaxRate::from_bps(1750)).is_err());
    }

    #[test]
    fn test_validate_cart_size() {
        assert!(validate_cart_size(1).is_ok());
        assert!(validate_cart_size(100).is_ok());
        assert!(matches!(
            validate_cart_size(0),
            Err(ValidationError::Required { .. })
        ));
        assert!(validate_cart_size(101).is_err());
    }

    #[test]
    fn test_validate_text_fields() {
        assert!(validate_notes(None).is_ok());
        assert!(validate_notes(Some(&"n".repeat(500))).is_ok());
        assert!(validate_notes(Some(&"n".repeat(501))).is_err());

        assert!(validate_phone(Some("+91 98450-12345")).is_ok());
        assert!(validate_phone(Some("98450 12345 ext 9")).is_err());
        assert!(validate_phone(Some(&"9".repeat(21))).is_err());
    }

    #[test]
    fn test_validate_amounts() {
        assert!(validate_price_paise("mrp", 0).is_ok());
        assert!(validate_price_paise("mrp", -1).is_err());
        assert!(validate_payment_amount(1).is_ok());
        assert!(validate_payment_amount(0).is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("").is_err());
        assert!(validate_uuid("123").is_err());
    }
}
