//! # GST Calculator
//!
//! Per-line discount, taxable value and GST split.
//!
//! ## Algorithm
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  line_total      = unit_price × quantity                                │
//! │  discount_amount = line_total × discount% / 100                         │
//! │  taxable_amount  = line_total − discount_amount                         │
//! │                                                                         │
//! │  IntraState ──► cgst = sgst = taxable × (rate / 2) / 100,  igst = 0     │
//! │  InterState ──► igst = taxable × rate / 100,        cgst = sgst = 0     │
//! │                                                                         │
//! │  total_tax    = cgst + sgst + igst                                      │
//! │  total_amount = taxable_amount + total_tax                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every value is a full-precision [`Decimal`] rupee amount. Nothing is
//! rounded here: the bill aggregator settles to paise once, so per-line
//! rounding never compounds across a long bill.
//!
//! ## Tax-Inclusive Prices
//! With [`TaxMode::Inclusive`] the shelf price already contains GST. The
//! exclusive unit price `price × 100 / (100 + rate)` is derived first and
//! the algorithm above runs unchanged.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{SupplyType, TaxMode, TaxRate};

/// Inputs for one bill line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineInput {
    /// Shelf price per unit in rupees.
    pub unit_price: Decimal,
    /// Must be positive; checked by request validation.
    pub quantity: i64,
    /// 0 to 100.
    pub discount_percent: Decimal,
    pub gst_rate: TaxRate,
    pub supply: SupplyType,
    pub tax_mode: TaxMode,
}

/// Full-precision result for one bill line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineTax {
    /// GST-exclusive unit price × quantity (`lineTotal`).
    pub base_amount: Decimal,
    pub discount_amount: Decimal,
    pub taxable_amount: Decimal,
    pub cgst: Decimal,
    pub sgst: Decimal,
    pub igst: Decimal,
    pub total_tax: Decimal,
    pub total_amount: Decimal,
}

/// Computes discount, taxable value and GST for a single line.
///
/// ## Example
/// ```rust
/// use kirana_core::gst::{calculate_line, LineInput};
/// use kirana_core::types::{SupplyType, TaxMode, TaxRate};
/// use rust_decimal::Decimal;
///
/// let tax = calculate_line(&LineInput {
///     unit_price: Decimal::ONE_HUNDRED,
///     quantity: 3,
///     discount_percent: Decimal::TEN,
///     gst_rate: TaxRate::from_percent(18),
///     supply: SupplyType::IntraState,
///     tax_mode: TaxMode::Exclusive,
/// });
///
/// assert_eq!(tax.taxable_amount, Decimal::new(270, 0));
/// assert_eq!(tax.cgst, Decimal::new(243, 1));
/// assert_eq!(tax.cgst, tax.sgst);
/// ```
pub fn calculate_line(input: &LineInput) -> LineTax {
    let unit_price = match input.tax_mode {
        TaxMode::Exclusive => input.unit_price,
        TaxMode::Inclusive => exclusive_unit_price(input.unit_price, input.gst_rate),
    };

    let base_amount = unit_price * Decimal::from(input.quantity);
    let discount_amount = base_amount * input.discount_percent / Decimal::ONE_HUNDRED;
    let taxable_amount = base_amount - discount_amount;

    let rate = input.gst_rate.as_percent();
    let (cgst, sgst, igst) = match input.supply {
        SupplyType::IntraState => {
            let half = taxable_amount * (rate / Decimal::TWO) / Decimal::ONE_HUNDRED;
            (half, half, Decimal::ZERO)
        }
        SupplyType::InterState => {
            let igst = taxable_amount * rate / Decimal::ONE_HUNDRED;
            (Decimal::ZERO, Decimal::ZERO, igst)
        }
    };

    let total_tax = cgst + sgst + igst;

    LineTax {
        base_amount,
        discount_amount,
        taxable_amount,
        cgst,
        sgst,
        igst,
        total_tax,
        total_amount: taxable_amount + total_tax,
    }
}

/// Strips GST out of a tax-inclusive price: `price × 100 / (100 + rate)`.
pub fn exclusive_unit_price(inclusive_price: Decimal, rate: TaxRate) -> Decimal {
    if rate.is_zero() {
        return inclusive_price;
    }
    inclusive_price * Decimal::ONE_HUNDRED / (Decimal::ONE_HUNDRED + rate.as_percent())
}

// =============================================================================
// Unit Tests
// =============================================================================
