//! # kirana-core: Pure Business Logic for Kirana POS
//!
//! This crate is the **heart** of the checkout engine. It contains the GST
//! maths, the stock rules and the bill totals as pure functions with zero
//! I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Kirana POS Checkout Flow                         │
//! │                                                                         │
//! │  CartRequest (items + tender + discounts)                               │
//! │       │                                                                 │
//! │  ┌────▼────────────────────────────────────────────────────────────┐   │
//! │  │               ★ kirana-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐   ┌──────────┐   ┌──────────┐   ┌───────────┐   │   │
//! │  │   │  stock   │──►│   gst    │──►│ billing  │──►│   cart    │   │   │
//! │  │   │  guard   │   │ per line │   │  totals  │   │  tender   │   │   │
//! │  │   └──────────┘   └──────────┘   └──────────┘   └───────────┘   │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │            kirana-db (transactional bill writer)                │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Customer, Bill, BillItem, HeldBill, ...)
//! - [`money`] - Money type in integer paise
//! - [`gst`] - Per-line GST calculator (CGST/SGST or IGST)
//! - [`stock`] - Stock availability guard
//! - [`billing`] - Bill aggregator, round-off and discount apportionment
//! - [`cart`] - Checkout requests, tenders and held-cart payloads
//! - [`settings`] - Per-store configuration (numbering, rounding, loyalty)
//! - [`validation`] - Field-level validation rules
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: same input = same output, no hidden state
//! 2. **Integer Money**: persisted values are paise (i64)
//! 3. **Deferred Rounding**: GST intermediates keep full decimal precision
//!    and are rounded to paise only when bill totals are settled
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use kirana_core::gst::{calculate_line, LineInput};
//! use kirana_core::money::Money;
//! use kirana_core::types::{SupplyType, TaxMode, TaxRate};
//! use rust_decimal::Decimal;
//!
//! let line = calculate_line(&LineInput {
//!     unit_price: Money::from_paise(10000).to_decimal(), // ₹100.00
//!     quantity: 3,
//!     discount_percent: Decimal::TEN,
//!     gst_rate: TaxRate::from_percent(18),
//!     supply: SupplyType::IntraState,
//!     tax_mode: TaxMode::Exclusive,
//! });
//!
//! assert_eq!(Money::from_decimal(line.total_amount).paise(), 31860); // ₹318.60
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod billing;
pub mod cart;
pub mod error;
pub mod gst;
pub mod money;
pub mod settings;
pub mod stock;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use kirana_core::Money` instead of
// `use kirana_core::money::Money`

pub use billing::{aggregate, apportion, percent_to_bps, settle_line, BillTotals, SettledLine};
pub use cart::{
    BillDiscount, CartLine, CartRequest, HeldCart, HeldCartLine, HoldRequest, PaymentLeg, Tender,
};
pub use error::{CoreError, CoreResult, ValidationError};
pub use gst::{calculate_line, LineInput, LineTax};
pub use money::Money;
pub use settings::{RoundingMode, StoreSettings};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default store ID for single-store installs.
///
/// The schema is store-scoped everywhere; a single-counter shop simply
/// runs with this one store.
pub const DEFAULT_STORE_ID: &str = "00000000-0000-0000-0000-000000000001";

/// Maximum lines allowed in a single cart.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single line.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 10000 instead of 10)
pub const MAX_ITEM_QUANTITY: i64 = 9999;

/// Default lifetime of a held bill before it drops out of active listings.
pub const DEFAULT_HOLD_EXPIRY_HOURS: i64 = 24;

/// Maximum length of free-text bill and hold notes.
pub const MAX_NOTES_LEN: usize = 500;
