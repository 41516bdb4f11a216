//! # Domain Types
//!
//! Core domain types used throughout Kirana POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Bill       │   │  BillPayment    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  sku (business) │   │  bill_number    │   │  bill_id (FK)   │       │
//! │  │  gst_rate_bps   │   │  public_id      │   │  method         │       │
//! │  │  stock_quantity │   │  grand_total    │   │  amount_paise   │       │
//! │  └─────────────────┘   └────────┬────────┘   └─────────────────┘       │
//! │                                 │ 1..n                                  │
//! │  ┌─────────────────┐   ┌────────▼────────┐   ┌─────────────────┐       │
//! │  │    Customer     │   │    BillItem     │   │    HeldBill     │       │
//! │  │  loyalty_points │   │  (snapshot of   │   │  HeldCart JSON  │       │
//! │  │  visit_count    │   │   the product)  │   │  expires_at     │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID: (sku, bill_number, ...) - human-readable
//!
//! Bills carry a third key, `public_id`, a separate random UUID used in
//! shareable receipt links so the internal id and the sequence-based bill
//! number never leave the store.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::cart::HeldCart;
use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// GST slabs in basis points: 0%, 5%, 12%, 18%, 28%.
pub const GST_SLABS_BPS: [u32; 5] = [0, 500, 1200, 1800, 2800];

/// GST rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01%. 1800 bps = 18%. Integer storage keeps the rate
/// exact in SQLite; [`TaxRate::as_percent`] hands the calculator an exact
/// decimal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a whole percentage (`18` = 18%).
    #[inline]
    pub const fn from_percent(pct: u32) -> Self {
        TaxRate(pct * 100)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as an exact decimal percentage (`18.00`).
    #[inline]
    pub fn as_percent(&self) -> Decimal {
        Decimal::new(i64::from(self.0), 2)
    }

    /// Zero tax rate (exempt staples).
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    /// Checks if tax rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the rate is one of the GST slabs.
    pub fn is_gst_slab(&self) -> bool {
        GST_SLABS_BPS.contains(&self.0)
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Supply Type / Tax Mode
// =============================================================================

/// Place of supply relative to the store's state.
///
/// ```text
/// IntraState: GST split equally into CGST + SGST
/// InterState: GST charged whole as IGST
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SupplyType {
    IntraState,
    InterState,
}

impl Default for SupplyType {
    fn default() -> Self {
        SupplyType::IntraState
    }
}

/// Whether catalogue prices include GST.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TaxMode {
    /// Price + GST shown separately.
    Exclusive,
    /// Price already includes GST (MRP-style shelf price).
    Inclusive,
}

impl Default for TaxMode {
    fn default() -> Self {
        TaxMode::Exclusive
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Store this product belongs to.
    pub store_id: String,

    /// Stock Keeping Unit - unique per store.
    pub sku: String,

    /// Display name shown to cashier and on the bill.
    pub name: String,

    /// HSN classification code (4, 6 or 8 digits).
    pub hsn_code: Option<String>,

    /// Selling unit (PCS, KG, LTR, ...).
    pub unit: String,

    /// Maximum retail price in paise.
    pub mrp_paise: i64,

    /// Purchase (cost) price in paise.
    pub purchase_price_paise: i64,

    /// Selling price in paise.
    pub selling_price_paise: i64,

    /// GST rate in basis points (1800 = 18%).
    pub gst_rate_bps: u32,

    /// Current stock level.
    pub stock_quantity: i64,

    /// Reorder threshold.
    pub min_stock_level: i64,

    /// Whether to track inventory for this product (false for services).
    pub is_track_inventory: bool,

    /// Allow selling when stock would go below zero.
    pub allow_negative_stock: bool,

    /// Whether product is active (inactive products are not sellable).
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the selling price as Money.
    #[inline]
    pub fn selling_price(&self) -> Money {
        Money::from_paise(self.selling_price_paise)
    }

    /// Returns the MRP as Money.
    #[inline]
    pub fn mrp(&self) -> Money {
        Money::from_paise(self.mrp_paise)
    }

    /// Returns the GST rate.
    #[inline]
    pub fn gst_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.gst_rate_bps)
    }

    /// Checks if the requested quantity can be sold.
    pub fn can_sell(&self, quantity: i64) -> bool {
        if !self.is_track_inventory {
            return true;
        }

        if self.stock_quantity >= quantity {
            return true;
        }

        self.allow_negative_stock
    }

    /// True when tracked stock is at or below the reorder threshold.
    pub fn is_low_stock(&self) -> bool {
        self.is_track_inventory && self.stock_quantity <= self.min_stock_level
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A registered customer with loyalty state.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub store_id: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    /// Redeemable loyalty balance (never negative).
    pub loyalty_points: i64,
    /// Lifetime purchases in paise.
    pub total_purchase_paise: i64,
    pub visit_count: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    /// Returns lifetime purchases as Money.
    #[inline]
    pub fn total_purchase(&self) -> Money {
        Money::from_paise(self.total_purchase_paise)
    }
}

// =============================================================================
// Bill Status
// =============================================================================

/// The status of a bill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum BillStatus {
    Draft,
    /// Paid and final. The only status checkout produces.
    Completed,
    Cancelled,
    Hold,
    Refunded,
}

impl BillStatus {
    /// Returns the stored representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            BillStatus::Draft => "draft",
            BillStatus::Completed => "completed",
            BillStatus::Cancelled => "cancelled",
            BillStatus::Hold => "hold",
            BillStatus::Refunded => "refunded",
        }
    }
}

impl Default for BillStatus {
    fn default() -> Self {
        BillStatus::Draft
    }
}

impl fmt::Display for BillStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Payment Method / Mode
// =============================================================================

/// How a single payment leg was settled.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Upi,
    Card,
    Wallet,
}

/// How the bill as a whole was paid. `Split` means more than one leg.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMode {
    Cash,
    Upi,
    Card,
    Wallet,
    Split,
}

impl From<PaymentMethod> for PaymentMode {
    fn from(method: PaymentMethod) -> Self {
        match method {
            PaymentMethod::Cash => PaymentMode::Cash,
            PaymentMethod::Upi => PaymentMode::Upi,
            PaymentMethod::Card => PaymentMode::Card,
            PaymentMethod::Wallet => PaymentMode::Wallet,
        }
    }
}

// =============================================================================
// Bill
// =============================================================================

/// A bill header. Immutable once completed except for cancellation fields.
///
/// ## Totals Identity
/// ```text
/// grand_total = subtotal − item_discount − bill_discount − loyalty_discount
///             + tax_total + round_off
/// ```
/// holds exactly in paise for every stored bill.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Bill {
    pub id: String,
    pub store_id: String,
    /// Sequence-based number, unique per store (`SM-000042-BLR`).
    pub bill_number: String,
    /// Opaque id for shareable receipt links.
    pub public_id: String,
    pub status: BillStatus,
    pub customer_id: Option<String>,
    /// Registered customer name or walk-in name.
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub cashier_id: String,
    pub supply_type: SupplyType,
    /// Σ price × quantity, before any discount or tax.
    pub subtotal_paise: i64,
    pub item_discount_paise: i64,
    pub bill_discount_paise: i64,
    /// Bill discount as a percentage of subtotal, in basis points.
    pub bill_discount_percent_bps: u32,
    pub loyalty_points_redeemed: i64,
    pub loyalty_discount_paise: i64,
    pub loyalty_points_earned: i64,
    pub taxable_paise: i64,
    pub tax_total_paise: i64,
    pub cgst_paise: i64,
    pub sgst_paise: i64,
    pub igst_paise: i64,
    /// Signed adjustment to the settled total.
    pub round_off_paise: i64,
    pub grand_total_paise: i64,
    pub payment_mode: PaymentMode,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub completed_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancelled_by: Option<String>,
    pub cancellation_reason: Option<String>,
}

impl Bill {
    /// Returns the grand total as Money.
    #[inline]
    pub fn grand_total(&self) -> Money {
        Money::from_paise(self.grand_total_paise)
    }

    /// Returns the round-off as Money.
    #[inline]
    pub fn round_off(&self) -> Money {
        Money::from_paise(self.round_off_paise)
    }

    /// Recomputes the grand total from the stored components.
    pub fn recomputed_grand_total(&self) -> Money {
        Money::from_paise(
            self.subtotal_paise - self.item_discount_paise - self.bill_discount_paise
                - self.loyalty_discount_paise
                + self.tax_total_paise
                + self.round_off_paise,
        )
    }
}

// =============================================================================
// Bill Item
// =============================================================================

/// A line item on a bill.
/// Uses the snapshot pattern to freeze product data at time of sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct BillItem {
    pub id: String,
    pub bill_id: String,
    /// Position on the bill, starting at 1.
    pub line_no: i64,
    pub product_id: String,
    /// Product name at time of sale (frozen).
    pub product_name: String,
    /// SKU at time of sale (frozen).
    pub product_sku: String,
    /// HSN code at time of sale (frozen).
    pub hsn_code: Option<String>,
    pub unit: String,
    /// MRP at time of sale (frozen).
    pub mrp_paise: i64,
    /// Selling price at time of sale (frozen, as charged on the shelf).
    pub selling_price_paise: i64,
    pub quantity: i64,
    /// Line discount in basis points (1000 = 10%).
    pub discount_percent_bps: u32,
    /// GST-exclusive price × quantity.
    pub line_total_paise: i64,
    pub discount_paise: i64,
    pub gst_rate_bps: u32,
    pub taxable_paise: i64,
    pub cgst_paise: i64,
    pub sgst_paise: i64,
    pub igst_paise: i64,
    /// taxable + GST, before bill-level discounts.
    pub total_paise: i64,
    /// This line's share of bill-level and loyalty discounts.
    pub bill_discount_share_paise: i64,
    /// total − bill discount share.
    pub net_amount_paise: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl BillItem {
    /// Returns the line total (taxable + GST) as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_paise(self.total_paise)
    }

    /// Returns the total GST on this line.
    #[inline]
    pub fn tax(&self) -> Money {
        Money::from_paise(self.cgst_paise + self.sgst_paise + self.igst_paise)
    }
}

// =============================================================================
// Bill Payment
// =============================================================================

/// One payment leg towards a bill. Split tenders have one row per leg.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct BillPayment {
    pub id: String,
    pub bill_id: String,
    pub method: PaymentMethod,
    pub amount_paise: i64,
    /// UPI transaction id, card approval code, wallet reference.
    pub reference: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl BillPayment {
    /// Returns the payment amount as Money.
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_paise(self.amount_paise)
    }
}

/// A bill with its line items and payments.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BillWithItems {
    pub bill: Bill,
    pub items: Vec<BillItem>,
    pub payments: Vec<BillPayment>,
}

// =============================================================================
// Held Bill
// =============================================================================

/// A suspended cart, parked mid-checkout.
///
/// Holding never touches stock or loyalty; those only change when the
/// resumed cart is checked out.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct HeldBill {
    /// Opaque hold reference (UUID v4).
    pub id: String,
    pub store_id: String,
    pub cashier_id: String,
    pub customer_name: Option<String>,
    pub notes: Option<String>,
    /// The parked cart.
    pub cart: HeldCart,
    /// Σ unit price snapshot × quantity at hold time.
    pub subtotal_paise: i64,
    pub item_count: i64,
    #[ts(as = "String")]
    pub held_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub expires_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub resumed_at: Option<DateTime<Utc>>,
}

impl HeldBill {
    /// True once `now` has reached the expiry time.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// True when the hold is neither resumed nor expired.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.resumed_at.is_none() && !self.is_expired(now)
    }
}

// =============================================================================
// Loyalty Ledger
// =============================================================================

/// Direction of a loyalty movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum LoyaltyKind {
    Earn,
    Redeem,
}

/// A loyalty ledger row. `points` is always positive; `kind` carries the sign.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct LoyaltyTransaction {
    pub id: String,
    pub store_id: String,
    pub customer_id: String,
    pub bill_id: String,
    pub kind: LoyaltyKind,
    pub points: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
