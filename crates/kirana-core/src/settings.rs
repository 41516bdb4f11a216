//! # Store Settings
//!
//! Per-store business configuration, loaded from the `store_settings` table
//! and passed explicitly into the aggregator and bill numbering.
//!
//! ## What Lives Here
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  StoreSettings                                                          │
//! │  ├── Numbering   invoice_prefix / invoice_suffix / next_invoice_number  │
//! │  ├── Tax         tax_mode (exclusive | inclusive), default_supply       │
//! │  ├── Rounding    nearest_rupee | nearest_paisa                          │
//! │  ├── Loyalty     enabled, earn rate, value of one point                 │
//! │  ├── Policy      reject_excess_discount, restock_on_cancel              │
//! │  └── Holds       hold_expiry_hours                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{SupplyType, TaxMode};
use crate::DEFAULT_HOLD_EXPIRY_HOURS;

/// Basis points in one whole unit.
const BPS: i128 = 10_000;

// =============================================================================
// Rounding Mode
// =============================================================================

/// How the grand total is settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RoundingMode {
    /// Round half up to a whole rupee (₹350.40 → ₹350, ₹350.50 → ₹351).
    NearestRupee,
    /// Keep paise; round-off is always zero.
    NearestPaisa,
}

impl RoundingMode {
    /// Settles an amount according to this mode.
    pub fn apply(&self, amount: Money) -> Money {
        match self {
            RoundingMode::NearestRupee => amount.round_to_rupee(),
            RoundingMode::NearestPaisa => amount,
        }
    }
}

impl Default for RoundingMode {
    fn default() -> Self {
        RoundingMode::NearestRupee
    }
}

// =============================================================================
// Store Settings
// =============================================================================

/// Configuration for one store.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StoreSettings {
    pub store_id: String,
    pub store_name: String,
    pub invoice_prefix: String,
    pub invoice_suffix: Option<String>,
    /// Sequence number the next bill will take.
    pub next_invoice_number: i64,
    pub tax_mode: TaxMode,
    pub default_supply: SupplyType,
    pub rounding: RoundingMode,
    pub loyalty_enabled: bool,
    /// Points earned per rupee, in basis points (10000 = 1 point per ₹1).
    /// `None` disables earning.
    pub loyalty_earn_bps: Option<u32>,
    /// Value of one point in paise (default 100 = ₹1).
    pub loyalty_redemption_paise: i64,
    /// Reject bills whose discounts exceed the payable amount.
    pub reject_excess_discount: bool,
    /// Default restock behaviour when a completed bill is cancelled.
    pub restock_on_cancel: bool,
    pub hold_expiry_hours: i64,
    pub currency_symbol: String,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl StoreSettings {
    /// Default settings for a new store.
    pub fn new(store_id: impl Into<String>, store_name: impl Into<String>) -> Self {
        StoreSettings {
            store_id: store_id.into(),
            store_name: store_name.into(),
            invoice_prefix: "INV".to_string(),
            invoice_suffix: None,
            next_invoice_number: 1,
            tax_mode: TaxMode::Exclusive,
            default_supply: SupplyType::IntraState,
            rounding: RoundingMode::NearestRupee,
            loyalty_enabled: true,
            loyalty_earn_bps: None,
            loyalty_redemption_paise: 100,
            reject_excess_discount: true,
            restock_on_cancel: false,
            hold_expiry_hours: DEFAULT_HOLD_EXPIRY_HOURS,
            currency_symbol: "₹".to_string(),
            updated_at: Utc::now(),
        }
    }

    /// Formats a bill number from a reserved sequence value.
    ///
    /// ## Example
    /// ```rust
    /// use kirana_core::settings::StoreSettings;
    ///
    /// let mut settings = StoreSettings::new("store-1", "Sharma Mart");
    /// settings.invoice_prefix = "SM".to_string();
    /// assert_eq!(settings.format_bill_number(42), "SM-000042");
    ///
    /// settings.invoice_suffix = Some("BLR".to_string());
    /// assert_eq!(settings.format_bill_number(42), "SM-000042-BLR");
    /// ```
    pub fn format_bill_number(&self, sequence: i64) -> String {
        match self.invoice_suffix.as_deref().map(str::trim) {
            Some(suffix) if !suffix.is_empty() => {
                format!("{}-{:06}-{}", self.invoice_prefix, sequence, suffix)
            }
            _ => format!("{}-{:06}", self.invoice_prefix, sequence),
        }
    }

    /// Rupee value of redeeming `points`.
    pub fn loyalty_value(&self, points: i64) -> Money {
        Money::from_paise(points.saturating_mul(self.loyalty_redemption_paise))
    }

    /// Points earned on a settled bill total, rounded down.
    pub fn points_earned(&self, grand_total: Money) -> i64 {
        if !self.loyalty_enabled || !grand_total.is_positive() {
            return 0;
        }

        match self.loyalty_earn_bps {
            Some(bps) if bps > 0 => {
                let points = i128::from(grand_total.paise()) * i128::from(bps) / (100 * BPS);
                i64::try_from(points).unwrap_or(i64::MAX)
            }
            _ => 0,
        }
    }

    /// How long a held bill stays in the active list.
    pub fn hold_expiry(&self) -> Duration {
        Duration::hours(self.hold_expiry_hours.max(1))
    }

    /// Formats money with the store's currency symbol.
    pub fn format_currency(&self, amount: Money) -> String {
        let sign = if amount.is_negative() { "-" } else { "" };
        format!(
            "{}{}{}.{:02}",
            sign,
            self.currency_symbol,
            amount.rupees().abs(),
            amount.paise_part()
        )
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
