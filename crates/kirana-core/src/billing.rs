//! # Bill Aggregator
//!
//! Folds per-line GST results into settled bill totals.
//!
//! ## Settlement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Full precision (Decimal)          Settled (paise)                      │
//! │  ─────────────────────────         ──────────────────────────────────   │
//! │  Σ base_amount        ──round──►   subtotal                             │
//! │  Σ discount_amount    ──round──►   item_discount                        │
//! │  Σ cgst / sgst / igst ──round──►   cgst / sgst / igst                   │
//! │                                    tax_total = cgst + sgst + igst       │
//! │  bill discount        ──round──►   bill_discount (percent → amount      │
//! │                                    from the unrounded subtotal)         │
//! │  points × value                    loyalty_discount                     │
//! │                                                                         │
//! │  pre_round   = subtotal − item_discount − bill_discount                 │
//! │              − loyalty_discount + tax_total                             │
//! │  grand_total = RoundingMode::apply(pre_round), floored at zero          │
//! │  round_off   = grand_total − pre_round   (signed)                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Because every component is settled before `round_off` is derived, the
//! stored identity `grand = subtotal − discounts + tax + round_off` holds
//! to the paisa.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::cart::BillDiscount;
use crate::gst::LineTax;
use crate::money::Money;
use crate::settings::StoreSettings;

// =============================================================================
// Bill Totals
// =============================================================================

/// Settled totals for a bill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillTotals {
    pub subtotal: Money,
    pub item_discount: Money,
    pub bill_discount: Money,
    /// Bill discount as a share of subtotal, in basis points.
    pub bill_discount_percent_bps: u32,
    pub loyalty_discount: Money,
    pub taxable: Money,
    pub cgst: Money,
    pub sgst: Money,
    pub igst: Money,
    pub tax_total: Money,
    /// Total before settlement rounding (may be negative on over-discount).
    pub pre_round: Money,
    pub round_off: Money,
    pub grand_total: Money,
    /// Bill and loyalty discounts exceeded the payable amount; the grand
    /// total was floored at zero.
    pub discount_exceeds_payable: bool,
}

impl BillTotals {
    /// Amount payable before bill-level and loyalty discounts.
    pub fn payable_before_discounts(&self) -> Money {
        self.subtotal - self.item_discount + self.tax_total
    }

    /// Bill-level plus loyalty discount, the amount apportioned over lines.
    pub fn apportioned_discount(&self) -> Money {
        self.bill_discount + self.loyalty_discount
    }
}

/// Aggregates line results into settled bill totals.
///
/// `loyalty_points` are valued with the store's redemption rate; balance
/// checks happen in the bill writer.
///
/// ## Example
/// ```rust
/// use kirana_core::billing::aggregate;
/// use kirana_core::gst::{calculate_line, LineInput};
/// use kirana_core::settings::StoreSettings;
/// use kirana_core::types::{SupplyType, TaxMode, TaxRate};
/// use rust_decimal::Decimal;
///
/// let line = calculate_line(&LineInput {
///     unit_price: Decimal::new(35040, 2),
///     quantity: 1,
///     discount_percent: Decimal::ZERO,
///     gst_rate: TaxRate::zero(),
///     supply: SupplyType::IntraState,
///     tax_mode: TaxMode::Exclusive,
/// });
///
/// let totals = aggregate(&[line], None, 0, &StoreSettings::new("s1", "Demo"));
/// assert_eq!(totals.grand_total.paise(), 35000);
/// assert_eq!(totals.round_off.paise(), -40);
/// ```
pub fn aggregate(
    lines: &[LineTax],
    bill_discount: Option<&BillDiscount>,
    loyalty_points: i64,
    settings: &StoreSettings,
) -> BillTotals {
    let subtotal_exact: Decimal = lines.iter().map(|l| l.base_amount).sum();
    let item_discount_exact: Decimal = lines.iter().map(|l| l.discount_amount).sum();
    let cgst_exact: Decimal = lines.iter().map(|l| l.cgst).sum();
    let sgst_exact: Decimal = lines.iter().map(|l| l.sgst).sum();
    let igst_exact: Decimal = lines.iter().map(|l| l.igst).sum();

    let subtotal = Money::from_decimal(subtotal_exact);
    let item_discount = Money::from_decimal(item_discount_exact);
    let cgst = Money::from_decimal(cgst_exact);
    let sgst = Money::from_decimal(sgst_exact);
    let igst = Money::from_decimal(igst_exact);
    let tax_total = cgst + sgst + igst;

    let (bill_discount, bill_discount_percent_bps) = match bill_discount {
        None => (Money::zero(), 0),
        Some(discount) => {
            let amount = Money::from_decimal(discount.amount_for(subtotal_exact));
            let bps = match discount {
                BillDiscount::Percent { percent } => percent_to_bps(*percent),
                BillDiscount::Amount { .. } if subtotal_exact > Decimal::ZERO => {
                    percent_to_bps(amount.to_decimal() * Decimal::ONE_HUNDRED / subtotal_exact)
                }
                BillDiscount::Amount { .. } => 0,
            };
            (amount, bps)
        }
    };

    let loyalty_discount = settings.loyalty_value(loyalty_points.max(0));

    let pre_round = subtotal - item_discount - bill_discount - loyalty_discount + tax_total;
    let discount_exceeds_payable = pre_round.is_negative();
    let grand_total = if discount_exceeds_payable {
        Money::zero()
    } else {
        settings.rounding.apply(pre_round)
    };

    BillTotals {
        subtotal,
        item_discount,
        bill_discount,
        bill_discount_percent_bps,
        loyalty_discount,
        taxable: subtotal - item_discount,
        cgst,
        sgst,
        igst,
        tax_total,
        pre_round,
        round_off: grand_total - pre_round,
        grand_total,
        discount_exceeds_payable,
    }
}

/// Converts a percentage to basis points, half away from zero, clamped to
/// 0..=10000.
///
/// ```rust
/// use kirana_core::billing::percent_to_bps;
/// use rust_decimal::Decimal;
///
/// assert_eq!(percent_to_bps(Decimal::new(125, 1)), 1250); // 12.5%
/// ```
pub fn percent_to_bps(percent: Decimal) -> u32 {
    let bps = (percent * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u32()
        .unwrap_or(0);
    bps.min(10_000)
}

// =============================================================================
// Settled Lines
// =============================================================================

/// A line's amounts settled to paise for its bill item row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettledLine {
    pub line_total: Money,
    pub discount: Money,
    pub taxable: Money,
    pub cgst: Money,
    pub sgst: Money,
    pub igst: Money,
    /// taxable + cgst + sgst + igst.
    pub total: Money,
}

/// Rounds a line's amounts for storage, keeping the row self-consistent:
/// `taxable = line_total − discount` and `total = taxable + GST`.
pub fn settle_line(line: &LineTax) -> SettledLine {
    let line_total = Money::from_decimal(line.base_amount);
    let discount = Money::from_decimal(line.discount_amount);
    let taxable = line_total - discount;
    let cgst = Money::from_decimal(line.cgst);
    let sgst = Money::from_decimal(line.sgst);
    let igst = Money::from_decimal(line.igst);

    SettledLine {
        line_total,
        discount,
        taxable,
        cgst,
        sgst,
        igst,
        total: taxable + cgst + sgst + igst,
    }
}

// =============================================================================
// Apportionment
// =============================================================================

/// Spreads a bill-level discount over lines in proportion to `weights`
/// using the largest-remainder method.
///
/// ## Guarantees
/// - Σ shares == min(discount, Σ weights) exactly
/// - no share exceeds its weight, no share is negative
/// - ties on the remainder go to the earlier line
///
/// ## Example
/// ```rust
/// use kirana_core::billing::apportion;
/// use kirana_core::money::Money;
///
/// let shares = apportion(Money::from_paise(100), &[Money::from_paise(100); 3]);
/// assert_eq!(shares, vec![Money::from_paise(34), Money::from_paise(33), Money::from_paise(33)]);
/// ```
pub fn apportion(discount: Money, weights: &[Money]) -> Vec<Money> {
    let mut shares = vec![Money::zero(); weights.len()];

    let total_weight: i128 = weights.iter().map(|w| i128::from(w.paise().max(0))).sum();
    if !discount.is_positive() || total_weight == 0 {
        return shares;
    }

    let to_spread = i128::from(discount.paise()).min(total_weight);

    let mut remainders: Vec<(usize, i128)> = Vec::with_capacity(weights.len());
    let mut spread: i128 = 0;

    for (i, weight) in weights.iter().enumerate() {
        let weighted = to_spread * i128::from(weight.paise().max(0));
        let floor = weighted / total_weight;
        spread += floor;
        shares[i] = Money::from_paise(clamp_i64(floor));
        remainders.push((i, weighted % total_weight));
    }

    remainders.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    let leftover = usize::try_from(to_spread - spread).unwrap_or(0);
    for &(i, _) in remainders.iter().take(leftover) {
        shares[i] += Money::from_paise(1);
    }

    shares
}

fn clamp_i64(value: i128) -> i64 {
    i64::try_from(value).unwrap_or(if value < 0 { i64::MIN } else { i64::MAX })
}

// =============================================================================
// Unit Tests
// =============================================================================
