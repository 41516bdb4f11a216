//! # Cart Requests
//!
//! What a cashier submits at checkout, and what a held bill parks.
//!
//! ## Request Shape
//! ```text
//! CartRequest
//! ├── customer_id | customer_name + customer_phone (walk-in) | neither
//! ├── items[]            { product_id, quantity, discount_percent }
//! ├── tender             cash | upi | card | wallet | split { legs[] }
//! ├── bill_discount?     amount { paise } | percent { percent }
//! ├── loyalty_points_redeemed
//! ├── supply_type?       overrides the store default
//! └── notes?
//! ```
//!
//! ## Tender JSON
//! ```json
//! { "mode": "split", "legs": [
//!     { "method": "cash", "amountPaise": 20000 },
//!     { "method": "upi",  "amountPaise": 15040, "reference": "UPI-88231" }
//! ] }
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{PaymentMethod, PaymentMode, SupplyType};
use crate::validation::{
    validate_cart_size, validate_discount_percent, validate_notes, validate_optional_text,
    validate_payment_amount, validate_phone, validate_price_paise, validate_quantity,
    ValidationResult, MAX_REFERENCE_LEN,
};

/// Split legs may differ from the grand total by at most one paisa.
pub const SPLIT_TOLERANCE: Money = Money::from_paise(1);

// =============================================================================
// Cart Line
// =============================================================================

/// One requested line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CartLine {
    pub product_id: String,
    pub quantity: i64,
    /// 0-100; defaults to no discount.
    #[serde(default)]
    #[ts(as = "String")]
    pub discount_percent: Decimal,
}

impl CartLine {
    /// A line with no discount.
    pub fn new(product_id: impl Into<String>, quantity: i64) -> Self {
        CartLine {
            product_id: product_id.into(),
            quantity,
            discount_percent: Decimal::ZERO,
        }
    }

    /// Sets the line discount percentage.
    pub fn with_discount(mut self, percent: Decimal) -> Self {
        self.discount_percent = percent;
        self
    }

    fn validate(&self) -> ValidationResult<()> {
        if self.product_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "product_id".to_string(),
            });
        }
        validate_quantity(self.quantity)?;
        validate_discount_percent("discount_percent", self.discount_percent)
    }
}

// =============================================================================
// Bill Discount
// =============================================================================

/// A bill-level discount, either a flat amount or a percentage of subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[ts(export)]
pub enum BillDiscount {
    Amount { paise: i64 },
    Percent {
        #[ts(as = "String")]
        percent: Decimal,
    },
}

impl BillDiscount {
    /// Resolves the discount to a rupee amount against the pre-discount
    /// subtotal.
    pub fn amount_for(&self, subtotal: Decimal) -> Decimal {
        match self {
            BillDiscount::Amount { paise } => Money::from_paise(*paise).to_decimal(),
            BillDiscount::Percent { percent } => subtotal * *percent / Decimal::ONE_HUNDRED,
        }
    }

    fn validate(&self) -> ValidationResult<()> {
        match self {
            BillDiscount::Amount { paise } => validate_price_paise("bill_discount", *paise),
            BillDiscount::Percent { percent } => {
                validate_discount_percent("bill_discount", *percent)
            }
        }
    }
}

// =============================================================================
// Tender
// =============================================================================

/// One leg of a split payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PaymentLeg {
    pub method: PaymentMethod,
    pub amount_paise: i64,
    pub reference: Option<String>,
}

impl PaymentLeg {
    /// Returns the leg amount as Money.
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_paise(self.amount_paise)
    }
}

/// How the customer pays.
///
/// A split cannot nest another split: its legs carry a [`PaymentMethod`],
/// which has no split variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "mode", rename_all = "snake_case")]
#[ts(export)]
pub enum Tender {
    Cash,
    Upi { reference: Option<String> },
    Card { reference: Option<String> },
    Wallet { reference: Option<String> },
    Split { legs: Vec<PaymentLeg> },
}

impl Tender {
    /// The mode recorded on the bill header.
    pub fn mode(&self) -> PaymentMode {
        match self {
            Tender::Cash => PaymentMode::Cash,
            Tender::Upi { .. } => PaymentMode::Upi,
            Tender::Card { .. } => PaymentMode::Card,
            Tender::Wallet { .. } => PaymentMode::Wallet,
            Tender::Split { .. } => PaymentMode::Split,
        }
    }

    /// Resolves the payment rows for a settled grand total.
    ///
    /// Single tenders pay the whole total in one leg. Split legs must sum
    /// to the total within [`SPLIT_TOLERANCE`]; legs whose sum overflows are
    /// a mismatch.
    ///
    /// ## Example
    /// ```rust
    /// use kirana_core::cart::{PaymentLeg, Tender};
    /// use kirana_core::error::CoreError;
    /// use kirana_core::money::Money;
    /// use kirana_core::types::PaymentMethod;
    ///
    /// let leg = |method, paise| PaymentLeg { method, amount_paise: paise, reference: None };
    /// let total = Money::from_paise(35040);
    ///
    /// let ok = Tender::Split { legs: vec![leg(PaymentMethod::Cash, 20000), leg(PaymentMethod::Upi, 15040)] };
    /// assert_eq!(ok.legs(total).unwrap().len(), 2);
    ///
    /// let short = Tender::Split { legs: vec![leg(PaymentMethod::Cash, 20000), leg(PaymentMethod::Upi, 10000)] };
    /// assert!(matches!(short.legs(total), Err(CoreError::SplitMismatch { .. })));
    /// ```
    pub fn legs(&self, grand_total: Money) -> CoreResult<Vec<PaymentLeg>> {
        let single = |method: PaymentMethod, reference: &Option<String>| {
            vec![PaymentLeg {
                method,
                amount_paise: grand_total.paise(),
                reference: reference.clone(),
            }]
        };

        match self {
            Tender::Cash => Ok(single(PaymentMethod::Cash, &None)),
            Tender::Upi { reference } => Ok(single(PaymentMethod::Upi, reference)),
            Tender::Card { reference } => Ok(single(PaymentMethod::Card, reference)),
            Tender::Wallet { reference } => Ok(single(PaymentMethod::Wallet, reference)),
            Tender::Split { legs } => {
                let summed = legs
                    .iter()
                    .try_fold(Money::zero(), |acc, leg| acc.checked_add(leg.amount()));

                match summed {
                    Some(actual) if actual.within(grand_total, SPLIT_TOLERANCE) => Ok(legs.clone()),
                    Some(actual) => Err(CoreError::SplitMismatch {
                        expected: grand_total,
                        actual,
                    }),
                    // Overflowing legs cannot match any total.
                    None => Err(CoreError::SplitMismatch {
                        expected: grand_total,
                        actual: legs
                            .iter()
                            .fold(Money::zero(), |acc, leg| acc.saturating_add(leg.amount())),
                    }),
                }
            }
        }
    }

    fn validate(&self) -> ValidationResult<()> {
        match self {
            Tender::Cash => Ok(()),
            Tender::Upi { reference } | Tender::Card { reference } | Tender::Wallet { reference } => {
                validate_optional_text("reference", reference.as_deref(), MAX_REFERENCE_LEN)
            }
            Tender::Split { legs } => {
                if legs.len() < 2 {
                    return Err(ValidationError::Inconsistent {
                        field: "legs".to_string(),
                        reason: "a split payment needs at least two legs".to_string(),
                    });
                }
                for leg in legs {
                    validate_payment_amount(leg.amount_paise)?;
                    validate_optional_text("reference", leg.reference.as_deref(), MAX_REFERENCE_LEN)?;
                }
                Ok(())
            }
        }
    }
}

impl Default for Tender {
    fn default() -> Self {
        Tender::Cash
    }
}

// =============================================================================
// Cart Request
// =============================================================================

/// A checkout request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CartRequest {
    /// Registered customer; loyalty and purchase stats follow this id.
    pub customer_id: Option<String>,
    /// Walk-in name (or override of the registered name on the bill).
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub items: Vec<CartLine>,
    #[serde(default)]
    pub tender: Tender,
    pub bill_discount: Option<BillDiscount>,
    #[serde(default)]
    pub loyalty_points_redeemed: i64,
    pub supply_type: Option<SupplyType>,
    pub notes: Option<String>,
}

impl CartRequest {
    /// An anonymous cart paid in one tender.
    pub fn new(items: Vec<CartLine>, tender: Tender) -> Self {
        CartRequest {
            customer_id: None,
            customer_name: None,
            customer_phone: None,
            items,
            tender,
            bill_discount: None,
            loyalty_points_redeemed: 0,
            supply_type: None,
            notes: None,
        }
    }

    /// Checks the request shape. Runs before any data is read or written.
    ///
    /// Totals-dependent rules (split sum, loyalty balance, stock) are
    /// checked later against fetched data.
    pub fn validate(&self) -> ValidationResult<()> {
        validate_cart_size(self.items.len())?;
        for line in &self.items {
            line.validate()?;
        }

        self.tender.validate()?;

        if let Some(discount) = &self.bill_discount {
            discount.validate()?;
        }

        if self.loyalty_points_redeemed < 0 {
            return Err(ValidationError::OutOfRange {
                field: "loyalty_points_redeemed".to_string(),
                min: 0,
                max: i64::MAX,
            });
        }
        if self.loyalty_points_redeemed > 0 && self.customer_id.is_none() {
            return Err(ValidationError::Inconsistent {
                field: "loyalty_points_redeemed".to_string(),
                reason: "redeeming points requires a customer".to_string(),
            });
        }

        validate_optional_text("customer_name", self.customer_name.as_deref(), 200)?;
        validate_phone(self.customer_phone.as_deref())?;
        validate_notes(self.notes.as_deref())
    }
}

// =============================================================================
// Held Cart
// =============================================================================

/// A parked line, with the name and price the cashier saw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct HeldCartLine {
    pub product_id: String,
    pub product_name: String,
    pub sku: String,
    pub unit_price_paise: i64,
    pub quantity: i64,
    #[serde(default)]
    #[ts(as = "String")]
    pub discount_percent: Decimal,
}

/// The cart payload stored with a held bill and handed back on resume.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct HeldCart {
    pub items: Vec<HeldCartLine>,
    pub customer_id: Option<String>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub bill_discount: Option<BillDiscount>,
    #[serde(default)]
    pub loyalty_points_redeemed: i64,
    pub supply_type: Option<SupplyType>,
    pub notes: Option<String>,
}

impl HeldCart {
    /// Σ unit price × quantity from the snapshots.
    pub fn subtotal(&self) -> Money {
        self.items
            .iter()
            .map(|line| Money::from_paise(line.unit_price_paise) * line.quantity)
            .sum()
    }

    /// Number of lines parked.
    pub fn item_count(&self) -> i64 {
        self.items.len() as i64
    }

    /// Checks the payload before it is parked.
    pub fn validate(&self) -> ValidationResult<()> {
        validate_cart_size(self.items.len())?;
        for line in &self.items {
            if line.product_id.trim().is_empty() {
                return Err(ValidationError::Required {
                    field: "product_id".to_string(),
                });
            }
            validate_quantity(line.quantity)?;
            validate_price_paise("unit_price", line.unit_price_paise)?;
            validate_discount_percent("discount_percent", line.discount_percent)?;
        }
        if let Some(discount) = &self.bill_discount {
            discount.validate()?;
        }
        validate_phone(self.customer_phone.as_deref())?;
        validate_notes(self.notes.as_deref())
    }

    /// Rebuilds a checkout request from the parked cart.
    ///
    /// Prices are NOT taken from the snapshot: checkout re-reads the
    /// catalogue, so a price change while the bill was parked is honoured.
    pub fn into_cart_request(self, tender: Tender) -> CartRequest {
        CartRequest {
            customer_id: self.customer_id,
            customer_name: self.customer_name,
            customer_phone: self.customer_phone,
            items: self
                .items
                .into_iter()
                .map(|line| CartLine {
                    product_id: line.product_id,
                    quantity: line.quantity,
                    discount_percent: line.discount_percent,
                })
                .collect(),
            tender,
            bill_discount: self.bill_discount,
            loyalty_points_redeemed: self.loyalty_points_redeemed,
            supply_type: self.supply_type,
            notes: self.notes,
        }
    }
}

/// A request to park a cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct HoldRequest {
    pub cart: HeldCart,
    pub customer_name: Option<String>,
    pub notes: Option<String>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn leg(method: PaymentMethod, paise: i64) -> PaymentLeg {
        PaymentLeg {
            method,
            amount_paise: paise,
            reference: None,
        }
    }

    fn cart() -> CartRequest {
        CartRequest::new(vec![CartLine::new("p1", 2)], Tender::Cash)
    }

    #[test]
    fn test_split_legs_matching_total_are_accepted() {
        let tender = Tender::Split {
            legs: vec![leg(PaymentMethod::Cash, 20000), leg(PaymentMethod::Upi, 15040)],
        };
        let legs = tender.legs(Money::from_paise(35040)).unwrap();
        assert_eq!(legs.len(), 2);
        assert_eq!(tender.mode(), PaymentMode::Split);
    }

    #[test]
    fn test_split_legs_short_of_total_are_rejected() {
        let tender = Tender::Split {
            legs: vec![leg(PaymentMethod::Cash, 20000), leg(PaymentMethod::Upi, 10000)],
        };
        match tender.legs(Money::from_paise(35040)) {
            Err(CoreError::SplitMismatch { expected, actual }) => {
                assert_eq!(expected.paise(), 35040);
                assert_eq!(actual.paise(), 30000);
            }
            other => panic!("expected SplitMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_split_tolerates_one_paisa() {
        let tender = Tender::Split {
            legs: vec![leg(PaymentMethod::Card, 20000), leg(PaymentMethod::Cash, 15039)],
        };
        assert!(tender.legs(Money::from_paise(35040)).is_ok());
    }

    #[test]
    fn test_overflowing_split_legs_are_a_mismatch() {
        let tender = Tender::Split {
            legs: vec![leg(PaymentMethod::Cash, i64::MAX), leg(PaymentMethod::Upi, 1)],
        };
        let request = CartRequest::new(vec![CartLine::new("p1", 1)], tender.clone());
        assert!(request.validate().is_ok());

        match tender.legs(Money::from_paise(35040)) {
            Err(CoreError::SplitMismatch { expected, actual }) => {
                assert_eq!(expected.paise(), 35040);
                assert_eq!(actual.paise(), i64::MAX);
            }
            other => panic!("expected SplitMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_single_tender_pays_whole_total() {
        let tender = Tender::Upi {
            reference: Some("UPI-771".to_string()),
        };
        let legs = tender.legs(Money::from_paise(35000)).unwrap();
        assert_eq!(legs, vec![PaymentLeg {
            method: PaymentMethod::Upi,
            amount_paise: 35000,
            reference: Some("UPI-771".to_string()),
        }]);
    }

    #[test]
    fn test_tender_json_shape() {
        let json = r#"{"mode":"split","legs":[
            {"method":"cash","amountPaise":20000},
            {"method":"upi","amountPaise":15040,"reference":"UPI-88231"}
        ]}"#;
        let tender: Tender = serde_json::from_str(json).unwrap();
        assert_eq!(tender.mode(), PaymentMode::Split);

        let cash: Tender = serde_json::from_str(r#"{"mode":"cash"}"#).unwrap();
        assert_eq!(cash, Tender::Cash);
    }

    #[test]
    fn test_validate_rejects_empty_cart() {
        let request = CartRequest::new(vec![], Tender::Cash);
        assert!(matches!(
            request.validate(),
            Err(ValidationError::Required { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_non_positive_quantity() {
        let request = CartRequest::new(vec![CartLine::new("p1", 0)], Tender::Cash);
        assert!(matches!(
            request.validate(),
            Err(ValidationError::MustBePositive { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_bad_discounts() {
        let mut request = cart();
        request.items[0].discount_percent = dec!(101);
        assert!(request.validate().is_err());

        let mut request = cart();
        request.bill_discount = Some(BillDiscount::Amount { paise: -1 });
        assert!(request.validate().is_err());

        let mut request = cart();
        request.bill_discount = Some(BillDiscount::Percent { percent: dec!(15) });
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_validate_split_legs() {
        let mut request = cart();
        request.tender = Tender::Split {
            legs: vec![leg(PaymentMethod::Cash, 100)],
        };
        assert!(request.validate().is_err());

        request.tender = Tender::Split {
            legs: vec![leg(PaymentMethod::Cash, 100), leg(PaymentMethod::Upi, 0)],
        };
        assert!(matches!(
            request.validate(),
            Err(ValidationError::MustBePositive { .. })
        ));
    }

    #[test]
    fn test_loyalty_redemption_requires_customer() {
        let mut request = cart();
        request.loyalty_points_redeemed = 10;
        assert!(matches!(
            request.validate(),
            Err(ValidationError::Inconsistent { .. })
        ));

        request.customer_id = Some("c1".to_string());
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_bill_discount_amount_for() {
        let percent = BillDiscount::Percent { percent: dec!(10) };
        assert_eq!(percent.amount_for(dec!(350.40)), dec!(35.04));

        let flat = BillDiscount::Amount { paise: 2550 };
        assert_eq!(flat.amount_for(dec!(350.40)), dec!(25.50));
    }

    #[test]
    fn test_held_cart_subtotal_and_conversion() {
        let held = HeldCart {
            items: vec![
                HeldCartLine {
                    product_id: "p1".to_string(),
                    product_name: "Parle-G 800g".to_string(),
                    sku: "PARLEG-800".to_string(),
                    unit_price_paise: 9000,
                    quantity: 2,
                    discount_percent: Decimal::ZERO,
                },
                HeldCartLine {
                    product_id: "p2".to_string(),
                    product_name: "Tata Salt 1kg".to_string(),
                    sku: "SALT-1KG".to_string(),
                    unit_price_paise: 2800,
                    quantity: 1,
                    discount_percent: dec!(5),
                },
            ],
            notes: Some("customer went to ATM".to_string()),
            ..HeldCart::default()
        };

        assert!(held.validate().is_ok());
        assert_eq!(held.subtotal(), Money::from_paise(20800));
        assert_eq!(held.item_count(), 2);

        let request = held.into_cart_request(Tender::Cash);
        assert_eq!(request.items.len(), 2);
        assert_eq!(request.items[1].discount_percent, dec!(5));
        assert!(request.validate().is_ok());
    }
}
