//! # Bill Writer
//!
//! Turns a validated cart into a completed bill in ONE transaction.
//!
//! ## Transaction Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │   1. reserve bill number     UPDATE store_settings ... RETURNING        │
//! │                              (first statement: takes the write lock)    │
//! │   2. read products           active only, store-scoped                  │
//! │   3. stock guard             merged quantity per product                │
//! │   4. GST per line            full precision                             │
//! │   5. read customer           loyalty balance check                      │
//! │   6. aggregate + apportion   settled totals, per-line discount shares   │
//! │   7. payment legs            split must match the grand total           │
//! │   8. INSERT bill, items, payments                                       │
//! │   9. UPDATE products         stock - qty WHERE stock >= qty             │
//! │  10. UPDATE customer         points - redeemed WHERE points >= redeemed │
//! │      INSERT loyalty ledger   earn / redeem rows                         │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Any error drops the transaction, which rolls back every step including
//! the number reservation. Either the whole bill exists or none of it does.
//!
//! ## Concurrency
//! SQLite allows one writer at a time. Because the counter bump is the first
//! statement, a second checkout blocks on `busy_timeout` before it has read
//! anything, then sees the first checkout's committed stock. The guarded
//! `UPDATE`s on stock and loyalty hold even if that ordering ever changes.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::error::DbError;
use crate::repository::bill::{self, BillRepository};
use crate::repository::customer::{self, CustomerBillEffect};
use crate::repository::settings::{fetch as fetch_settings, reserve_invoice_number};
use crate::repository::{generate_id, loyalty, product};
use kirana_core::billing::percent_to_bps;
use kirana_core::validation::validate_optional_text;
use kirana_core::{
    aggregate, apportion, calculate_line, settle_line, stock, Bill, BillItem, BillPayment,
    BillStatus, BillTotals, BillWithItems, CartRequest, CoreError, Customer, LineInput, LineTax,
    LoyaltyKind, LoyaltyTransaction, Money, Product, SettledLine, StoreSettings, SupplyType,
    ValidationError, MAX_NOTES_LEN,
};
use rust_decimal::Decimal;

// =============================================================================
// Errors
// =============================================================================

/// Failure of a checkout, either a business rule or the database.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Db(#[from] DbError),
}

impl From<ValidationError> for CheckoutError {
    fn from(err: ValidationError) -> Self {
        CheckoutError::Core(CoreError::Validation(err))
    }
}

impl From<sqlx::Error> for CheckoutError {
    fn from(err: sqlx::Error) -> Self {
        CheckoutError::Db(DbError::from(err))
    }
}

impl CheckoutError {
    /// A store failure while the bill transaction was open is a failed
    /// transaction, whatever SQLite reported. Business rules pass through.
    fn in_transaction(self) -> Self {
        match self {
            CheckoutError::Db(err) => CheckoutError::Db(err.in_transaction()),
            other => other,
        }
    }
}

/// Result type for checkout operations.
pub type CheckoutResult<T> = Result<T, CheckoutError>;

// =============================================================================
// Inputs / Outputs
// =============================================================================

/// Who is checking out, and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutContext {
    pub store_id: String,
    pub cashier_id: String,
}

impl CheckoutContext {
    pub fn new(store_id: impl Into<String>, cashier_id: impl Into<String>) -> Self {
        CheckoutContext {
            store_id: store_id.into(),
            cashier_id: cashier_id.into(),
        }
    }
}

/// One priced line of a quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteLine {
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub gst_rate_bps: u32,
    pub amounts: SettledLine,
    pub discount_share: Money,
    pub net_amount: Money,
}

/// Totals a cart would settle to right now. Nothing is written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillQuote {
    pub totals: BillTotals,
    pub lines: Vec<QuoteLine>,
    pub points_earned: i64,
}

// =============================================================================
// Pricing (shared by checkout and preview)
// =============================================================================

struct PricedLine {
    product: Product,
    quantity: i64,
    discount_percent: Decimal,
    settled: SettledLine,
    share: Money,
}

impl PricedLine {
    fn net(&self) -> Money {
        self.settled.total - self.share
    }
}

struct PricedCart {
    lines: Vec<PricedLine>,
    /// Merged quantity per product, first-seen order.
    requested: Vec<(String, i64)>,
    products: HashMap<String, Product>,
    customer: Option<Customer>,
    supply: SupplyType,
    totals: BillTotals,
    points_earned: i64,
}

/// Reads everything the cart depends on and prices it.
async fn price_cart(
    conn: &mut SqliteConnection,
    store_id: &str,
    cart: &CartRequest,
    settings: &StoreSettings,
) -> CheckoutResult<PricedCart> {
    let requested: Vec<(String, i64)> = stock::requested_by_product(
        cart.items
            .iter()
            .map(|line| (line.product_id.as_str(), line.quantity)),
    )
    .into_iter()
    .map(|(id, qty)| (id.to_string(), qty))
    .collect();

    let mut products: HashMap<String, Product> = HashMap::with_capacity(requested.len());
    for (product_id, quantity) in &requested {
        let found = product::fetch_sellable(&mut *conn, store_id, product_id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(product_id.clone()))?;
        stock::ensure_available(&found, *quantity)?;
        products.insert(product_id.clone(), found);
    }

    let supply = cart.supply_type.unwrap_or(settings.default_supply);

    let mut taxes: Vec<LineTax> = Vec::with_capacity(cart.items.len());
    let mut lines: Vec<PricedLine> = Vec::with_capacity(cart.items.len());
    for item in &cart.items {
        let found = products
            .get(&item.product_id)
            .ok_or_else(|| CoreError::ProductNotFound(item.product_id.clone()))?;

        let tax = calculate_line(&LineInput {
            unit_price: found.selling_price().to_decimal(),
            quantity: item.quantity,
            discount_percent: item.discount_percent,
            gst_rate: found.gst_rate(),
            supply,
            tax_mode: settings.tax_mode,
        });

        taxes.push(tax);
        lines.push(PricedLine {
            product: found.clone(),
            quantity: item.quantity,
            discount_percent: item.discount_percent,
            settled: settle_line(&tax),
            share: Money::zero(),
        });
    }

    let customer = match &cart.customer_id {
        Some(id) => Some(
            customer::fetch(&mut *conn, store_id, id)
                .await?
                .ok_or_else(|| CoreError::CustomerNotFound(id.clone()))?,
        ),
        None => None,
    };

    let redeemed = cart.loyalty_points_redeemed;
    if redeemed > 0 {
        if !settings.loyalty_enabled {
            return Err(ValidationError::Inconsistent {
                field: "loyalty_points_redeemed".to_string(),
                reason: "loyalty is disabled for this store".to_string(),
            }
            .into());
        }

        let available = customer.as_ref().map_or(0, |c| c.loyalty_points);
        if available < redeemed {
            return Err(CoreError::InsufficientLoyaltyPoints {
                available,
                requested: redeemed,
            }
            .into());
        }
    }

    let totals = aggregate(&taxes, cart.bill_discount.as_ref(), redeemed, settings);

    if totals.discount_exceeds_payable {
        if settings.reject_excess_discount {
            return Err(CoreError::ExcessDiscount {
                discount: totals.apportioned_discount(),
                payable: totals.payable_before_discounts(),
            }
            .into());
        }
        warn!(
            store_id = %store_id,
            discount = totals.apportioned_discount().paise(),
            "Discounts exceed payable amount, grand total floored at zero"
        );
    }

    let weights: Vec<Money> = lines.iter().map(|line| line.settled.total).collect();
    let shares = apportion(totals.apportioned_discount(), &weights);
    for (line, share) in lines.iter_mut().zip(shares) {
        line.share = share;
    }

    let points_earned = if customer.is_some() {
        settings.points_earned(totals.grand_total)
    } else {
        0
    };

    Ok(PricedCart {
        lines,
        requested,
        products,
        customer,
        supply,
        totals,
        points_earned,
    })
}

// =============================================================================
// Bill Writer
// =============================================================================

/// Writes bills atomically.
#[derive(Debug, Clone)]
pub struct BillWriter {
    pool: SqlitePool,
}

impl BillWriter {
    /// Creates a new BillWriter.
    pub fn new(pool: SqlitePool) -> Self {
        BillWriter { pool }
    }

    /// Creates a completed bill from a cart.
    ///
    /// ## Returns
    /// * `Ok(BillWithItems)` - Committed bill with its items and payments
    /// * `Err(CheckoutError::Core(..))` - A business rule failed; nothing was written
    /// * `Err(CheckoutError::Db(..))` - The database failed; nothing was written.
    ///   Lock timeouts and other query failures arrive as `TransactionFailed`.
    pub async fn create_bill(
        &self,
        ctx: &CheckoutContext,
        cart: &CartRequest,
    ) -> CheckoutResult<BillWithItems> {
        cart.validate()?;

        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(DbError::transaction)?;

        let written = write_bill(&mut *tx, ctx, cart, now)
            .await
            .map_err(CheckoutError::in_transaction)?;

        tx.commit().await.map_err(DbError::transaction)?;

        info!(
            bill_id = %written.bill.id,
            bill_number = %written.bill.bill_number,
            grand_total = written.bill.grand_total_paise,
            items = written.items.len(),
            mode = ?written.bill.payment_mode,
            "Bill created"
        );

        Ok(written)
    }

    /// Prices a cart with current catalogue data without writing anything.
    ///
    /// Tender legs are not checked; the cashier picks the tender after
    /// seeing the total.
    pub async fn preview(&self, ctx: &CheckoutContext, cart: &CartRequest) -> CheckoutResult<BillQuote> {
        cart.validate()?;

        let mut conn = self.pool.acquire().await?;
        let settings = fetch_settings(&mut *conn, &ctx.store_id)
            .await?
            .ok_or_else(|| CoreError::StoreNotConfigured(ctx.store_id.clone()))?;

        let priced = price_cart(&mut *conn, &ctx.store_id, cart, &settings).await?;
        debug!(
            store_id = %ctx.store_id,
            grand_total = priced.totals.grand_total.paise(),
            "Previewed cart"
        );

        let lines = priced
            .lines
            .iter()
            .map(|line| QuoteLine {
                product_id: line.product.id.clone(),
                product_name: line.product.name.clone(),
                quantity: line.quantity,
                unit_price: line.product.selling_price(),
                gst_rate_bps: line.product.gst_rate_bps,
                amounts: line.settled,
                discount_share: line.share,
                net_amount: line.net(),
            })
            .collect();

        Ok(BillQuote {
            totals: priced.totals,
            lines,
            points_earned: priced.points_earned,
        })
    }

    /// Cancels a completed bill.
    ///
    /// Cancellation changes status only, unless `restock` (or the store's
    /// `restock_on_cancel` default when `None`) puts the sold quantities
    /// back. Loyalty movements are not reversed.
    ///
    /// ## Returns
    /// * `Err(CoreError::BillNotFound)` - No such bill in the store
    /// * `Err(CoreError::InvalidBillStatus)` - Bill is not completed
    pub async fn cancel_bill(
        &self,
        store_id: &str,
        bill_id: &str,
        actor: &str,
        reason: &str,
        restock: Option<bool>,
    ) -> CheckoutResult<BillWithItems> {
        if reason.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "reason".to_string(),
            }
            .into());
        }
        validate_optional_text("reason", Some(reason), MAX_NOTES_LEN)?;

        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(DbError::transaction)?;

        if !bill::mark_cancelled(&mut *tx, store_id, bill_id, actor, reason, now).await? {
            let err = match bill::fetch_bill(&mut *tx, store_id, bill_id).await? {
                None => CoreError::BillNotFound(bill_id.to_string()),
                Some(current) => CoreError::InvalidBillStatus {
                    bill_id: bill_id.to_string(),
                    current_status: current.status.to_string(),
                },
            };
            return Err(err.into());
        }

        let restock = match restock {
            Some(flag) => flag,
            None => fetch_settings(&mut *tx, store_id)
                .await?
                .is_some_and(|s| s.restock_on_cancel),
        };

        if restock {
            for item in bill::fetch_items(&mut *tx, bill_id).await? {
                product::restock(&mut *tx, &item.product_id, item.quantity, now).await?;
            }
        }

        tx.commit().await.map_err(DbError::transaction)?;

        info!(bill_id = %bill_id, actor = %actor, restocked = restock, "Bill cancelled");

        BillRepository::new(self.pool.clone())
            .get_by_id(store_id, bill_id)
            .await?
            .ok_or_else(|| CoreError::BillNotFound(bill_id.to_string()).into())
    }
}

/// Every write of a new bill, run inside the caller's transaction.
async fn write_bill(
    conn: &mut SqliteConnection,
    ctx: &CheckoutContext,
    cart: &CartRequest,
    now: DateTime<Utc>,
) -> CheckoutResult<BillWithItems> {
    let (settings, sequence) = reserve_invoice_number(&mut *conn, &ctx.store_id, now)
        .await?
        .ok_or_else(|| CoreError::StoreNotConfigured(ctx.store_id.clone()))?;

    let priced = price_cart(&mut *conn, &ctx.store_id, cart, &settings).await?;
    let totals = priced.totals;
    let legs = cart.tender.legs(totals.grand_total)?;

    let bill = Bill {
        id: generate_id(),
        store_id: ctx.store_id.clone(),
        bill_number: settings.format_bill_number(sequence),
        public_id: generate_id(),
        status: BillStatus::Completed,
        customer_id: priced.customer.as_ref().map(|c| c.id.clone()),
        customer_name: cart
            .customer_name
            .clone()
            .or_else(|| priced.customer.as_ref().map(|c| c.name.clone())),
        customer_phone: cart
            .customer_phone
            .clone()
            .or_else(|| priced.customer.as_ref().and_then(|c| c.phone.clone())),
        cashier_id: ctx.cashier_id.clone(),
        supply_type: priced.supply,
        subtotal_paise: totals.subtotal.paise(),
        item_discount_paise: totals.item_discount.paise(),
        bill_discount_paise: totals.bill_discount.paise(),
        bill_discount_percent_bps: totals.bill_discount_percent_bps,
        loyalty_points_redeemed: cart.loyalty_points_redeemed,
        loyalty_discount_paise: totals.loyalty_discount.paise(),
        loyalty_points_earned: priced.points_earned,
        taxable_paise: totals.taxable.paise(),
        tax_total_paise: totals.tax_total.paise(),
        cgst_paise: totals.cgst.paise(),
        sgst_paise: totals.sgst.paise(),
        igst_paise: totals.igst.paise(),
        round_off_paise: totals.round_off.paise(),
        grand_total_paise: totals.grand_total.paise(),
        payment_mode: cart.tender.mode(),
        notes: cart.notes.clone(),
        created_at: now,
        completed_at: Some(now),
        cancelled_at: None,
        cancelled_by: None,
        cancellation_reason: None,
    };
    bill::insert_bill(&mut *conn, &bill).await?;

    let mut items = Vec::with_capacity(priced.lines.len());
    for (index, line) in priced.lines.iter().enumerate() {
        let item = bill_item(&bill.id, index, line, now);
        bill::insert_item(&mut *conn, &item).await?;
        items.push(item);
    }

    for (product_id, quantity) in &priced.requested {
        let Some(found) = priced.products.get(product_id) else {
            continue;
        };
        if !stock::requires_decrement(found) {
            continue;
        }
        if !product::decrement_stock(&mut *conn, product_id, *quantity, now).await? {
            return Err(stock::insufficient(found, *quantity).into());
        }
    }

    let mut payments = Vec::with_capacity(legs.len());
    for leg in legs {
        let payment = BillPayment {
            id: generate_id(),
            bill_id: bill.id.clone(),
            method: leg.method,
            amount_paise: leg.amount_paise,
            reference: leg.reference,
            created_at: now,
        };
        bill::insert_payment(&mut *conn, &payment).await?;
        payments.push(payment);
    }

    if let Some(buyer) = &priced.customer {
        let effect = CustomerBillEffect {
            grand_total_paise: totals.grand_total.paise(),
            points_redeemed: cart.loyalty_points_redeemed,
            points_earned: priced.points_earned,
        };
        if !customer::apply_bill(&mut *conn, &buyer.id, effect, now).await? {
            return Err(CoreError::InsufficientLoyaltyPoints {
                available: buyer.loyalty_points,
                requested: cart.loyalty_points_redeemed,
            }
            .into());
        }

        let movements = [
            (LoyaltyKind::Redeem, cart.loyalty_points_redeemed),
            (LoyaltyKind::Earn, priced.points_earned),
        ];
        for (kind, points) in movements {
            if points <= 0 {
                continue;
            }
            let entry = LoyaltyTransaction {
                id: generate_id(),
                store_id: ctx.store_id.clone(),
                customer_id: buyer.id.clone(),
                bill_id: bill.id.clone(),
                kind,
                points,
                created_at: now,
            };
            loyalty::insert(&mut *conn, &entry).await?;
        }
    }

    Ok(BillWithItems {
        bill,
        items,
        payments,
    })
}

/// Freezes a priced line into its bill item row.
fn bill_item(bill_id: &str, index: usize, line: &PricedLine, now: DateTime<Utc>) -> BillItem {
    let product = &line.product;
    let settled = &line.settled;

    BillItem {
        id: generate_id(),
        bill_id: bill_id.to_string(),
        line_no: index as i64 + 1,
        product_id: product.id.clone(),
        product_name: product.name.clone(),
        product_sku: product.sku.clone(),
        hsn_code: product.hsn_code.clone(),
        unit: product.unit.clone(),
        mrp_paise: product.mrp_paise,
        selling_price_paise: product.selling_price_paise,
        quantity: line.quantity,
        discount_percent_bps: percent_to_bps(line.discount_percent),
        line_total_paise: settled.line_total.paise(),
        discount_paise: settled.discount.paise(),
        gst_rate_bps: product.gst_rate_bps,
        taxable_paise: settled.taxable.paise(),
        cgst_paise: settled.cgst.paise(),
        sgst_paise: settled.sgst.paise(),
        igst_paise: settled.igst.paise(),
        total_paise: settled.total.paise(),
        bill_discount_share_paise: line.share.paise(),
        net_amount_paise: line.net().paise(),
        created_at: now,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::customer::test_customer;
    use crate::repository::product::test_product;
    use crate::{Database, DbConfig};
    use kirana_core::{
        BillDiscount, CartLine, PaymentLeg, PaymentMethod, PaymentMode, RoundingMode, TaxMode,
        Tender,
    };
    use rust_decimal_macros::dec;
    use std::time::Duration;

    const STORE: &str = "store-1";

    fn store_settings() -> StoreSettings {
        let mut settings = StoreSettings::new(STORE, "Sharma Mart");
        settings.invoice_prefix = "SM".to_string();
        settings.invoice_suffix = Some("BLR".to_string());
        settings
    }

    async fn setup_with(settings: StoreSettings) -> (Database, BillWriter) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.settings().upsert(&settings).await.unwrap();
        let writer = db.checkout();
        (db, writer)
    }

    async fn setup() -> (Database, BillWriter) {
        setup_with(store_settings()).await
    }

    async fn add_product(db: &Database, sku: &str, price: i64, gst_bps: u32, stock: i64) -> Product {
        let product = test_product(STORE, sku, price, gst_bps, stock);
        db.products().insert(&product).await.unwrap();
        product
    }

    async fn stock_of(db: &Database, id: &str) -> i64 {
        db.products().get_by_id(STORE, id).await.unwrap().unwrap().stock_quantity
    }

    async fn next_number(db: &Database) -> i64 {
        db.settings().get(STORE).await.unwrap().unwrap().next_invoice_number
    }

    async fn completed_count(db: &Database) -> i64 {
        db.bills().count_by_status(STORE, BillStatus::Completed).await.unwrap()
    }

    fn ctx() -> CheckoutContext {
        CheckoutContext::new(STORE, "cashier-1")
    }

    fn cash_cart(lines: Vec<CartLine>) -> CartRequest {
        CartRequest::new(lines, Tender::Cash)
    }

    fn leg(method: PaymentMethod, paise: i64) -> PaymentLeg {
        PaymentLeg {
            method,
            amount_paise: paise,
            reference: None,
        }
    }

    // -------------------------------------------------------------------------
    // Totals and numbering
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_create_bill_rounds_to_rupee() {
        let (db, writer) = setup().await;
        let product = add_product(&db, "GHEE-500", 35040, 0, 10).await;

        let result = writer
            .create_bill(&ctx(), &cash_cart(vec![CartLine::new(&product.id, 1)]))
            .await
            .unwrap();

        let bill = &result.bill;
        assert_eq!(bill.bill_number, "SM-000001-BLR");
        assert_eq!(bill.status, BillStatus::Completed);
        assert_eq!(bill.subtotal_paise, 35040);
        assert_eq!(bill.grand_total_paise, 35000);
        assert_eq!(bill.round_off_paise, -40);
        assert_eq!(bill.recomputed_grand_total(), bill.grand_total());
        assert_ne!(bill.public_id, bill.id);

        assert_eq!(result.payments.len(), 1);
        assert_eq!(result.payments[0].method, PaymentMethod::Cash);
        assert_eq!(result.payments[0].amount_paise, 35000);

        assert_eq!(stock_of(&db, &product.id).await, 9);

        let stored = db.bills().get_by_id(STORE, &bill.id).await.unwrap().unwrap();
        assert_eq!(stored.items.len(), 1);
        assert_eq!(stored.bill.grand_total_paise, 35000);
    }

    #[tokio::test]
    async fn test_line_discount_with_gst() {
        let (db, writer) = setup().await;
        let product = add_product(&db, "OIL-1L", 10000, 1800, 10).await;

        let cart = cash_cart(vec![CartLine::new(&product.id, 3).with_discount(dec!(10))]);
        let result = writer.create_bill(&ctx(), &cart).await.unwrap();

        let bill = &result.bill;
        assert_eq!(bill.subtotal_paise, 30000);
        assert_eq!(bill.item_discount_paise, 3000);
        assert_eq!(bill.taxable_paise, 27000);
        assert_eq!(bill.cgst_paise, 2430);
        assert_eq!(bill.sgst_paise, 2430);
        assert_eq!(bill.igst_paise, 0);
        assert_eq!(bill.grand_total_paise, 31900);
        assert_eq!(bill.round_off_paise, 40);

        let item = &result.items[0];
        assert_eq!(item.discount_percent_bps, 1000);
        assert_eq!(item.total_paise, 31860);
        assert_eq!(item.net_amount_paise, 31860);
    }

    #[tokio::test]
    async fn test_bill_numbers_are_sequential() {
        let (db, writer) = setup().await;
        let product = add_product(&db, "SALT-1KG", 2500, 0, 10).await;
        let cart = cash_cart(vec![CartLine::new(&product.id, 1)]);

        let first = writer.create_bill(&ctx(), &cart).await.unwrap();
        let second = writer.create_bill(&ctx(), &cart).await.unwrap();

        assert_eq!(first.bill.bill_number, "SM-000001-BLR");
        assert_eq!(second.bill.bill_number, "SM-000002-BLR");
        assert_eq!(next_number(&db).await, 3);
    }

    #[tokio::test]
    async fn test_inter_state_charges_igst() {
        let (db, writer) = setup().await;
        let product = add_product(&db, "SOAP-4PK", 10000, 1800, 10).await;

        let mut cart = cash_cart(vec![CartLine::new(&product.id, 1)]);
        cart.supply_type = Some(SupplyType::InterState);
        let result = writer.create_bill(&ctx(), &cart).await.unwrap();

        assert_eq!(result.bill.supply_type, SupplyType::InterState);
        assert_eq!(result.bill.igst_paise, 1800);
        assert_eq!(result.bill.cgst_paise, 0);
        assert_eq!(result.bill.sgst_paise, 0);
        assert_eq!(result.bill.grand_total_paise, 11800);
    }

    #[tokio::test]
    async fn test_inclusive_prices_back_out_gst() {
        let mut settings = store_settings();
        settings.tax_mode = TaxMode::Inclusive;
        let (db, writer) = setup_with(settings).await;
        let product = add_product(&db, "BISCUIT", 11800, 1800, 10).await;

        let result = writer
            .create_bill(&ctx(), &cash_cart(vec![CartLine::new(&product.id, 1)]))
            .await
            .unwrap();

        assert_eq!(result.bill.taxable_paise, 10000);
        assert_eq!(result.bill.tax_total_paise, 1800);
        assert_eq!(result.bill.grand_total_paise, 11800);
        // The snapshot keeps the shelf price
        assert_eq!(result.items[0].selling_price_paise, 11800);
    }

    #[tokio::test]
    async fn test_bill_discount_is_apportioned() {
        let (db, writer) = setup().await;
        let rice = add_product(&db, "RICE-5KG", 30000, 0, 10).await;
        let dal = add_product(&db, "DAL-1KG", 10000, 0, 10).await;

        let mut cart = cash_cart(vec![CartLine::new(&rice.id, 1), CartLine::new(&dal.id, 1)]);
        cart.bill_discount = Some(BillDiscount::Percent { percent: dec!(10) });
        let result = writer.create_bill(&ctx(), &cart).await.unwrap();

        assert_eq!(result.bill.bill_discount_paise, 4000);
        assert_eq!(result.bill.bill_discount_percent_bps, 1000);
        assert_eq!(result.bill.grand_total_paise, 36000);

        let shares: Vec<i64> = result.items.iter().map(|i| i.bill_discount_share_paise).collect();
        assert_eq!(shares, vec![3000, 1000]);
        let nets: i64 = result.items.iter().map(|i| i.net_amount_paise).sum();
        assert_eq!(nets, 36000);
        assert_eq!(result.items[0].line_no, 1);
        assert_eq!(result.items[1].line_no, 2);
    }

    // -------------------------------------------------------------------------
    // Stock
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_insufficient_stock_writes_nothing() {
        let (db, writer) = setup().await;
        let product = add_product(&db, "TEA-250", 14000, 500, 2).await;

        let err = writer
            .create_bill(&ctx(), &cash_cart(vec![CartLine::new(&product.id, 3)]))
            .await
            .unwrap_err();

        match err {
            CheckoutError::Core(CoreError::InsufficientStock { available, requested, sku, .. }) => {
                assert_eq!(available, 2);
                assert_eq!(requested, 3);
                assert_eq!(sku, "TEA-250");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        assert_eq!(stock_of(&db, &product.id).await, 2);
        assert_eq!(next_number(&db).await, 1);
        assert_eq!(completed_count(&db).await, 0);
    }

    async fn row_count(db: &Database, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_failed_stock_decrement_rolls_back_bill() {
        let (db, writer) = setup().await;
        let product = add_product(&db, "ATTA-5KG", 26000, 500, 10).await;

        // Another counter sells the last packs between the stock read and
        // the guarded decrement.
        sqlx::query(
            "CREATE TRIGGER sell_out_after_item AFTER INSERT ON bill_items
             BEGIN
                 UPDATE products SET stock_quantity = 0 WHERE id = NEW.product_id;
             END",
        )
        .execute(db.pool())
        .await
        .unwrap();

        let err = writer
            .create_bill(&ctx(), &cash_cart(vec![CartLine::new(&product.id, 2)]))
            .await
            .unwrap_err();

        match err {
            CheckoutError::Core(CoreError::InsufficientStock { sku, requested, .. }) => {
                assert_eq!(sku, "ATTA-5KG");
                assert_eq!(requested, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        assert_eq!(row_count(&db, "bills").await, 0);
        assert_eq!(row_count(&db, "bill_items").await, 0);
        assert_eq!(row_count(&db, "bill_payments").await, 0);
        assert_eq!(next_number(&db).await, 1);
        assert_eq!(stock_of(&db, &product.id).await, 10);
    }

    #[tokio::test]
    async fn test_store_failure_mid_bill_is_transaction_error() {
        let (db, writer) = setup().await;
        let product = add_product(&db, "OIL-1L", 18500, 500, 10).await;

        sqlx::query(
            "CREATE TRIGGER payments_offline BEFORE INSERT ON bill_payments
             BEGIN
                 SELECT RAISE(ABORT, 'payments table unavailable');
             END",
        )
        .execute(db.pool())
        .await
        .unwrap();

        let err = writer
            .create_bill(&ctx(), &cash_cart(vec![CartLine::new(&product.id, 1)]))
            .await
            .unwrap_err();

        assert!(
            matches!(err, CheckoutError::Db(DbError::TransactionFailed(_))),
            "unexpected error: {err:?}"
        );
        assert_eq!(row_count(&db, "bills").await, 0);
        assert_eq!(row_count(&db, "bill_items").await, 0);
        assert_eq!(next_number(&db).await, 1);
        assert_eq!(stock_of(&db, &product.id).await, 10);
    }

    #[tokio::test]
    async fn test_duplicate_lines_are_checked_together() {
        let (db, writer) = setup().await;
        let product = add_product(&db, "EGGS-12", 8400, 0, 3).await;

        let cart = cash_cart(vec![CartLine::new(&product.id, 2), CartLine::new(&product.id, 2)]);
        let err = writer.create_bill(&ctx(), &cart).await.unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::Core(CoreError::InsufficientStock { requested: 4, .. })
        ));

        let cart = cash_cart(vec![CartLine::new(&product.id, 2), CartLine::new(&product.id, 1)]);
        let result = writer.create_bill(&ctx(), &cart).await.unwrap();
        assert_eq!(result.items.len(), 2);
        assert_eq!(stock_of(&db, &product.id).await, 0);
    }

    #[tokio::test]
    async fn test_untracked_product_keeps_stock() {
        let (db, writer) = setup().await;
        let mut service = test_product(STORE, "CARRY-BAG", 500, 0, 0);
        service.is_track_inventory = false;
        db.products().insert(&service).await.unwrap();

        writer
            .create_bill(&ctx(), &cash_cart(vec![CartLine::new(&service.id, 5)]))
            .await
            .unwrap();

        assert_eq!(stock_of(&db, &service.id).await, 0);
    }

    #[tokio::test]
    async fn test_negative_stock_allowed() {
        let (db, writer) = setup().await;
        let mut product = test_product(STORE, "BREAD", 4500, 0, 1);
        product.allow_negative_stock = true;
        db.products().insert(&product).await.unwrap();

        writer
            .create_bill(&ctx(), &cash_cart(vec![CartLine::new(&product.id, 3)]))
            .await
            .unwrap();

        assert_eq!(stock_of(&db, &product.id).await, -2);
    }

    #[tokio::test]
    async fn test_unknown_or_inactive_product() {
        let (db, writer) = setup().await;

        let err = writer
            .create_bill(&ctx(), &cash_cart(vec![CartLine::new("missing", 1)]))
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Core(CoreError::ProductNotFound(_))));

        let mut product = add_product(&db, "OLD-SKU", 1000, 0, 10).await;
        product.is_active = false;
        db.products().update(&product).await.unwrap();

        let err = writer
            .create_bill(&ctx(), &cash_cart(vec![CartLine::new(&product.id, 1)]))
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Core(CoreError::ProductNotFound(_))));
        assert_eq!(next_number(&db).await, 1);
    }

    #[tokio::test]
    async fn test_snapshot_survives_product_edit() {
        let (db, writer) = setup().await;
        let mut product = add_product(&db, "JAM-500", 16500, 1200, 10).await;

        let result = writer
            .create_bill(&ctx(), &cash_cart(vec![CartLine::new(&product.id, 1)]))
            .await
            .unwrap();

        product.name = "Mixed Fruit Jam 500g (new pack)".to_string();
        product.selling_price_paise = 17500;
        db.products().update(&product).await.unwrap();

        let stored = db.bills().get_by_id(STORE, &result.bill.id).await.unwrap().unwrap();
        assert_eq!(stored.items[0].product_name, "Product JAM-500");
        assert_eq!(stored.items[0].selling_price_paise, 16500);
        assert_eq!(stored.items[0].gst_rate_bps, 1200);
    }

    // -------------------------------------------------------------------------
    // Tender
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_split_payment_accepted() {
        let mut settings = store_settings();
        settings.rounding = RoundingMode::NearestPaisa;
        let (db, writer) = setup_with(settings).await;
        let product = add_product(&db, "GHEE-500", 35040, 0, 10).await;

        let tender = Tender::Split {
            legs: vec![leg(PaymentMethod::Cash, 20000), leg(PaymentMethod::Upi, 15040)],
        };
        let cart = CartRequest::new(vec![CartLine::new(&product.id, 1)], tender);
        let result = writer.create_bill(&ctx(), &cart).await.unwrap();

        assert_eq!(result.bill.grand_total_paise, 35040);
        assert_eq!(result.bill.round_off_paise, 0);
        assert_eq!(result.bill.payment_mode, PaymentMode::Split);
        assert_eq!(result.payments.len(), 2);

        let stored = db.bills().get_payments(&result.bill.id).await.unwrap();
        let paid: i64 = stored.iter().map(|p| p.amount_paise).sum();
        assert_eq!(paid, 35040);
    }

    #[tokio::test]
    async fn test_split_mismatch_writes_nothing() {
        let mut settings = store_settings();
        settings.rounding = RoundingMode::NearestPaisa;
        let (db, writer) = setup_with(settings).await;
        let product = add_product(&db, "GHEE-500", 35040, 0, 10).await;

        let tender = Tender::Split {
            legs: vec![leg(PaymentMethod::Cash, 20000), leg(PaymentMethod::Upi, 10000)],
        };
        let cart = CartRequest::new(vec![CartLine::new(&product.id, 1)], tender);
        let err = writer.create_bill(&ctx(), &cart).await.unwrap_err();

        assert!(matches!(err, CheckoutError::Core(CoreError::SplitMismatch { .. })));
        assert_eq!(stock_of(&db, &product.id).await, 10);
        assert_eq!(next_number(&db).await, 1);
        assert_eq!(completed_count(&db).await, 0);
    }

    // -------------------------------------------------------------------------
    // Customers and loyalty
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_loyalty_redeem_and_earn() {
        let mut settings = store_settings();
        settings.loyalty_earn_bps = Some(100);
        let (db, writer) = setup_with(settings).await;
        let product = add_product(&db, "PANEER-1KG", 50000, 0, 10).await;
        let customer = test_customer(STORE, "9845012345", 100);
        db.customers().insert(&customer).await.unwrap();

        let mut cart = cash_cart(vec![CartLine::new(&product.id, 1)]);
        cart.customer_id = Some(customer.id.clone());
        cart.loyalty_points_redeemed = 40;
        let result = writer.create_bill(&ctx(), &cart).await.unwrap();

        let bill = &result.bill;
        assert_eq!(bill.loyalty_discount_paise, 4000);
        assert_eq!(bill.grand_total_paise, 46000);
        assert_eq!(bill.loyalty_points_earned, 4);
        assert_eq!(bill.customer_name.as_deref(), Some("Priya Sharma"));
        assert_eq!(bill.customer_phone.as_deref(), Some("9845012345"));

        let updated = db.customers().get_by_id(STORE, &customer.id).await.unwrap().unwrap();
        assert_eq!(updated.loyalty_points, 64);
        assert_eq!(updated.total_purchase_paise, 46000);
        assert_eq!(updated.visit_count, 1);

        let ledger = db.loyalty().list_for_bill(&bill.id).await.unwrap();
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger[0].kind, LoyaltyKind::Redeem);
        assert_eq!(ledger[0].points, 40);
        assert_eq!(ledger[1].kind, LoyaltyKind::Earn);
        assert_eq!(ledger[1].points, 4);
    }

    #[tokio::test]
    async fn test_insufficient_loyalty_points() {
        let (db, writer) = setup().await;
        let product = add_product(&db, "MILK-1L", 6800, 0, 10).await;
        let customer = test_customer(STORE, "9000000001", 10);
        db.customers().insert(&customer).await.unwrap();

        let mut cart = cash_cart(vec![CartLine::new(&product.id, 1)]);
        cart.customer_id = Some(customer.id.clone());
        cart.loyalty_points_redeemed = 11;
        let err = writer.create_bill(&ctx(), &cart).await.unwrap_err();

        assert!(matches!(
            err,
            CheckoutError::Core(CoreError::InsufficientLoyaltyPoints {
                available: 10,
                requested: 11
            })
        ));
        assert_eq!(stock_of(&db, &product.id).await, 10);
    }

    #[tokio::test]
    async fn test_loyalty_disabled_rejects_redemption() {
        let mut settings = store_settings();
        settings.loyalty_enabled = false;
        let (db, writer) = setup_with(settings).await;
        let product = add_product(&db, "MILK-1L", 6800, 0, 10).await;
        let customer = test_customer(STORE, "9000000003", 50);
        db.customers().insert(&customer).await.unwrap();

        let mut cart = cash_cart(vec![CartLine::new(&product.id, 1)]);
        cart.customer_id = Some(customer.id.clone());
        cart.loyalty_points_redeemed = 5;
        let err = writer.create_bill(&ctx(), &cart).await.unwrap_err();

        assert!(matches!(err, CheckoutError::Core(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_unknown_customer() {
        let (db, writer) = setup().await;
        let product = add_product(&db, "MILK-1L", 6800, 0, 10).await;

        let mut cart = cash_cart(vec![CartLine::new(&product.id, 1)]);
        cart.customer_id = Some("ghost".to_string());
        let err = writer.create_bill(&ctx(), &cart).await.unwrap_err();

        assert!(matches!(err, CheckoutError::Core(CoreError::CustomerNotFound(_))));
    }

    #[tokio::test]
    async fn test_walk_in_customer_details() {
        let (db, writer) = setup().await;
        let product = add_product(&db, "MILK-1L", 6800, 0, 10).await;

        let mut cart = cash_cart(vec![CartLine::new(&product.id, 1)]);
        cart.customer_name = Some("Ravi".to_string());
        cart.customer_phone = Some("9876543210".to_string());
        let result = writer.create_bill(&ctx(), &cart).await.unwrap();

        assert!(result.bill.customer_id.is_none());
        assert_eq!(result.bill.customer_name.as_deref(), Some("Ravi"));
        assert_eq!(result.bill.loyalty_points_earned, 0);
    }

    // -------------------------------------------------------------------------
    // Excess discount
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_excess_discount_rejected_by_default() {
        let (db, writer) = setup().await;
        let product = add_product(&db, "CHOCO", 10000, 0, 10).await;

        let mut cart = cash_cart(vec![CartLine::new(&product.id, 1)]);
        cart.bill_discount = Some(BillDiscount::Amount { paise: 20000 });
        let err = writer.create_bill(&ctx(), &cart).await.unwrap_err();

        match err {
            CheckoutError::Core(CoreError::ExcessDiscount { discount, payable }) => {
                assert_eq!(discount.paise(), 20000);
                assert_eq!(payable.paise(), 10000);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_excess_discount_floors_at_zero_when_allowed() {
        let mut settings = store_settings();
        settings.reject_excess_discount = false;
        let (db, writer) = setup_with(settings).await;
        let product = add_product(&db, "CHOCO", 10000, 0, 10).await;

        let mut cart = cash_cart(vec![CartLine::new(&product.id, 1)]);
        cart.bill_discount = Some(BillDiscount::Amount { paise: 20000 });
        let result = writer.create_bill(&ctx(), &cart).await.unwrap();

        assert_eq!(result.bill.grand_total_paise, 0);
        assert_eq!(result.bill.recomputed_grand_total(), Money::zero());
        assert_eq!(result.items[0].net_amount_paise, 0);
        assert_eq!(result.payments[0].amount_paise, 0);
    }

    // -------------------------------------------------------------------------
    // Store / preview
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_unconfigured_store() {
        let (db, writer) = setup().await;
        let product = add_product(&db, "MILK-1L", 6800, 0, 10).await;

        let other = CheckoutContext::new("store-2", "cashier-1");
        let err = writer
            .create_bill(&other, &cash_cart(vec![CartLine::new(&product.id, 1)]))
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::Core(CoreError::StoreNotConfigured(_))));
    }

    #[tokio::test]
    async fn test_invalid_cart_is_rejected_before_reading() {
        let (_db, writer) = setup().await;

        let err = writer.create_bill(&ctx(), &cash_cart(vec![])).await.unwrap_err();
        assert!(matches!(err, CheckoutError::Core(CoreError::Validation(_))));

        let err = writer
            .create_bill(&ctx(), &cash_cart(vec![CartLine::new("p-1", 0)]))
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Core(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_preview_writes_nothing() {
        let (db, writer) = setup().await;
        let product = add_product(&db, "GHEE-500", 35040, 0, 10).await;

        let quote = writer
            .preview(&ctx(), &cash_cart(vec![CartLine::new(&product.id, 2)]))
            .await
            .unwrap();

        assert_eq!(quote.totals.grand_total.paise(), 70100);
        assert_eq!(quote.totals.round_off.paise(), 20);
        assert_eq!(quote.lines.len(), 1);
        assert_eq!(quote.lines[0].net_amount.paise(), 70080);
        assert_eq!(stock_of(&db, &product.id).await, 10);
        assert_eq!(next_number(&db).await, 1);
        assert_eq!(completed_count(&db).await, 0);
    }

    // -------------------------------------------------------------------------
    // Cancellation
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_cancel_is_status_only_by_default() {
        let (db, writer) = setup().await;
        let product = add_product(&db, "SUGAR-1KG", 4800, 500, 10).await;
        let created = writer
            .create_bill(&ctx(), &cash_cart(vec![CartLine::new(&product.id, 2)]))
            .await
            .unwrap();

        let cancelled = writer
            .cancel_bill(STORE, &created.bill.id, "manager-1", "customer changed mind", None)
            .await
            .unwrap();

        assert_eq!(cancelled.bill.status, BillStatus::Cancelled);
        assert_eq!(cancelled.bill.cancelled_by.as_deref(), Some("manager-1"));
        assert!(cancelled.bill.cancelled_at.is_some());
        assert_eq!(cancelled.items.len(), 1);
        assert_eq!(stock_of(&db, &product.id).await, 8);
    }

    #[tokio::test]
    async fn test_cancel_with_restock() {
        let (db, writer) = setup().await;
        let product = add_product(&db, "SUGAR-1KG", 4800, 500, 10).await;
        let created = writer
            .create_bill(&ctx(), &cash_cart(vec![CartLine::new(&product.id, 2)]))
            .await
            .unwrap();

        writer
            .cancel_bill(STORE, &created.bill.id, "manager-1", "wrong items", Some(true))
            .await
            .unwrap();

        assert_eq!(stock_of(&db, &product.id).await, 10);
    }

    #[tokio::test]
    async fn test_cancel_twice_or_unknown() {
        let (db, writer) = setup().await;
        let product = add_product(&db, "SUGAR-1KG", 4800, 500, 10).await;
        let created = writer
            .create_bill(&ctx(), &cash_cart(vec![CartLine::new(&product.id, 1)]))
            .await
            .unwrap();

        writer
            .cancel_bill(STORE, &created.bill.id, "manager-1", "duplicate", None)
            .await
            .unwrap();

        let err = writer
            .cancel_bill(STORE, &created.bill.id, "manager-1", "duplicate", None)
            .await
            .unwrap_err();
        match err {
            CheckoutError::Core(CoreError::InvalidBillStatus { current_status, .. }) => {
                assert_eq!(current_status, "cancelled");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let err = writer
            .cancel_bill(STORE, "missing", "manager-1", "duplicate", None)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Core(CoreError::BillNotFound(_))));

        let err = writer
            .cancel_bill(STORE, &created.bill.id, "manager-1", "  ", None)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Core(CoreError::Validation(_))));
    }

    // -------------------------------------------------------------------------
    // Concurrency
    // -------------------------------------------------------------------------

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_checkouts_never_oversell() {
        let dir = tempfile::tempdir().unwrap();
        let config = DbConfig::new(dir.path().join("kirana.db"))
            .max_connections(8)
            .busy_timeout(Duration::from_secs(10));
        let db = Database::new(config).await.unwrap();
        db.settings().upsert(&store_settings()).await.unwrap();
        let product = add_product(&db, "LAST-UNITS", 9900, 0, 3).await;

        let mut handles = Vec::new();
        for i in 0..10 {
            let writer = db.checkout();
            let cart = cash_cart(vec![CartLine::new(&product.id, 1)]);
            let ctx = CheckoutContext::new(STORE, format!("cashier-{i}"));
            handles.push(tokio::spawn(async move { writer.create_bill(&ctx, &cart).await }));
        }

        let mut sold = Vec::new();
        let mut refused = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(result) => sold.push(result.bill.bill_number),
                Err(CheckoutError::Core(CoreError::InsufficientStock { .. })) => refused += 1,
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }

        sold.sort();
        assert_eq!(sold, vec!["SM-000001-BLR", "SM-000002-BLR", "SM-000003-BLR"]);
        assert_eq!(refused, 7);
        assert_eq!(stock_of(&db, &product.id).await, 0);
        assert_eq!(completed_count(&db).await, 3);
    }
}
