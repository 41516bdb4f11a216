//! # Bill Repository
//!
//! Bill headers, line items and payment legs.
//!
//! ## Bill Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Bill Lifecycle                                    │
//! │                                                                         │
//! │  1. CHECKOUT (one transaction, checkout.rs)                            │
//! │     └── insert_bill()    → Bill { status: Completed }                  │
//! │     └── insert_item()    → BillItem (product snapshot)  × lines        │
//! │     └── insert_payment() → BillPayment                  × legs         │
//! │                                                                         │
//! │  2. READ                                                               │
//! │     └── get_by_id() / get_by_public_id() / list()                      │
//! │                                                                         │
//! │  3. (OPTIONAL) CANCEL                                                  │
//! │     └── mark_cancelled() → Bill { status: Cancelled }                  │
//! │         only from Completed, guarded in the WHERE clause               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rows are never updated after checkout except for the cancellation fields.

use chrono::{DateTime, Utc};
use sqlx::{SqliteExecutor, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use kirana_core::{Bill, BillItem, BillPayment, BillStatus, BillWithItems};

const BILL_COLUMNS: &str = r#"
    id, store_id, bill_number, public_id, status,
    customer_id, customer_name, customer_phone, cashier_id, supply_type,
    subtotal_paise, item_discount_paise, bill_discount_paise, bill_discount_percent_bps,
    loyalty_points_redeemed, loyalty_discount_paise, loyalty_points_earned,
    taxable_paise, tax_total_paise, cgst_paise, sgst_paise, igst_paise,
    round_off_paise, grand_total_paise, payment_mode, notes,
    created_at, completed_at, cancelled_at, cancelled_by, cancellation_reason
"#;

const ITEM_COLUMNS: &str = r#"
    id, bill_id, line_no, product_id, product_name, product_sku, hsn_code, unit,
    mrp_paise, selling_price_paise, quantity, discount_percent_bps,
    line_total_paise, discount_paise, gst_rate_bps, taxable_paise,
    cgst_paise, sgst_paise, igst_paise, total_paise,
    bill_discount_share_paise, net_amount_paise, created_at
"#;

const PAYMENT_COLUMNS: &str = "id, bill_id, method, amount_paise, reference, created_at";

/// Default page size for bill listings.
pub const DEFAULT_LIST_LIMIT: u32 = 50;

/// Filter for [`BillRepository::list`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillFilter {
    pub status: Option<BillStatus>,
    /// Inclusive lower bound on `created_at`.
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `created_at`.
    pub to: Option<DateTime<Utc>>,
    pub limit: u32,
    pub offset: u32,
}

impl Default for BillFilter {
    fn default() -> Self {
        BillFilter {
            status: None,
            from: None,
            to: None,
            limit: DEFAULT_LIST_LIMIT,
            offset: 0,
        }
    }
}

/// Repository for reading bills.
#[derive(Debug, Clone)]
pub struct BillRepository {
    pool: SqlitePool,
}

impl BillRepository {
    /// Creates a new BillRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BillRepository { pool }
    }

    /// Gets a bill with its items and payments.
    pub async fn get_by_id(&self, store_id: &str, id: &str) -> DbResult<Option<BillWithItems>> {
        match fetch_bill(&self.pool, store_id, id).await? {
            Some(bill) => Ok(Some(self.with_lines(bill).await?)),
            None => Ok(None),
        }
    }

    /// Gets a bill by its public id. Public ids are globally unique, so the
    /// lookup is not store-scoped.
    pub async fn get_by_public_id(&self, public_id: &str) -> DbResult<Option<BillWithItems>> {
        debug!(public_id = %public_id, "Fetching bill by public id");

        let sql = format!("SELECT {BILL_COLUMNS} FROM bills WHERE public_id = ?1");
        let bill = sqlx::query_as::<_, Bill>(&sql)
            .bind(public_id)
            .fetch_optional(&self.pool)
            .await?;

        match bill {
            Some(bill) => Ok(Some(self.with_lines(bill).await?)),
            None => Ok(None),
        }
    }

    /// Lists bill headers of a store, newest first.
    pub async fn list(&self, store_id: &str, filter: &BillFilter) -> DbResult<Vec<Bill>> {
        debug!(store_id = %store_id, ?filter, "Listing bills");

        let sql = format!(
            "SELECT {BILL_COLUMNS} FROM bills
             WHERE store_id = ?1
               AND (?2 IS NULL OR status = ?2)
               AND (?3 IS NULL OR created_at >= ?3)
               AND (?4 IS NULL OR created_at < ?4)
             ORDER BY created_at DESC, bill_number DESC
             LIMIT ?5 OFFSET ?6"
        );

        let bills = sqlx::query_as::<_, Bill>(&sql)
            .bind(store_id)
            .bind(filter.status)
            .bind(filter.from)
            .bind(filter.to)
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(bills)
    }

    /// Gets the items of a bill in line order.
    pub async fn get_items(&self, bill_id: &str) -> DbResult<Vec<BillItem>> {
        fetch_items(&self.pool, bill_id).await
    }

    /// Gets the payment legs of a bill.
    pub async fn get_payments(&self, bill_id: &str) -> DbResult<Vec<BillPayment>> {
        let sql = format!(
            "SELECT {PAYMENT_COLUMNS} FROM bill_payments WHERE bill_id = ?1 ORDER BY created_at, rowid"
        );

        let payments = sqlx::query_as::<_, BillPayment>(&sql)
            .bind(bill_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(payments)
    }

    /// Counts bills of a store with the given status.
    pub async fn count_by_status(&self, store_id: &str, status: BillStatus) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM bills WHERE store_id = ?1 AND status = ?2")
                .bind(store_id)
                .bind(status)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    async fn with_lines(&self, bill: Bill) -> DbResult<BillWithItems> {
        let items = self.get_items(&bill.id).await?;
        let payments = self.get_payments(&bill.id).await?;
        Ok(BillWithItems {
            bill,
            items,
            payments,
        })
    }
}

// =============================================================================
// Executor-generic helpers (used inside the checkout transaction)
// =============================================================================

/// Fetches a bill header of the store.
pub async fn fetch_bill<'e, E>(exec: E, store_id: &str, id: &str) -> DbResult<Option<Bill>>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!("SELECT {BILL_COLUMNS} FROM bills WHERE id = ?1 AND store_id = ?2");

    let bill = sqlx::query_as::<_, Bill>(&sql)
        .bind(id)
        .bind(store_id)
        .fetch_optional(exec)
        .await?;

    Ok(bill)
}

/// Fetches the items of a bill in line order.
pub async fn fetch_items<'e, E>(exec: E, bill_id: &str) -> DbResult<Vec<BillItem>>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!("SELECT {ITEM_COLUMNS} FROM bill_items WHERE bill_id = ?1 ORDER BY line_no");

    let items = sqlx::query_as::<_, BillItem>(&sql)
        .bind(bill_id)
        .fetch_all(exec)
        .await?;

    Ok(items)
}

/// Inserts a bill header.
pub async fn insert_bill<'e, E>(exec: E, bill: &Bill) -> DbResult<()>
where
    E: SqliteExecutor<'e>,
{
    debug!(id = %bill.id, bill_number = %bill.bill_number, "Inserting bill");

    sqlx::query(
        r#"
        INSERT INTO bills (
            id, store_id, bill_number, public_id, status,
            customer_id, customer_name, customer_phone, cashier_id, supply_type,
            subtotal_paise, item_discount_paise, bill_discount_paise, bill_discount_percent_bps,
            loyalty_points_redeemed, loyalty_discount_paise, loyalty_points_earned,
            taxable_paise, tax_total_paise, cgst_paise, sgst_paise, igst_paise,
            round_off_paise, grand_total_paise, payment_mode, notes,
            created_at, completed_at, cancelled_at, cancelled_by, cancellation_reason
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5,
            ?6, ?7, ?8, ?9, ?10,
            ?11, ?12, ?13, ?14,
            ?15, ?16, ?17,
            ?18, ?19, ?20, ?21, ?22,
            ?23, ?24, ?25, ?26,
            ?27, ?28, ?29, ?30, ?31
        )
        "#,
    )
    .bind(&bill.id)
    .bind(&bill.store_id)
    .bind(&bill.bill_number)
    .bind(&bill.public_id)
    .bind(bill.status)
    .bind(&bill.customer_id)
    .bind(&bill.customer_name)
    .bind(&bill.customer_phone)
    .bind(&bill.cashier_id)
    .bind(bill.supply_type)
    .bind(bill.subtotal_paise)
    .bind(bill.item_discount_paise)
    .bind(bill.bill_discount_paise)
    .bind(bill.bill_discount_percent_bps)
    .bind(bill.loyalty_points_redeemed)
    .bind(bill.loyalty_discount_paise)
    .bind(bill.loyalty_points_earned)
    .bind(bill.taxable_paise)
    .bind(bill.tax_total_paise)
    .bind(bill.cgst_paise)
    .bind(bill.sgst_paise)
    .bind(bill.igst_paise)
    .bind(bill.round_off_paise)
    .bind(bill.grand_total_paise)
    .bind(bill.payment_mode)
    .bind(&bill.notes)
    .bind(bill.created_at)
    .bind(bill.completed_at)
    .bind(bill.cancelled_at)
    .bind(&bill.cancelled_by)
    .bind(&bill.cancellation_reason)
    .execute(exec)
    .await?;

    Ok(())
}

/// Inserts one bill item.
///
/// ## Snapshot Pattern
/// Product details (name, SKU, HSN, MRP, price) are copied onto the item.
/// This preserves the bill even if the product changes later.
pub async fn insert_item<'e, E>(exec: E, item: &BillItem) -> DbResult<()>
where
    E: SqliteExecutor<'e>,
{
    debug!(bill_id = %item.bill_id, product_id = %item.product_id, "Inserting bill item");

    sqlx::query(
        r#"
        INSERT INTO bill_items (
            id, bill_id, line_no, product_id, product_name, product_sku, hsn_code, unit,
            mrp_paise, selling_price_paise, quantity, discount_percent_bps,
            line_total_paise, discount_paise, gst_rate_bps, taxable_paise,
            cgst_paise, sgst_paise, igst_paise, total_paise,
            bill_discount_share_paise, net_amount_paise, created_at
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8,
            ?9, ?10, ?11, ?12,
            ?13, ?14, ?15, ?16,
            ?17, ?18, ?19, ?20,
            ?21, ?22, ?23
        )
        "#,
    )
    .bind(&item.id)
    .bind(&item.bill_id)
    .bind(item.line_no)
    .bind(&item.product_id)
    .bind(&item.product_name)
    .bind(&item.product_sku)
    .bind(&item.hsn_code)
    .bind(&item.unit)
    .bind(item.mrp_paise)
    .bind(item.selling_price_paise)
    .bind(item.quantity)
    .bind(item.discount_percent_bps)
    .bind(item.line_total_paise)
    .bind(item.discount_paise)
    .bind(item.gst_rate_bps)
    .bind(item.taxable_paise)
    .bind(item.cgst_paise)
    .bind(item.sgst_paise)
    .bind(item.igst_paise)
    .bind(item.total_paise)
    .bind(item.bill_discount_share_paise)
    .bind(item.net_amount_paise)
    .bind(item.created_at)
    .execute(exec)
    .await?;

    Ok(())
}

/// Records one payment leg.
pub async fn insert_payment<'e, E>(exec: E, payment: &BillPayment) -> DbResult<()>
where
    E: SqliteExecutor<'e>,
{
    debug!(bill_id = %payment.bill_id, amount = payment.amount_paise, "Recording payment");

    sqlx::query(
        r#"
        INSERT INTO bill_payments (id, bill_id, method, amount_paise, reference, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(&payment.id)
    .bind(&payment.bill_id)
    .bind(payment.method)
    .bind(payment.amount_paise)
    .bind(&payment.reference)
    .bind(payment.created_at)
    .execute(exec)
    .await?;

    Ok(())
}

/// Moves a completed bill to cancelled.
///
/// Returns `false` when the bill is not (or no longer) completed.
pub async fn mark_cancelled<'e, E>(
    exec: E,
    store_id: &str,
    id: &str,
    actor: &str,
    reason: &str,
    now: DateTime<Utc>,
) -> DbResult<bool>
where
    E: SqliteExecutor<'e>,
{
    debug!(id = %id, actor = %actor, "Cancelling bill");

    let result = sqlx::query(
        r#"
        UPDATE bills SET
            status = 'cancelled',
            cancelled_at = ?3,
            cancelled_by = ?4,
            cancellation_reason = ?5
        WHERE id = ?1 AND store_id = ?2 AND status = 'completed'
        "#,
    )
    .bind(id)
    .bind(store_id)
    .bind(now)
    .bind(actor)
    .bind(reason)
    .execute(exec)
    .await?;

    Ok(result.rows_affected() == 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter() {
        let filter = BillFilter::default();
        assert_eq!(filter.limit, DEFAULT_LIST_LIMIT);
        assert_eq!(filter.offset, 0);
        assert!(filter.status.is_none());
    }
}
