//! # Customer Repository
//!
//! Customers and their loyalty balance.
//!
//! A completed bill touches the customer row exactly once, through
//! [`apply_bill`]: purchase total and visit count go up, redeemed points go
//! down, earned points go up. The redemption is guarded in SQL
//! (`loyalty_points >= redeemed`) so two counters cannot spend the same
//! points twice.

use chrono::{DateTime, Utc};
use sqlx::{SqliteExecutor, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use kirana_core::Customer;

const CUSTOMER_COLUMNS: &str = r#"
    id, store_id, name, phone, email,
    loyalty_points, total_purchase_paise, visit_count,
    created_at, updated_at
"#;

/// Repository for customer database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Gets a customer by ID within a store.
    pub async fn get_by_id(&self, store_id: &str, id: &str) -> DbResult<Option<Customer>> {
        fetch(&self.pool, store_id, id).await
    }

    /// Gets a customer by phone number within a store.
    pub async fn get_by_phone(&self, store_id: &str, phone: &str) -> DbResult<Option<Customer>> {
        let sql =
            format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE store_id = ?1 AND phone = ?2");

        let customer = sqlx::query_as::<_, Customer>(&sql)
            .bind(store_id)
            .bind(phone)
            .fetch_optional(&self.pool)
            .await?;

        Ok(customer)
    }

    /// Inserts a new customer.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - Phone already registered in the store
    pub async fn insert(&self, customer: &Customer) -> DbResult<Customer> {
        debug!(id = %customer.id, store_id = %customer.store_id, "Inserting customer");

        sqlx::query(
            r#"
            INSERT INTO customers (
                id, store_id, name, phone, email,
                loyalty_points, total_purchase_paise, visit_count,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.store_id)
        .bind(&customer.name)
        .bind(&customer.phone)
        .bind(&customer.email)
        .bind(customer.loyalty_points)
        .bind(customer.total_purchase_paise)
        .bind(customer.visit_count)
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DbError::from(e).with_duplicate_value(customer.phone.as_deref().unwrap_or_default())
        })?;

        Ok(customer.clone())
    }

    /// Sets a customer's loyalty balance (manual correction).
    pub async fn set_loyalty_points(&self, store_id: &str, id: &str, points: i64) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE customers SET loyalty_points = ?3, updated_at = ?4 WHERE id = ?1 AND store_id = ?2",
        )
        .bind(id)
        .bind(store_id)
        .bind(points)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", id));
        }

        Ok(())
    }
}

// =============================================================================
// Executor-generic helpers (used inside the checkout transaction)
// =============================================================================

/// Fetches a customer of the store.
pub async fn fetch<'e, E>(exec: E, store_id: &str, id: &str) -> DbResult<Option<Customer>>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?1 AND store_id = ?2");

    let customer = sqlx::query_as::<_, Customer>(&sql)
        .bind(id)
        .bind(store_id)
        .fetch_optional(exec)
        .await?;

    Ok(customer)
}

/// Per-bill changes to a customer row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CustomerBillEffect {
    pub grand_total_paise: i64,
    pub points_redeemed: i64,
    pub points_earned: i64,
}

/// Applies a completed bill to a customer.
///
/// Returns `false` when the customer no longer has `points_redeemed` points
/// (or does not exist); the caller rolls back.
pub async fn apply_bill<'e, E>(
    exec: E,
    id: &str,
    effect: CustomerBillEffect,
    now: DateTime<Utc>,
) -> DbResult<bool>
where
    E: SqliteExecutor<'e>,
{
    debug!(
        id = %id,
        total = effect.grand_total_paise,
        redeemed = effect.points_redeemed,
        earned = effect.points_earned,
        "Applying bill to customer"
    );

    let result = sqlx::query(
        r#"
        UPDATE customers SET
            total_purchase_paise = total_purchase_paise + ?2,
            visit_count = visit_count + 1,
            loyalty_points = loyalty_points - ?3 + ?4,
            updated_at = ?5
        WHERE id = ?1 AND loyalty_points >= ?3
        "#,
    )
    .bind(id)
    .bind(effect.grand_total_paise)
    .bind(effect.points_redeemed)
    .bind(effect.points_earned)
    .bind(now)
    .execute(exec)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Builds a customer for tests.
#[cfg(test)]
pub(crate) fn test_customer(store_id: &str, phone: &str, points: i64) -> Customer {
    let now = Utc::now();
    Customer {
        id: crate::repository::generate_id(),
        store_id: store_id.to_string(),
        name: "Priya Sharma".to_string(),
        phone: Some(phone.to_string()),
        email: None,
        loyalty_points: points,
        total_purchase_paise: 0,
        visit_count: 0,
        created_at: now,
        updated_at: now,
    }
}
