//! # Held Bill Repository
//!
//! Durable storage for parked carts.
//!
//! ## States
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   insert ──► ACTIVE ──(now ≥ expires_at)──► STALE                       │
//! │                │                              │                         │
//! │                │ mark_resumed                 │ mark_resumed            │
//! │                ▼                              ▼                         │
//! │             RESUMED  (resumed_at set, excluded from active listing)     │
//! │                                                                         │
//! │   delete removes the row in any state                                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Stale holds are only hidden from [`HeldBillRepository::list_active`]; a
//! lookup by id still returns them.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use kirana_core::{HeldBill, HeldCart};

const HELD_COLUMNS: &str = r#"
    id, store_id, cashier_id, customer_name, notes, cart_payload,
    subtotal_paise, item_count, held_at, expires_at, resumed_at
"#;

/// Row shape of `held_bills`; the cart travels as JSON text.
#[derive(Debug, sqlx::FromRow)]
struct HeldBillRow {
    id: String,
    store_id: String,
    cashier_id: String,
    customer_name: Option<String>,
    notes: Option<String>,
    cart_payload: String,
    subtotal_paise: i64,
    item_count: i64,
    held_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    resumed_at: Option<DateTime<Utc>>,
}

impl TryFrom<HeldBillRow> for HeldBill {
    type Error = DbError;

    fn try_from(row: HeldBillRow) -> DbResult<Self> {
        let cart: HeldCart = serde_json::from_str(&row.cart_payload)?;

        Ok(HeldBill {
            id: row.id,
            store_id: row.store_id,
            cashier_id: row.cashier_id,
            customer_name: row.customer_name,
            notes: row.notes,
            cart,
            subtotal_paise: row.subtotal_paise,
            item_count: row.item_count,
            held_at: row.held_at,
            expires_at: row.expires_at,
            resumed_at: row.resumed_at,
        })
    }
}

/// Repository for held bills.
#[derive(Debug, Clone)]
pub struct HeldBillRepository {
    pool: SqlitePool,
}

impl HeldBillRepository {
    /// Creates a new HeldBillRepository.
    pub fn new(pool: SqlitePool) -> Self {
        HeldBillRepository { pool }
    }

    /// Persists a held bill.
    pub async fn insert(&self, held: &HeldBill) -> DbResult<()> {
        debug!(id = %held.id, store_id = %held.store_id, items = held.item_count, "Holding bill");

        let payload = serde_json::to_string(&held.cart)?;

        sqlx::query(
            r#"
            INSERT INTO held_bills (
                id, store_id, cashier_id, customer_name, notes, cart_payload,
                subtotal_paise, item_count, held_at, expires_at, resumed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&held.id)
        .bind(&held.store_id)
        .bind(&held.cashier_id)
        .bind(&held.customer_name)
        .bind(&held.notes)
        .bind(payload)
        .bind(held.subtotal_paise)
        .bind(held.item_count)
        .bind(held.held_at)
        .bind(held.expires_at)
        .bind(held.resumed_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Lists holds that are neither resumed nor expired at `now`, newest first.
    pub async fn list_active(&self, store_id: &str, now: DateTime<Utc>) -> DbResult<Vec<HeldBill>> {
        let sql = format!(
            "SELECT {HELD_COLUMNS} FROM held_bills
             WHERE store_id = ?1 AND resumed_at IS NULL AND expires_at > ?2
             ORDER BY held_at DESC"
        );

        let rows = sqlx::query_as::<_, HeldBillRow>(&sql)
            .bind(store_id)
            .bind(now)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(HeldBill::try_from).collect()
    }

    /// Gets a hold by id regardless of its state.
    pub async fn get(&self, store_id: &str, id: &str) -> DbResult<Option<HeldBill>> {
        let sql = format!("SELECT {HELD_COLUMNS} FROM held_bills WHERE id = ?1 AND store_id = ?2");

        let row = sqlx::query_as::<_, HeldBillRow>(&sql)
            .bind(id)
            .bind(store_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(HeldBill::try_from).transpose()
    }

    /// Sets `resumed_at` if the hold has not been resumed yet.
    ///
    /// Returns `false` when another resume got there first.
    pub async fn mark_resumed(&self, store_id: &str, id: &str, now: DateTime<Utc>) -> DbResult<bool> {
        debug!(id = %id, "Resuming held bill");

        let result = sqlx::query(
            "UPDATE held_bills SET resumed_at = ?3
             WHERE id = ?1 AND store_id = ?2 AND resumed_at IS NULL",
        )
        .bind(id)
        .bind(store_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Permanently deletes a hold.
    pub async fn delete(&self, store_id: &str, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting held bill");

        let result = sqlx::query("DELETE FROM held_bills WHERE id = ?1 AND store_id = ?2")
            .bind(id)
            .bind(store_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("HeldBill", id));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use chrono::Duration;
    use kirana_core::HeldCartLine;
    use rust_decimal::Decimal;

    const STORE: &str = "store-1";

    fn held(held_at: DateTime<Utc>) -> HeldBill {
        let cart = HeldCart {
            items: vec![HeldCartLine {
                product_id: "p-1".to_string(),
                product_name: "Basmati Rice 1kg".to_string(),
                sku: "RICE-1KG".to_string(),
                unit_price_paise: 12000,
                quantity: 2,
                discount_percent: Decimal::ZERO,
            }],
            customer_name: Some("Ravi".to_string()),
            ..HeldCart::default()
        };

        HeldBill {
            id: crate::repository::generate_id(),
            store_id: STORE.to_string(),
            cashier_id: "cashier-1".to_string(),
            customer_name: Some("Ravi".to_string()),
            notes: None,
            subtotal_paise: cart.subtotal().paise(),
            item_count: cart.item_count(),
            cart,
            held_at,
            expires_at: held_at + Duration::hours(24),
            resumed_at: None,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get_round_trips_cart() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.held_bills();
        let hold = held(Utc::now());
        repo.insert(&hold).await.unwrap();

        let loaded = repo.get(STORE, &hold.id).await.unwrap().unwrap();
        assert_eq!(loaded.cart, hold.cart);
        assert_eq!(loaded.subtotal_paise, 24000);
    }

    #[tokio::test]
    async fn test_list_active_excludes_expired_and_resumed() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.held_bills();
        let now = Utc::now();

        let fresh = held(now - Duration::hours(1));
        let stale = held(now - Duration::hours(25));
        let resumed = held(now - Duration::hours(2));
        for h in [&fresh, &stale, &resumed] {
            repo.insert(h).await.unwrap();
        }
        assert!(repo.mark_resumed(STORE, &resumed.id, now).await.unwrap());

        let active = repo.list_active(STORE, now).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, fresh.id);

        // Stale holds are still reachable by id
        assert!(repo.get(STORE, &stale.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_mark_resumed_only_once() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.held_bills();
        let hold = held(Utc::now());
        repo.insert(&hold).await.unwrap();

        assert!(repo.mark_resumed(STORE, &hold.id, Utc::now()).await.unwrap());
        assert!(!repo.mark_resumed(STORE, &hold.id, Utc::now()).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_is_permanent() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.held_bills();
        let hold = held(Utc::now());
        repo.insert(&hold).await.unwrap();

        repo.delete(STORE, &hold.id).await.unwrap();
        assert!(repo.get(STORE, &hold.id).await.unwrap().is_none());
        assert!(matches!(
            repo.delete(STORE, &hold.id).await,
            Err(DbError::NotFound { .. })
        ));
    }
}
