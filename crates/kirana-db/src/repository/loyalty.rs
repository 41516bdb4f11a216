//! # Loyalty Ledger Repository
//!
//! Append-only record of loyalty movements. The customer row holds the
//! balance; the ledger explains it, one `earn` or `redeem` row per bill.

use sqlx::{SqliteExecutor, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use kirana_core::LoyaltyTransaction;

const LEDGER_COLUMNS: &str = "id, store_id, customer_id, bill_id, kind, points, created_at";

/// Repository for the loyalty ledger.
#[derive(Debug, Clone)]
pub struct LoyaltyRepository {
    pool: SqlitePool,
}

impl LoyaltyRepository {
    /// Creates a new LoyaltyRepository.
    pub fn new(pool: SqlitePool) -> Self {
        LoyaltyRepository { pool }
    }

    /// Lists a customer's movements, newest first.
    pub async fn list_for_customer(
        &self,
        store_id: &str,
        customer_id: &str,
    ) -> DbResult<Vec<LoyaltyTransaction>> {
        let sql = format!(
            "SELECT {LEDGER_COLUMNS} FROM loyalty_transactions
             WHERE store_id = ?1 AND customer_id = ?2
             ORDER BY created_at DESC, rowid DESC"
        );

        let rows = sqlx::query_as::<_, LoyaltyTransaction>(&sql)
            .bind(store_id)
            .bind(customer_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    /// Lists the movements caused by one bill.
    pub async fn list_for_bill(&self, bill_id: &str) -> DbResult<Vec<LoyaltyTransaction>> {
        let sql = format!(
            "SELECT {LEDGER_COLUMNS} FROM loyalty_transactions WHERE bill_id = ?1 ORDER BY rowid"
        );

        let rows = sqlx::query_as::<_, LoyaltyTransaction>(&sql)
            .bind(bill_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    /// Net points from the ledger (earned − redeemed).
    pub async fn net_points(&self, store_id: &str, customer_id: &str) -> DbResult<i64> {
        let net: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT SUM(CASE kind WHEN 'earn' THEN points ELSE -points END)
            FROM loyalty_transactions
            WHERE store_id = ?1 AND customer_id = ?2
            "#,
        )
        .bind(store_id)
        .bind(customer_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(net.unwrap_or(0))
    }
}

/// Appends a ledger row.
pub async fn insert<'e, E>(exec: E, entry: &LoyaltyTransaction) -> DbResult<()>
where
    E: SqliteExecutor<'e>,
{
    debug!(
        customer_id = %entry.customer_id,
        bill_id = %entry.bill_id,
        kind = ?entry.kind,
        points = entry.points,
        "Recording loyalty movement"
    );

    sqlx::query(
        r#"
        INSERT INTO loyalty_transactions (id, store_id, customer_id, bill_id, kind, points, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&entry.id)
    .bind(&entry.store_id)
    .bind(&entry.customer_id)
    .bind(&entry.bill_id)
    .bind(entry.kind)
    .bind(entry.points)
    .bind(entry.created_at)
    .execute(exec)
    .await?;

    Ok(())
}
