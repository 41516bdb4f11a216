//! # Store Settings Repository
//!
//! Persists [`StoreSettings`] and hands out bill numbers.
//!
//! ## Bill Numbering
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │  UPDATE store_settings                                                  │
//! │     SET next_invoice_number = next_invoice_number + 1                   │
//! │   WHERE store_id = ?                                                    │
//! │  RETURNING *              ← write lock taken here, first statement      │
//! │                                                                         │
//! │  sequence = returned next_invoice_number − 1                            │
//! │  bill_number = prefix-{sequence:06}[-suffix]                            │
//! │  … rest of the bill …                                                   │
//! │  COMMIT                   ← counter and bill become visible together    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A rolled-back checkout also rolls back its counter bump, so numbers are
//! gap-free for committed bills and never depend on the wall clock.

use chrono::{DateTime, Utc};
use sqlx::{SqliteExecutor, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use kirana_core::StoreSettings;

const SETTINGS_COLUMNS: &str = r#"
    store_id, store_name, invoice_prefix, invoice_suffix, next_invoice_number,
    tax_mode, default_supply, rounding,
    loyalty_enabled, loyalty_earn_bps, loyalty_redemption_paise,
    reject_excess_discount, restock_on_cancel, hold_expiry_hours,
    currency_symbol, updated_at
"#;

/// Repository for store settings.
#[derive(Debug, Clone)]
pub struct SettingsRepository {
    pool: SqlitePool,
}

impl SettingsRepository {
    /// Creates a new SettingsRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SettingsRepository { pool }
    }

    /// Gets the settings of a store.
    pub async fn get(&self, store_id: &str) -> DbResult<Option<StoreSettings>> {
        fetch(&self.pool, store_id).await
    }

    /// Inserts or replaces the settings of a store.
    ///
    /// `next_invoice_number` is only taken from `settings` on first insert;
    /// an existing counter is never moved backwards by a settings save.
    pub async fn upsert(&self, settings: &StoreSettings) -> DbResult<()> {
        debug!(store_id = %settings.store_id, "Saving store settings");

        sqlx::query(
            r#"
            INSERT INTO store_settings (
                store_id, store_name, invoice_prefix, invoice_suffix, next_invoice_number,
                tax_mode, default_supply, rounding,
                loyalty_enabled, loyalty_earn_bps, loyalty_redemption_paise,
                reject_excess_discount, restock_on_cancel, hold_expiry_hours,
                currency_symbol, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
            ON CONFLICT (store_id) DO UPDATE SET
                store_name = excluded.store_name,
                invoice_prefix = excluded.invoice_prefix,
                invoice_suffix = excluded.invoice_suffix,
                next_invoice_number = MAX(next_invoice_number, excluded.next_invoice_number),
                tax_mode = excluded.tax_mode,
                default_supply = excluded.default_supply,
                rounding = excluded.rounding,
                loyalty_enabled = excluded.loyalty_enabled,
                loyalty_earn_bps = excluded.loyalty_earn_bps,
                loyalty_redemption_paise = excluded.loyalty_redemption_paise,
                reject_excess_discount = excluded.reject_excess_discount,
                restock_on_cancel = excluded.restock_on_cancel,
                hold_expiry_hours = excluded.hold_expiry_hours,
                currency_symbol = excluded.currency_symbol,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&settings.store_id)
        .bind(&settings.store_name)
        .bind(&settings.invoice_prefix)
        .bind(&settings.invoice_suffix)
        .bind(settings.next_invoice_number)
        .bind(settings.tax_mode)
        .bind(settings.default_supply)
        .bind(settings.rounding)
        .bind(settings.loyalty_enabled)
        .bind(settings.loyalty_earn_bps)
        .bind(settings.loyalty_redemption_paise)
        .bind(settings.reject_excess_discount)
        .bind(settings.restock_on_cancel)
        .bind(settings.hold_expiry_hours)
        .bind(&settings.currency_symbol)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

// =============================================================================
// Executor-generic helpers
// =============================================================================

/// Fetches the settings of a store.
pub async fn fetch<'e, E>(exec: E, store_id: &str) -> DbResult<Option<StoreSettings>>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!("SELECT {SETTINGS_COLUMNS} FROM store_settings WHERE store_id = ?1");

    let settings = sqlx::query_as::<_, StoreSettings>(&sql)
        .bind(store_id)
        .fetch_optional(exec)
        .await?;

    Ok(settings)
}

/// Reserves the next bill sequence number of a store.
///
/// Returns the store's settings together with the reserved sequence, or
/// `None` when the store has no settings row.
pub async fn reserve_invoice_number<'e, E>(
    exec: E,
    store_id: &str,
    now: DateTime<Utc>,
) -> DbResult<Option<(StoreSettings, i64)>>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!(
        "UPDATE store_settings
         SET next_invoice_number = next_invoice_number + 1, updated_at = ?2
         WHERE store_id = ?1
         RETURNING {SETTINGS_COLUMNS}"
    );

    let settings = sqlx::query_as::<_, StoreSettings>(&sql)
        .bind(store_id)
        .bind(now)
        .fetch_optional(exec)
        .await?;

    Ok(settings.map(|s| {
        let sequence = s.next_invoice_number - 1;
        debug!(store_id = %store_id, sequence = sequence, "Reserved bill number");
        (s, sequence)
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use kirana_core::{RoundingMode, TaxMode};

    #[tokio::test]
    async fn test_upsert_and_get() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.settings();

        let mut settings = StoreSettings::new("store-1", "Sharma Mart");
        settings.invoice_prefix = "SM".to_string();
        settings.invoice_suffix = Some("BLR".to_string());
        settings.tax_mode = TaxMode::Inclusive;
        settings.rounding = RoundingMode::NearestPaisa;
        settings.loyalty_earn_bps = Some(100);
        repo.upsert(&settings).await.unwrap();

        let loaded = repo.get("store-1").await.unwrap().unwrap();
        assert_eq!(loaded.invoice_prefix, "SM");
        assert_eq!(loaded.tax_mode, TaxMode::Inclusive);
        assert_eq!(loaded.rounding, RoundingMode::NearestPaisa);
        assert_eq!(loaded.loyalty_earn_bps, Some(100));
        assert!(repo.get("store-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reserve_is_monotonic() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.settings()
            .upsert(&StoreSettings::new("store-1", "Sharma Mart"))
            .await
            .unwrap();

        let now = Utc::now();
        let (_, first) = reserve_invoice_number(db.pool(), "store-1", now).await.unwrap().unwrap();
        let (settings, second) =
            reserve_invoice_number(db.pool(), "store-1", now).await.unwrap().unwrap();

        assert_eq!(first, 1);
        assert_eq!(second, 2);
        assert_eq!(settings.next_invoice_number, 3);
        assert!(reserve_invoice_number(db.pool(), "nope", now).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_never_rewinds_counter() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let settings = StoreSettings::new("store-1", "Sharma Mart");
        db.settings().upsert(&settings).await.unwrap();
        reserve_invoice_number(db.pool(), "store-1", Utc::now()).await.unwrap();

        // Saving the stale copy (counter 1) keeps the live counter at 2
        db.settings().upsert(&settings).await.unwrap();
        let loaded = db.settings().get("store-1").await.unwrap().unwrap();
        assert_eq!(loaded.next_invoice_number, 2);
    }
}
