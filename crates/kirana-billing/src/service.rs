//! # Billing Service
//!
//! The single entry point a counter (desktop shell, HTTP adapter, CLI) talks
//! to. Every method returns [`ApiResult`], so callers only ever see
//! [`ApiError`] codes.
//!
//! ## Operations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Checkout        create_bill, preview_bill                              │
//! │  Held bills      hold_bill, list_held_bills, resume_held_bill,          │
//! │                  delete_held_bill                                       │
//! │  Bills           get_bill, list_bills, cancel_bill                      │
//! │  Public          get_bill_by_public_id  (receipt links, no internal ids)│
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Holding a bill never touches stock or loyalty; both are materialised only
//! when the resumed cart is checked out.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use kirana_core::validation::{validate_notes, validate_optional_text, validate_uuid};
use kirana_core::{
    Bill, BillWithItems, CartRequest, CoreError, HeldBill, HeldCart, HoldRequest,
    DEFAULT_HOLD_EXPIRY_HOURS,
};
use kirana_db::repository::generate_id;
use kirana_db::{BillFilter, BillQuote, CheckoutContext, Database, DbError};

use crate::config::BillingConfig;
use crate::error::{ApiError, ApiResult};
use crate::receipt::PublicReceipt;

/// Checkout engine facade.
#[derive(Debug, Clone)]
pub struct BillingService {
    db: Database,
}

impl BillingService {
    /// Wraps an open database.
    pub fn new(db: Database) -> Self {
        BillingService { db }
    }

    /// Opens the database described by `config` and runs migrations.
    pub async fn connect(config: &BillingConfig) -> ApiResult<Self> {
        let db = Database::new(config.db_config()).await?;
        info!(path = %config.database_path.display(), "Billing service ready");
        Ok(BillingService::new(db))
    }

    /// The underlying database, for catalogue and customer collaborators.
    pub fn database(&self) -> &Database {
        &self.db
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    /// Creates a completed bill. All or nothing.
    pub async fn create_bill(
        &self,
        ctx: &CheckoutContext,
        cart: &CartRequest,
    ) -> ApiResult<BillWithItems> {
        Ok(self.db.checkout().create_bill(ctx, cart).await?)
    }

    /// Prices a cart exactly as checkout would, without writing anything.
    pub async fn preview_bill(
        &self,
        ctx: &CheckoutContext,
        cart: &CartRequest,
    ) -> ApiResult<BillQuote> {
        Ok(self.db.checkout().preview(ctx, cart).await?)
    }

    // =========================================================================
    // Held Bills
    // =========================================================================

    /// Parks a cart for later. Stock and loyalty are untouched.
    pub async fn hold_bill(&self, ctx: &CheckoutContext, request: HoldRequest) -> ApiResult<HeldBill> {
        request.cart.validate().map_err(CoreError::from)?;
        validate_notes(request.notes.as_deref()).map_err(CoreError::from)?;
        validate_optional_text("customer_name", request.customer_name.as_deref(), 200)
            .map_err(CoreError::from)?;

        let expiry = self
            .db
            .settings()
            .get(&ctx.store_id)
            .await?
            .map(|settings| settings.hold_expiry())
            .unwrap_or_else(|| Duration::hours(DEFAULT_HOLD_EXPIRY_HOURS));

        let HoldRequest {
            cart,
            customer_name,
            notes,
        } = request;

        let now = Utc::now();
        let held = HeldBill {
            id: generate_id(),
            store_id: ctx.store_id.clone(),
            cashier_id: ctx.cashier_id.clone(),
            customer_name: customer_name.or_else(|| cart.customer_name.clone()),
            notes,
            subtotal_paise: cart.subtotal().paise(),
            item_count: cart.item_count(),
            cart,
            held_at: now,
            expires_at: now + expiry,
            resumed_at: None,
        };

        self.db.held_bills().insert(&held).await?;

        info!(
            id = %held.id,
            items = held.item_count,
            subtotal = held.subtotal_paise,
            "Bill held"
        );

        Ok(held)
    }

    /// Holds that are neither resumed nor expired, newest first.
    pub async fn list_held_bills(&self, store_id: &str) -> ApiResult<Vec<HeldBill>> {
        self.list_held_bills_at(store_id, Utc::now()).await
    }

    /// [`list_held_bills`](Self::list_held_bills) as of `now`.
    pub async fn list_held_bills_at(
        &self,
        store_id: &str,
        now: DateTime<Utc>,
    ) -> ApiResult<Vec<HeldBill>> {
        Ok(self.db.held_bills().list_active(store_id, now).await?)
    }

    /// Marks a hold resumed and hands its cart back for re-entry.
    ///
    /// This does not create a bill. An expired hold can still be resumed by
    /// id; expiry only hides it from the active list.
    ///
    /// ## Returns
    /// * `Err(NOT_FOUND)` - No such hold
    /// * `Err(BUSINESS_RULE)` - The hold was already resumed
    pub async fn resume_held_bill(&self, store_id: &str, id: &str) -> ApiResult<HeldCart> {
        self.resume_held_bill_at(store_id, id, Utc::now()).await
    }

    /// [`resume_held_bill`](Self::resume_held_bill) as of `now`.
    pub async fn resume_held_bill_at(
        &self,
        store_id: &str,
        id: &str,
        now: DateTime<Utc>,
    ) -> ApiResult<HeldCart> {
        let repo = self.db.held_bills();

        let held = repo
            .get(store_id, id)
            .await?
            .ok_or_else(|| CoreError::HeldBillNotFound(id.to_string()))?;

        if held.resumed_at.is_some() || !repo.mark_resumed(store_id, id, now).await? {
            return Err(CoreError::HeldBillAlreadyResumed(id.to_string()).into());
        }

        if held.is_expired(now) {
            debug!(id = %id, expired_at = %held.expires_at, "Resuming a stale hold");
        }

        info!(id = %id, items = held.item_count, "Held bill resumed");

        Ok(held.cart)
    }

    /// Deletes a hold permanently.
    pub async fn delete_held_bill(&self, store_id: &str, id: &str) -> ApiResult<()> {
        match self.db.held_bills().delete(store_id, id).await {
            Ok(()) => {
                info!(id = %id, "Held bill deleted");
                Ok(())
            }
            Err(DbError::NotFound { .. }) => Err(CoreError::HeldBillNotFound(id.to_string()).into()),
            Err(e) => Err(e.into()),
        }
    }

    // =========================================================================
    // Bills
    // =========================================================================

    /// A bill with items and payments (internal use).
    pub async fn get_bill(&self, store_id: &str, id: &str) -> ApiResult<BillWithItems> {
        self.db
            .bills()
            .get_by_id(store_id, id)
            .await?
            .ok_or_else(|| CoreError::BillNotFound(id.to_string()).into())
    }

    /// Bill headers, newest first.
    pub async fn list_bills(&self, store_id: &str, filter: &BillFilter) -> ApiResult<Vec<Bill>> {
        Ok(self.db.bills().list(store_id, filter).await?)
    }

    /// Cancels a completed bill.
    ///
    /// `restock` overrides the store's `restock_on_cancel` default.
    pub async fn cancel_bill(
        &self,
        ctx: &CheckoutContext,
        bill_id: &str,
        reason: &str,
        restock: Option<bool>,
    ) -> ApiResult<BillWithItems> {
        Ok(self
            .db
            .checkout()
            .cancel_bill(&ctx.store_id, bill_id, &ctx.cashier_id, reason, restock)
            .await?)
    }

    // =========================================================================
    // Public Receipts
    // =========================================================================

    /// The customer-facing receipt behind a shareable link.
    ///
    /// A malformed public id is reported as not found, the same as an unknown
    /// one.
    pub async fn get_bill_by_public_id(&self, public_id: &str) -> ApiResult<PublicReceipt> {
        if validate_uuid(public_id).is_err() {
            return Err(ApiError::not_found("Bill", public_id));
        }

        let full = self
            .db
            .bills()
            .get_by_public_id(public_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Bill", public_id))?;

        let settings = self.db.settings().get(&full.bill.store_id).await?;

        Ok(PublicReceipt::new(&full, settings.as_ref()))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
