//! # kirana-db: Database Layer for Kirana POS
//!
//! SQLite storage for the checkout engine, via sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Kirana POS Data Flow                             │
//! │                                                                         │
//! │  BillingService::create_bill (kirana-billing)                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     kirana-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐   │   │
//! │  │   │   Database    │    │  BillWriter   │    │  Migrations  │   │   │
//! │  │   │   (pool.rs)   │    │ (checkout.rs) │    │  (embedded)  │   │   │
//! │  │   │               │    │  one tx per   │    │              │   │   │
//! │  │   │ SqlitePool    │◄───│  bill         │    │ 001_init.sql │   │   │
//! │  │   │ WAL + busy    │    ├───────────────┤    │              │   │   │
//! │  │   │ timeout       │◄───│ Repositories  │    │              │   │   │
//! │  │   └───────────────┘    │ product, bill │    └──────────────┘   │   │
//! │  │                        │ held, ...     │                       │   │
//! │  │                        └───────────────┘                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (kirana.db)                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (product, bill, held bill, ...)
//! - [`checkout`] - The transactional bill writer
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kirana_db::{CheckoutContext, Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("kirana.db")).await?;
//!
//! let ctx = CheckoutContext::new(store_id, cashier_id);
//! let bill = db.checkout().create_bill(&ctx, &cart).await?;
//! println!("{} {}", bill.bill.bill_number, bill.bill.grand_total());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod checkout;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use checkout::{
    BillQuote, BillWriter, CheckoutContext, CheckoutError, CheckoutResult, QuoteLine,
};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::bill::{BillFilter, BillRepository};
pub use repository::customer::CustomerRepository;
pub use repository::held_bill::HeldBillRepository;
pub use repository::loyalty::LoyaltyRepository;
pub use repository::product::ProductRepository;
pub use repository::settings::SettingsRepository;
