//! # Repository Module
//!
//! Database repository implementations for Kirana POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Two Ways In                                          │
//! │                                                                         │
//! │  Service code                          Bill writer (checkout.rs)        │
//! │       │                                     │                           │
//! │       │  db.products().get_by_id(..)        │  product::fetch_sellable( │
//! │       ▼                                     ▼      &mut *tx, ..)        │
//! │  ProductRepository ── &self.pool ──► free functions generic over        │
//! │                                      E: SqliteExecutor                  │
//! │                                             │                           │
//! │                                             ▼                           │
//! │                                      SQLite Database                    │
//! │                                                                         │
//! │  The repository structs serve one-off reads and writes on the pool.    │
//! │  The free functions take any executor so the same SQL runs inside      │
//! │  the checkout transaction.                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Catalogue lookups and stock
//! - [`CustomerRepository`](customer::CustomerRepository) - Customers and loyalty balance
//! - [`BillRepository`](bill::BillRepository) - Bill headers, items, payments
//! - [`HeldBillRepository`](held_bill::HeldBillRepository) - Parked carts
//! - [`SettingsRepository`](settings::SettingsRepository) - Store settings and numbering
//! - [`LoyaltyRepository`](loyalty::LoyaltyRepository) - Loyalty ledger

pub mod bill;
pub mod customer;
pub mod held_bill;
pub mod loyalty;
pub mod product;
pub mod settings;

/// Generates a new UUID v4 string for primary keys and public ids.
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
