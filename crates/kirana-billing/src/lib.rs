//! # Kirana Billing
//!
//! Caller-facing checkout service for Kirana POS.
//!
//! ## Layering
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │   Counter UI / HTTP adapter / CLI                                       │
//! │                 │                                                       │
//! │                 ▼                                                       │
//! │   kirana-billing ── BillingService, ApiError, BillingConfig            │
//! │                 │                                                       │
//! │                 ▼                                                       │
//! │   kirana-db ─────── BillWriter (one transaction per bill), repositories │
//! │                 │                                                       │
//! │                 ▼                                                       │
//! │   kirana-core ───── GST calculator, stock guard, aggregator, types      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Startup
//! ```rust,no_run
//! use kirana_billing::{init_tracing, BillingConfig, BillingService};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! init_tracing();
//! let config = BillingConfig::from_env()?;
//! let service = BillingService::connect(&config).await?;
//! let _held = service.list_held_bills(&config.store_id).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod receipt;
pub mod service;

pub use config::{BillingConfig, ConfigError};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use receipt::{PublicReceipt, ReceiptLine, ReceiptPayment};
pub use service::BillingService;

pub use kirana_db::{BillFilter, BillQuote, CheckoutContext};

use tracing_subscriber::EnvFilter;

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=kirana_db=trace` - Trace repository calls
/// - Default: `info,kirana=debug,sqlx=warn`
///
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,kirana=debug,sqlx=warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init();
}
