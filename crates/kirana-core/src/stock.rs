//! # Stock Guard
//!
//! Read-only availability check for a requested quantity.
//!
//! ## Decision Table
//! ```text
//! ┌──────────────────────┬──────────────────────┬───────────────────────────┐
//! │ is_track_inventory   │ allow_negative_stock │ result                    │
//! ├──────────────────────┼──────────────────────┼───────────────────────────┤
//! │ false                │ (ignored)            │ pass (services, loose)    │
//! │ true                 │ true                 │ pass                      │
//! │ true                 │ false                │ pass iff stock ≥ quantity │
//! └──────────────────────┴──────────────────────┴───────────────────────────┘
//! ```
//!
//! The guard is advisory. The bill writer enforces the same rule again with
//! a conditional `UPDATE ... WHERE stock_quantity >= ?` inside the checkout
//! transaction, which is what actually closes the race between two counters
//! selling the last unit.

use std::collections::HashMap;

use crate::error::{CoreError, CoreResult};
use crate::types::Product;

/// Fails with [`CoreError::InsufficientStock`] when `product` cannot cover
/// `requested` units.
///
/// ## Example
/// ```rust,ignore
/// stock::ensure_available(&product, 5)?;
/// ```
pub fn ensure_available(product: &Product, requested: i64) -> CoreResult<()> {
    if product.can_sell(requested) {
        return Ok(());
    }

    Err(insufficient(product, requested))
}

/// Builds the stock error for a product, reporting its current level.
pub fn insufficient(product: &Product, requested: i64) -> CoreError {
    CoreError::InsufficientStock {
        product: product.name.clone(),
        sku: product.sku.clone(),
        available: product.stock_quantity.max(0),
        requested,
    }
}

/// Whether a sale of this product must decrement stock.
#[inline]
pub fn requires_decrement(product: &Product) -> bool {
    product.is_track_inventory
}

/// Sums requested quantities per product id, preserving first-seen order.
///
/// A cart may list the same product on two lines; availability has to be
/// judged on the combined quantity.
pub fn requested_by_product<'a, I>(lines: I) -> Vec<(&'a str, i64)>
where
    I: IntoIterator<Item = (&'a str, i64)>,
{
    let mut order: Vec<(&'a str, i64)> = Vec::new();
    let mut index: HashMap<&'a str, usize> = HashMap::new();

    for (product_id, quantity) in lines {
        match index.get(product_id) {
            Some(&i) => order[i].1 += quantity,
            None => {
                index.insert(product_id, order.len());
                order.push((product_id, quantity));
            }
        }
    }

    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn product(stock: i64, track: bool, allow_negative: bool) -> Product {
        let now = Utc::now();
        Product {
            id: "p-sugar".to_string(),
            store_id: crate::DEFAULT_STORE_ID.to_string(),
            sku: "SUGAR-1KG".to_string(),
            name: "Sugar 1kg".to_string(),
            hsn_code: Some("1701".to_string()),
            unit: "PCS".to_string(),
            mrp_paise: 5000,
            purchase_price_paise: 4000,
            selling_price_paise: 4800,
            gst_rate_bps: 500,
            stock_quantity: stock,
            min_stock_level: 0,
            is_track_inventory: track,
            allow_negative_stock: allow_negative,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_tracked_product_with_enough_stock() {
        assert!(ensure_available(&product(5, true, false), 5).is_ok());
    }

    #[test]
    fn test_tracked_product_short_of_stock() {
        let err = ensure_available(&product(3, true, false), 5).unwrap_err();
        match err {
            CoreError::InsufficientStock {
                product,
                available,
                requested,
                ..
            } => {
                assert_eq!(product, "Sugar 1kg");
                assert_eq!(available, 3);
                assert_eq!(requested, 5);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_negative_stock_allowed() {
        assert!(ensure_available(&product(0, true, true), 12).is_ok());
        assert!(ensure_available(&product(-4, true, true), 1).is_ok());
    }

    #[test]
    fn test_untracked_product_is_exempt() {
        let service = product(0, false, false);
        assert!(ensure_available(&service, 1000).is_ok());
        assert!(!requires_decrement(&service));
    }

    #[test]
    fn test_requested_by_product_merges_duplicate_lines() {
        let merged = requested_by_product([("a", 2), ("b", 1), ("a", 3)]);
        assert_eq!(merged, vec![("a", 5), ("b", 1)]);
    }
}
