//! # Seed Data Generator
//!
//! Populates a demo store for development: settings, a kirana catalogue
//! across every GST slab, and a few loyalty customers.
//!
//! ## Usage
//! ```bash
//! # Seed the default demo store (200 products)
//! cargo run -p kirana-db --bin seed
//!
//! # Generate a custom amount
//! cargo run -p kirana-db --bin seed -- --count 1000
//!
//! # Specify database path
//! cargo run -p kirana-db --bin seed -- --db ./data/kirana.db
//! ```
//!
//! ## Generated Data
//! - Store settings: bill numbers `SM-000001-BLR`, nearest-rupee rounding,
//!   1 loyalty point per ₹100
//! - Products: SKU `{CATEGORY}-{CODE}-{INDEX}`, HSN code per category,
//!   price ₹10 - ₹850, stock 0 - 120
//! - Customers: three regulars with a loyalty balance

use chrono::Utc;
use std::env;

use kirana_core::validation::{
    validate_gst_rate, validate_hsn_code, validate_product_name, validate_sku,
};
use kirana_core::{Customer, Product, StoreSettings, TaxRate, DEFAULT_STORE_ID};
use kirana_db::{Database, DbConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Categories with their HSN heading and GST slab (bps).
const CATEGORIES: &[(&str, &str, u32, &[&str])] = &[
    (
        "STP",
        "1006",
        0,
        &[
            "Sona Masoori Rice",
            "Basmati Rice",
            "Toor Dal",
            "Moong Dal",
            "Chana Dal",
            "Whole Wheat Atta",
            "Besan",
            "Fresh Milk",
            "Curd",
            "Eggs",
        ],
    ),
    (
        "PKG",
        "1905",
        500,
        &[
            "Sugar",
            "Tea Leaves",
            "Filter Coffee",
            "Sunflower Oil",
            "Mustard Oil",
            "Groundnut Oil",
            "Rusk",
            "Poha",
            "Rava",
            "Jaggery",
        ],
    ),
    (
        "DRY",
        "0401",
        1200,
        &[
            "Ghee",
            "Butter",
            "Paneer",
            "Cheese Slices",
            "Almonds",
            "Cashews",
            "Raisins",
            "Fruit Jam",
            "Pickle",
            "Namkeen",
        ],
    ),
    (
        "HPC",
        "3401",
        1800,
        &[
            "Bath Soap",
            "Detergent Powder",
            "Dishwash Bar",
            "Toothpaste",
            "Shampoo",
            "Hair Oil",
            "Floor Cleaner",
            "Biscuits",
            "Instant Noodles",
            "Tomato Ketchup",
        ],
    ),
    (
        "LUX",
        "2202",
        2800,
        &[
            "Cola",
            "Orange Soda",
            "Energy Drink",
            "Chocolate Bar",
            "Perfume Deo",
            "Aerated Lemon",
            "Wafer Chocolate",
            "Soda Water",
            "Ice Cream Tub",
            "Pan Masala",
        ],
    ),
];

/// Pack sizes with a price multiplier (percent of the base price).
const SIZES: &[(&str, i64)] = &[
    ("200g", 40),
    ("500g", 100),
    ("1kg", 190),
    ("2kg", 360),
    ("5kg", 850),
];

/// Demo customers: name, phone, loyalty balance.
const CUSTOMERS: &[(&str, &str, i64)] = &[
    ("Priya Sharma", "9845012345", 120),
    ("Ravi Kumar", "9900112233", 40),
    ("Anjali Rao", "9742233445", 0),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")),
        )
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 200;
    let mut db_path = String::from("./kirana_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(200);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Kirana POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to generate (default: 200)");
                println!("  -d, --db <PATH>    Database file path (default: ./kirana_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    info!(db = %db_path, products = count, "Seeding demo store");

    let db = Database::new(DbConfig::new(&db_path)).await?;
    info!("Connected, migrations applied");

    // Store settings
    let mut settings = StoreSettings::new(DEFAULT_STORE_ID, "Sharma Mart");
    settings.invoice_prefix = "SM".to_string();
    settings.invoice_suffix = Some("BLR".to_string());
    settings.loyalty_earn_bps = Some(100);
    db.settings().upsert(&settings).await?;
    info!(first_bill = %settings.format_bill_number(1), "Store settings saved");

    let existing = db.products().count(DEFAULT_STORE_ID).await?;
    if existing > 0 {
        warn!(
            existing,
            "Catalogue already seeded, skipping. Delete the database file to regenerate."
        );
        return Ok(());
    }

    info!("Generating products");

    let mut generated = 0;
    let mut rejected = 0;
    let start = std::time::Instant::now();

    'outer: for (category_idx, (code, hsn, gst_bps, names)) in CATEGORIES.iter().enumerate() {
        for (name_idx, name) in names.iter().enumerate() {
            for (size_idx, (size, multiplier)) in SIZES.iter().enumerate() {
                if generated >= count {
                    break 'outer;
                }

                let seed = category_idx * 1000 + name_idx * 10 + size_idx;
                let product = generate_product(code, hsn, *gst_bps, name, size, *multiplier, seed);

                if let Err(e) = check_product(&product) {
                    warn!(sku = %product.sku, error = %e, "Skipping invalid product");
                    rejected += 1;
                    continue;
                }

                if let Err(e) = db.products().insert(&product).await {
                    warn!(sku = %product.sku, error = %e, "Failed to insert product");
                    continue;
                }

                generated += 1;

                if generated % 50 == 0 {
                    info!(generated, "Products generated so far");
                }
            }
        }
    }

    info!(
        generated,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Catalogue generated"
    );
    if rejected > 0 {
        warn!(rejected, "Products failed validation");
    }

    // Customers
    for (name, phone, points) in CUSTOMERS {
        let now = Utc::now();
        let customer = Customer {
            id: Uuid::new_v4().to_string(),
            store_id: DEFAULT_STORE_ID.to_string(),
            name: name.to_string(),
            phone: Some(phone.to_string()),
            email: None,
            loyalty_points: *points,
            total_purchase_paise: 0,
            visit_count: 0,
            created_at: now,
            updated_at: now,
        };

        match db.customers().insert(&customer).await {
            Ok(_) => info!(name = %name, phone = %phone, points, "Customer added"),
            Err(e) => warn!(name = %name, error = %e, "Failed to insert customer"),
        }
    }

    let low_stock = db
        .products()
        .list_active(DEFAULT_STORE_ID, u32::MAX)
        .await?
        .into_iter()
        .filter(Product::is_low_stock)
        .count();

    info!(low_stock, "Seed complete");

    Ok(())
}

/// Applies the catalogue rules a product form would enforce.
fn check_product(product: &Product) -> Result<(), kirana_core::ValidationError> {
    validate_sku(&product.sku)?;
    validate_product_name(&product.name)?;
    if let Some(hsn) = &product.hsn_code {
        validate_hsn_code(hsn)?;
    }
    validate_gst_rate(TaxRate::from_bps(product.gst_rate_bps))
}

/// Generates a single product with realistic data.
fn generate_product(
    category: &str,
    hsn: &str,
    gst_rate_bps: u32,
    name: &str,
    size: &str,
    multiplier: i64,
    seed: usize,
) -> Product {
    let now = Utc::now();

    let code: String = name
        .split_whitespace()
        .filter_map(|word| word.chars().next())
        .collect::<String>()
        .to_uppercase();
    let sku = format!("{}-{}-{:04}", category, code, seed);

    // Base ₹25 - ₹100, scaled by pack size
    let base_paise = 2500 + ((seed * 37) % 7500) as i64;
    let selling_price_paise = (base_paise * multiplier / 100).max(1000);
    let mrp_paise = selling_price_paise + selling_price_paise / 10;

    // Cost 70-85% of price
    let cost_pct = 70 + (seed % 16) as i64;

    Product {
        id: Uuid::new_v4().to_string(),
        store_id: DEFAULT_STORE_ID.to_string(),
        sku,
        name: format!("{} {}", name, size),
        hsn_code: Some(hsn.to_string()),
        unit: "PCS".to_string(),
        mrp_paise,
        purchase_price_paise: selling_price_paise * cost_pct / 100,
        selling_price_paise,
        gst_rate_bps,
        stock_quantity: (seed % 121) as i64,
        min_stock_level: 5,
        is_track_inventory: true,
        allow_negative_stock: false,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}
