//! # Seed Data Generator
//!
//! Populates a store database with sample products for development, then
//! places one order through [`OrderProcessor`](store_db::OrderProcessor) as a
//! smoke test.
//!
//! ## Usage
//! ```bash
//! # Generate 150 products (default)
//! cargo run -p store-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p store-db --bin seed -- --count 192
//!
//! # Specify database path
//! cargo run -p store-db --bin seed -- --db ./data/store.db
//!
//! # More logging
//! RUST_LOG=debug cargo run -p store-db --bin seed
//! ```
//!
//! ## Generated Products
//! One product per category name and size variant (192 at most); larger
//! `--count` values are capped with a warning.
//! - Unique SKU: `{CATEGORY}-{ABBR}-{SEED}`
//! - Name: `{product} {size}`
//! - Price: $1.99 - $9.99 plus a size addon
//! - Stock: 0 - 100

use std::env;

use store_core::{OrderRequestItem, Product};
use store_db::{Database, DbConfig, ProcessorConfig};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Product categories for realistic test data
const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "BEV",
        &[
            "Cola",
            "Lemon Soda",
            "Sparkling Water",
            "Orange Juice",
            "Apple Juice",
            "Iced Tea",
            "Cold Brew",
            "Energy Drink",
        ],
    ),
    (
        "SNK",
        &[
            "Potato Chips",
            "Tortilla Chips",
            "Pretzels",
            "Trail Mix",
            "Chocolate Bar",
            "Gummy Bears",
            "Oat Cookies",
            "Popcorn",
        ],
    ),
    (
        "DRY",
        &[
            "Whole Milk",
            "Oat Milk",
            "Cheddar",
            "Mozzarella",
            "Butter",
            "Greek Yogurt",
            "Cream Cheese",
            "Eggs",
        ],
    ),
    (
        "GRO",
        &[
            "White Bread",
            "Spaghetti",
            "Brown Rice",
            "Canned Beans",
            "Tomato Soup",
            "Peanut Butter",
            "Honey",
            "Flour",
        ],
    ),
];

/// Size variants and their price addon in cents
const SIZES: &[(&str, i64)] = &[
    ("Small", 0),
    ("Medium", 100),
    ("Large", 200),
    ("Family", 350),
    ("6-Pack", 300),
    ("12-Pack", 500),
];

const DEFAULT_COUNT: usize = 150;
const DEFAULT_DB_PATH: &str = "./store_dev.db";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,store=debug,sqlx=warn")),
        )
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut count = DEFAULT_COUNT;
    let mut db_path = env::var("STORE_DB_PATH").unwrap_or_else(|_| DEFAULT_DB_PATH.to_string());

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if let Some(raw) = args.get(i + 1) {
                    count = raw.parse().unwrap_or_else(|_| {
                        warn!(value = %raw, "Invalid --count, using default");
                        DEFAULT_COUNT
                    });
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if let Some(path) = args.get(i + 1) {
                    db_path = path.clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Store Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to generate (default: {DEFAULT_COUNT})");
                println!("  -d, --db <PATH>    Database file path (default: {DEFAULT_DB_PATH})");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            other => warn!(arg = %other, "Ignoring unknown argument"),
        }
        i += 1;
    }

    let capacity = catalog_capacity();
    if count > capacity {
        warn!(requested = count, capacity, "Requested more products than the catalog has; capping");
        count = capacity;
    }

    info!(db = %db_path, count, "Seeding store database");

    let db = Database::new(DbConfig::new(&db_path)).await?;

    let existing = db.products().count().await?;
    if existing > 0 {
        warn!(
            existing,
            "Database already has products; skipping seed. Delete the file to regenerate."
        );
        return Ok(());
    }

    let start = std::time::Instant::now();
    let mut generated = 0;

    'outer: for (category_idx, (category_code, names)) in CATEGORIES.iter().enumerate() {
        for (product_idx, name) in names.iter().enumerate() {
            for (size_idx, (size_name, price_addon)) in SIZES.iter().enumerate() {
                if generated >= count {
                    break 'outer;
                }

                let product = generate_product(
                    category_code,
                    name,
                    size_name,
                    *price_addon,
                    category_idx * 1000 + product_idx * 20 + size_idx,
                );

                if let Err(e) = db.products().insert(&product).await {
                    error!(sku = %product.sku, error = %e, "Failed to insert product");
                    continue;
                }

                generated += 1;
                if generated % 100 == 0 {
                    info!(generated, "Seeding progress");
                }
            }
        }
    }

    let elapsed = start.elapsed();
    info!(
        generated,
        elapsed_ms = elapsed.as_millis() as u64,
        "Products generated"
    );

    // Smoke test: one unit of the first two products that have stock
    let in_stock: Vec<Product> = db
        .products()
        .list(50)
        .await?
        .into_iter()
        .filter(|p| p.stock > 0)
        .take(2)
        .collect();

    if in_stock.is_empty() {
        warn!("No product in stock; skipping sample order");
    } else {
        let request: Vec<OrderRequestItem> = in_stock
            .iter()
            .map(|p| OrderRequestItem::one(p.id.clone()))
            .collect();

        match db
            .order_processor(ProcessorConfig::from_env())
            .process_order(&request)
            .await
        {
            Ok(order) => info!(order_id = %order.id, total = %order.total(), "Sample order placed"),
            Err(e) => {
                let detail = e.field_error();
                error!(field = %detail.field, message = %detail.message, "Sample order failed");
            }
        }
    }

    db.close().await;
    info!("Seed complete");
    Ok(())
}

/// Number of distinct products the name and size tables can produce.
fn catalog_capacity() -> usize {
    CATEGORIES.iter().map(|(_, names)| names.len()).sum::<usize>() * SIZES.len()
}

/// Generates a single product with deterministic data.
fn generate_product(
    category: &str,
    name: &str,
    size: &str,
    price_addon: i64,
    seed: usize,
) -> Product {
    let abbr: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(3)
        .collect::<String>()
        .to_uppercase();
    let sku = format!("{}-{}-{:04}", category, abbr, seed);

    // Base $1.99 - $9.99 plus size addon
    let price_cents = 199 + ((seed * 17) % 800) as i64 + price_addon;

    let stock = (seed % 101) as i64;

    Product::new(sku, format!("{} {}", name, size), price_cents, stock)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_default_count_fits_catalog() {
        assert_eq!(catalog_capacity(), 192);
        assert!(DEFAULT_COUNT <= catalog_capacity());
    }

    #[test]
    fn test_generated_skus_are_unique() {
        let mut skus = HashSet::new();
        for (category_idx, (code, names)) in CATEGORIES.iter().enumerate() {
            for (product_idx, name) in names.iter().enumerate() {
                for (size_idx, (size, addon)) in SIZES.iter().enumerate() {
                    let seed = category_idx * 1000 + product_idx * 20 + size_idx;
                    let product = generate_product(code, name, size, *addon, seed);
                    assert!(product.price_cents >= 199);
                    assert!((0..=100).contains(&product.stock));
                    assert!(skus.insert(product.sku));
                }
            }
        }
        assert_eq!(skus.len(), catalog_capacity());
    }
}
