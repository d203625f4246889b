//! # Seed Data Generator
//!
//! Populates the database with catalog data for development.
//!
//! ## Usage
//! ```bash
//! # Generate 500 products (default)
//! cargo run -p storefront-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p storefront-db --bin seed -- --count 1000
//!
//! # Specify database path
//! cargo run -p storefront-db --bin seed -- --db ./data/storefront.db
//! ```
//!
//! ## Generated Catalog
//! Five categories (Electronics, Home & Kitchen, Clothing, Books,
//! Toys & Games) of base products crossed with variant suffixes. Prices,
//! stock and ratings are derived from the running index, so a reseeded
//! database is identical every time. Rows go in through the bulk insert
//! path, fifty per statement.

use std::env;

use tracing_subscriber::EnvFilter;

use storefront_core::{NewProduct, ProductFilter, StoreError};
use storefront_db::{Database, DbConfig};

/// Category name plus the base product titles seeded under it.
const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "Electronics",
        &[
            "Wireless Headphones",
            "Bluetooth Speaker",
            "Smart Watch",
            "USB-C Hub",
            "Mechanical Keyboard",
            "Gaming Mouse",
            "4K Monitor",
            "Webcam",
            "Phone Stand",
            "Power Bank",
            "E-Reader",
            "Fitness Tracker",
            "Action Camera",
            "Drone",
            "VR Headset",
            "Soundbar",
            "Smart Bulb",
            "Security Camera",
            "Router",
            "External SSD",
        ],
    ),
    (
        "Home & Kitchen",
        &[
            "Coffee Maker",
            "Air Fryer",
            "Blender",
            "Toaster",
            "Electric Kettle",
            "Cast Iron Skillet",
            "Knife Set",
            "Cutting Board",
            "Food Processor",
            "Stand Mixer",
            "Rice Cooker",
            "Slow Cooker",
            "Vacuum Flask",
            "Desk Lamp",
            "Floor Lamp",
            "Throw Blanket",
            "Scented Candle",
            "Wall Clock",
            "Storage Basket",
            "Plant Pot",
        ],
    ),
    (
        "Clothing",
        &[
            "Cotton T-Shirt",
            "Hoodie",
            "Denim Jacket",
            "Running Shoes",
            "Wool Socks",
            "Baseball Cap",
            "Rain Jacket",
            "Leather Belt",
            "Canvas Sneakers",
            "Beanie",
            "Flannel Shirt",
            "Chino Pants",
            "Puffer Vest",
            "Crewneck Sweater",
            "Cargo Shorts",
            "Ankle Boots",
            "Scarf",
            "Gloves",
            "Swim Trunks",
            "Track Pants",
        ],
    ),
    (
        "Books",
        &[
            "Mystery Novel",
            "Science Fiction Anthology",
            "Cookbook",
            "Travel Guide",
            "Biography",
            "Poetry Collection",
            "Graphic Novel",
            "History of Computing",
            "Chess Primer",
            "Gardening Handbook",
            "Photography Manual",
            "Picture Book",
            "Thriller",
            "Fantasy Epic",
            "Short Story Collection",
            "Atlas",
            "Dictionary",
            "Art Monograph",
            "Field Guide to Birds",
            "Writing Workbook",
        ],
    ),
    (
        "Toys & Games",
        &[
            "Building Blocks",
            "Jigsaw Puzzle",
            "Board Game",
            "Plush Bear",
            "RC Car",
            "Model Train",
            "Yo-Yo",
            "Kite",
            "Marble Run",
            "Card Game",
            "Dollhouse",
            "Science Kit",
            "Magic Set",
            "Wooden Train",
            "Action Figure",
            "Craft Kit",
            "Water Gun",
            "Foam Blaster",
            "Robot Kit",
            "Play Kitchen",
        ],
    ),
];

/// Variant suffixes with their price addon in cents.
const VARIANTS: &[(&str, i64)] = &[
    ("Classic", 0),
    ("Compact", 0),
    ("Standard", 0),
    ("Travel", 500),
    ("Eco", 300),
    ("Deluxe", 1500),
    ("Family", 2000),
    ("Pro", 2500),
    ("Max", 4000),
    ("Limited Edition", 6000),
];

/// Rows per bulk insert statement. Ten columns each keeps the statement
/// well under SQLite's bound-variable limit.
const CHUNK_SIZE: usize = 50;

/// Initializes logging for the seed run.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show per-statement repository logs
/// - Default: warnings only, so the progress output stays readable
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,storefront_db=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 500;
    let mut db_path = String::from("./storefront_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(500);
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
                println!("Storefront Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to generate (default: 500)");
                println!("  -d, --db <PATH>    Database file path (default: ./storefront_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Storefront Seed Data Generator");
    println!("=================================");
    println!("Database: {}", db_path);
    println!("Products: {}", count);
    println!();

    // Connect to database
    let config = DbConfig::new(&db_path);
    let db = Database::new(config).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    // Check existing products
    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Create the category tree first so products can reference it
    println!();
    println!("Creating categories...");
    let mut category_ids = Vec::with_capacity(CATEGORIES.len());
    for (name, _) in CATEGORIES {
        category_ids.push(ensure_category(&db, name).await?);
    }
    println!("✓ {} categories ready", category_ids.len());

    // Generate products
    println!();
    println!("Generating products...");

    let mut batch: Vec<NewProduct> = Vec::with_capacity(count);

    for (category_idx, (category_name, products)) in CATEGORIES.iter().enumerate() {
        for (product_idx, product_name) in products.iter().enumerate() {
            for (variant_idx, (variant_name, price_addon)) in VARIANTS.iter().enumerate() {
                if batch.len() >= count {
                    break;
                }

                batch.push(generate_product(
                    &category_ids[category_idx],
                    category_name,
                    product_name,
                    variant_name,
                    *price_addon,
                    category_idx * 1000 + product_idx * 20 + variant_idx,
                ));
            }

            if batch.len() >= count {
                break;
            }
        }

        if batch.len() >= count {
            break;
        }
    }

    let mut generated = 0;
    let start = std::time::Instant::now();

    for chunk in batch.chunks(CHUNK_SIZE) {
        let inserted = db.products().bulk_create(chunk.to_vec()).await?;
        generated += inserted.len();

        if generated % 500 == 0 {
            println!("  Generated {} products...", generated);
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!("✓ Generated {} products in {:?}", generated, elapsed);
    println!(
        "  Rate: {:.0} products/second",
        generated as f64 / elapsed.as_secs_f64()
    );

    // Verify the filtered query path against the fresh data
    println!();
    println!("Verifying filtered queries...");

    let search = db
        .products()
        .list_filtered(&ProductFilter {
            search: Some("deluxe".to_string()),
            ..Default::default()
        })
        .await?;
    println!("  Search 'deluxe': {} results (page 1)", search.len());

    let electronics = db
        .products()
        .list_filtered(&ProductFilter {
            category_id: Some(category_ids[0].clone()),
            ..Default::default()
        })
        .await?;
    println!("  Category 'Electronics': {} results (page 1)", electronics.len());

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Creates a category, or reuses it when a previous partial seed already
/// made one with that name.
async fn ensure_category(db: &Database, name: &str) -> Result<String, Box<dyn std::error::Error>> {
    match db.categories().create(name, None).await {
        Ok(category) => Ok(category.id),
        Err(StoreError::Conflict(_)) => {
            let existing = db
                .categories()
                .list()
                .await?
                .into_iter()
                .find(|c| c.name == name)
                .ok_or("category exists but is not listable")?;
            Ok(existing.id)
        }
        Err(e) => Err(e.into()),
    }
}

/// Generates a single product with deterministic pseudo-random data.
fn generate_product(
    category_id: &str,
    category_name: &str,
    name: &str,
    variant: &str,
    price_addon: i64,
    seed: usize,
) -> NewProduct {
    // Base price $4.99 - $149.99, plus the variant addon
    let base_price = 499 + ((seed * 37) % 14500) as i64;
    let price_cents = base_price + price_addon;

    // Roughly one in seven products is unrated
    let rating = if seed % 7 == 0 {
        None
    } else {
        Some(1.0 + ((seed % 41) as f64) / 10.0)
    };

    NewProduct {
        title: format!("{} {}", name, variant),
        description: format!(
            "{} {} from the {} collection.",
            name, variant, category_name
        ),
        price_cents,
        category_id: Some(category_id.to_string()),
        stock: (seed % 101) as i64,
        images: vec![
            format!("https://picsum.photos/seed/{}/640/480", seed),
            format!("https://picsum.photos/seed/{}/640/480", seed + 100_000),
        ],
        rating,
    }
}
