//! # Seed Data Generator
//!
//! Populates a store with categories and items for development.
//!
//! ## Usage
//! ```bash
//! # 5 categories with 8 items each (default), in the configured store
//! cargo run -p todoey-db --bin seed
//!
//! # Custom amounts and path
//! cargo run -p todoey-db --bin seed -- --categories 20 --items 50 --db ./todoey_dev.db
//!
//! # Load a JSON fixture instead of generated data
//! cargo run -p todoey-db --bin seed -- --fixture fixtures/home.json
//! ```
//!
//! ## Fixture Format
//! ```json
//! {
//!   "categories": [
//!     { "name": "Home", "colour_tag": "#1ABC9C",
//!       "items": [ { "title": "Buy Eggos", "done": false } ] }
//!   ]
//! }
//! ```
//!
//! Each category is written in its own transaction, so a partly seeded
//! store never holds a category without its items.

use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use todoey_db::{DbConfig, EntityStore, StoreConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Category names for generated data
const CATEGORY_NAMES: &[&str] = &[
    "Home", "Work", "Groceries", "Errands", "Garden", "Travel", "Reading", "Fitness",
];

/// Item titles for generated data
const ITEM_TITLES: &[&str] = &[
    "Buy Eggos",
    "Find Mike",
    "Destroy Demogorgon",
    "Call the plumber",
    "Water the café plants",
    "Renew passport",
    "Pick up dry cleaning",
    "Book dentist",
    "Return library books",
    "Fix the bike tyre",
];

/// Flat UI palette used for generated colour tags
const FLAT_COLOURS: &[&str] = &[
    "#1ABC9C", "#2ECC71", "#3498DB", "#9B59B6", "#34495E", "#F1C40F", "#E67E22", "#E74C3C",
];

#[derive(Debug, Deserialize)]
struct Fixture {
    categories: Vec<FixtureCategory>,
}

#[derive(Debug, Deserialize)]
struct FixtureCategory {
    name: String,
    #[serde(default)]
    colour_tag: String,
    #[serde(default)]
    items: Vec<FixtureItem>,
}

#[derive(Debug, Deserialize)]
struct FixtureItem {
    title: String,
    #[serde(default)]
    done: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,todoey=debug,sqlx=warn")),
        )
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut categories: usize = 5;
    let mut items: usize = 8;
    let mut db_path: Option<PathBuf> = None;
    let mut fixture_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--categories" | "-c" => {
                if i + 1 < args.len() {
                    categories = args[i + 1].parse().unwrap_or(5);
                    i += 1;
                }
            }
            "--items" | "-n" => {
                if i + 1 < args.len() {
                    items = args[i + 1].parse().unwrap_or(8);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--fixture" | "-f" => {
                if i + 1 < args.len() {
                    fixture_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Todoey Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --categories <N>  Categories to generate (default: 5)");
                println!("  -n, --items <N>       Items per category (default: 8)");
                println!("  -d, --db <PATH>       Database file path (default: configured store)");
                println!("  -f, --fixture <FILE>  Load categories and items from a JSON file");
                println!("  -h, --help            Show this help message");
                return Ok(());
            }
            other => warn!(argument = other, "Ignoring unknown argument"),
        }
        i += 1;
    }

    let config = match db_path {
        Some(path) => DbConfig::new(path),
        None => StoreConfig::load_or_default(None).to_db_config()?,
    };
    info!(path = %config.database_path.display(), "Opening store");
    let store = EntityStore::open(config).await?;

    let existing = store.database().categories().count().await?;
    if existing > 0 {
        warn!(existing, "Store already has categories, skipping seed to avoid duplicates");
        return Ok(());
    }

    let fixture = match fixture_path {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => generate(categories, items),
    };

    let start = std::time::Instant::now();
    let mut item_count = 0usize;

    for category in &fixture.categories {
        let mut txn = store.begin_write().await?;
        let id = txn.create_category(&category.name, &category.colour_tag).await?;
        for item in &category.items {
            let item_id = txn.create_item(&id, &item.title).await?;
            if item.done {
                txn.set_done(&item_id, true).await?;
            }
        }
        store.commit(txn).await?;
        item_count += category.items.len();
    }

    info!(
        categories = fixture.categories.len(),
        items = item_count,
        elapsed = ?start.elapsed(),
        revision = store.revision().await?,
        "Seed complete"
    );

    store.database().close().await;
    Ok(())
}

/// Builds `categories` categories of `items` items each.
fn generate(categories: usize, items: usize) -> Fixture {
    let categories = (0..categories)
        .map(|c| {
            let base = CATEGORY_NAMES[c % CATEGORY_NAMES.len()];
            let name = if c < CATEGORY_NAMES.len() {
                base.to_string()
            } else {
                format!("{} {}", base, c / CATEGORY_NAMES.len() + 1)
            };

            FixtureCategory {
                name,
                colour_tag: FLAT_COLOURS[c % FLAT_COLOURS.len()].to_string(),
                items: (0..items)
                    .map(|n| FixtureItem {
                        title: ITEM_TITLES[(c + n) % ITEM_TITLES.len()].to_string(),
                        done: n % 3 == 0,
                    })
                    .collect(),
            }
        })
        .collect();

    Fixture { categories }
}
