//! Bulk-load products into the catalog from a JSON file.
//!
//! Usage:
//!   seed-products --file products.json [--database-path product_api.db]
//!
//! The file holds an array of `{ "name", "description", "price" }` objects.
//! All rows are inserted in one transaction, in file order.

use anyhow::{bail, Context, Result};
use clap::Parser;
use product_api::{catalog::NewProduct, catalog::ProductStore, config::load_env, Database};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "seed-products")]
#[command(about = "Load products from a JSON file into the product catalog")]
struct Args {
    /// SQLite database file
    #[arg(long, env = "DATABASE_PATH", default_value = "product_api.db")]
    database_path: String,

    /// JSON array of products
    #[arg(long)]
    file: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    load_env();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "seed_products=info,product_api=info".into()),
        )
        .init();

    let args = Args::parse();

    let raw = std::fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let products = parse_products(&raw)?;

    let db = Database::open(&args.database_path)
        .with_context(|| format!("Failed to open database at {}", args.database_path))?;
    let store = ProductStore::new(db);

    let inserted = store.insert_many(&products).await?;
    let total = store.count().await?;

    info!(
        "Seeded {} products from {} ({} in catalog)",
        inserted,
        args.file.display(),
        total
    );

    Ok(())
}

fn parse_products(raw: &str) -> Result<Vec<NewProduct>> {
    let products: Vec<NewProduct> =
        serde_json::from_str(raw).context("Expected a JSON array of products")?;

    for (i, product) in products.iter().enumerate() {
        if let Err(reason) = product.validate() {
            bail!("Entry {}: {}", i, reason);
        }
    }

    Ok(products)
}
