//! Seed the storefront database with the launch catalog.
//!
//! Every seeder is idempotent: existing rows are left alone (products are
//! upserted so price changes land), so these are safe to rerun.

use raze_core::catalog::seed_products;
use raze_core::inventory::{DEFAULT_LOW_STOCK_THRESHOLD, seed_stock};
use raze_core::promo::default_codes;
use raze_storefront::db::RepositoryError;
use raze_storefront::db::inventory::InventoryRepository;
use raze_storefront::db::products::ProductRepository;
use raze_storefront::db::promo::PromoRepository;
use thiserror::Error;
use tracing::info;

use super::{CommandError, connect};

/// Errors that can occur while seeding.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error(transparent)]
    Connect(#[from] CommandError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Upsert the launch products.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a write fails.
pub async fn products() -> Result<(), SeedError> {
    let pool = connect("STOREFRONT_DATABASE_URL").await?;
    let repo = ProductRepository::new(&pool);

    let products = seed_products();
    for product in &products {
        repo.upsert_seed(product).await?;
    }

    info!(count = products.len(), "Products seeded");
    Ok(())
}

/// Insert starting stock for variants that have no row yet.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a write fails.
pub async fn inventory() -> Result<(), SeedError> {
    let pool = connect("STOREFRONT_DATABASE_URL").await?;
    let repo = InventoryRepository::new(&pool);

    let mut inserted = 0;
    let mut skipped = 0;
    for seed in &seed_stock() {
        if repo.insert_seed(seed, DEFAULT_LOW_STOCK_THRESHOLD).await? {
            inserted += 1;
        } else {
            skipped += 1;
        }
    }

    info!(inserted, skipped, "Inventory seeded");
    Ok(())
}

/// Insert the launch promo codes that don't exist yet.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a write fails.
pub async fn promos() -> Result<(), SeedError> {
    let pool = connect("STOREFRONT_DATABASE_URL").await?;
    let repo = PromoRepository::new(&pool);

    let mut inserted = 0;
    let mut skipped = 0;
    for rule in &default_codes() {
        if repo.insert_seed(rule).await? {
            info!(code = %rule.code, "Promo code created");
            inserted += 1;
        } else {
            skipped += 1;
        }
    }

    info!(inserted, skipped, "Promo codes seeded");
    Ok(())
}
