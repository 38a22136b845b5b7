//! Seed the database with a small demo catalog.
//!
//! Creates one demo shop (owned by user 1) and a handful of products, going
//! through the same store implementation the API uses so constraints and
//! defaults match production behavior. Safe to run repeatedly; it always
//! appends a fresh shop.

use rust_decimal::Decimal;
use secrecy::SecretString;
use thiserror::Error;

use vendora_api::models::{NewProduct, NewShop};
use vendora_api::store::{PgStore, Store, StoreError, create_pool};
use vendora_core::UserId;

use super::MissingEnvVar;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error(transparent)]
    MissingEnvVar(#[from] MissingEnvVar),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

const DEMO_PRODUCTS: &[(&str, i64, i32, &str)] = &[
    ("Ceramic Mug", 1250, 40, "kitchen"),
    ("Walnut Serving Board", 5400, 12, "kitchen"),
    ("Linen Tea Towel", 950, 60, "textiles"),
    ("Stoneware Vase", 3200, 8, "decor"),
    ("Beeswax Candle Set", 1800, 25, "decor"),
];

/// Create the demo shop and products.
pub async fn run() -> Result<(), SeedError> {
    let database_url = SecretString::from(super::database_url()?);
    let pool = create_pool(&database_url).await?;
    let store = PgStore::new(pool);

    let shop = store
        .create_shop(
            UserId::new(1),
            NewShop {
                name: "Demo Atelier".to_owned(),
                description: Some("Seeded demo catalog".to_owned()),
            },
        )
        .await?;
    tracing::info!(shop_id = %shop.id, "demo shop created");

    for (name, cents, stock, category) in DEMO_PRODUCTS {
        let product = store
            .create_product(NewProduct {
                name: (*name).to_owned(),
                price: Decimal::new(*cents, 2),
                stock: *stock,
                shop_id: Some(shop.id),
                description: None,
                category: Some((*category).to_owned()),
                image_url: None,
            })
            .await?;
        tracing::info!(product_id = %product.id, name, "product seeded");
    }

    tracing::info!("Seeding complete!");
    Ok(())
}
