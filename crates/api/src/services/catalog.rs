//! Catalog: products and shops.
//!
//! Thin CRUD over the store plus ownership checks: products under a shop
//! are managed by the shop owner (or an admin).

use std::sync::Arc;

use rust_decimal::Decimal;

use vendora_core::{Principal, ProductId, ShopId, UserId};

use crate::error::{AppError, Result};
use crate::models::{
    NewProduct, NewShop, Paged, Product, ProductFilter, ProductUpdate, Shop,
};
use crate::store::Store;

const DEFAULT_PAGE_SIZE: u32 = 20;
const MAX_PAGE_SIZE: u32 = 50;

/// Catalog workflow.
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn Store>,
}

impl CatalogService {
    /// Create the service over an injected store.
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Paged product listing. Page numbers start at 1; page sizes are
    /// clamped to 50.
    pub async fn list(&self, mut filter: ProductFilter) -> Result<Paged<Product>> {
        filter.page = filter.page.max(1);
        filter.page_size = match filter.page_size {
            0 => DEFAULT_PAGE_SIZE,
            n => n.min(MAX_PAGE_SIZE),
        };

        let (items, total) = self.store.list_products(&filter).await?;
        Ok(Paged::new(filter.page, filter.page_size, total, items))
    }

    /// Fetch one product.
    pub async fn product(&self, id: ProductId) -> Result<Product> {
        self.store
            .product(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("product {id} not found")))
    }

    /// Create a product under a shop; shop owner or admin only.
    pub async fn create_for_shop(
        &self,
        principal: Principal,
        shop_id: ShopId,
        mut product: NewProduct,
    ) -> Result<Product> {
        let shop = self.shop(shop_id).await?;
        if shop.owner_id != principal.user_id && !principal.is_admin() {
            return Err(AppError::Unauthorized(
                "you do not own this shop".to_owned(),
            ));
        }
        validate_product_fields(&product.name, product.price, product.stock)?;
        product.shop_id = Some(shop_id);
        Ok(self.store.create_product(product).await?)
    }

    /// Full-overwrite update; shop owner or admin only. Shopless products
    /// are admin-managed.
    pub async fn update_product(
        &self,
        principal: Principal,
        id: ProductId,
        update: ProductUpdate,
    ) -> Result<Product> {
        self.authorize_manage(principal, id).await?;
        validate_product_fields(&update.name, update.price, update.stock)?;
        self.store
            .update_product(id, update)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("product {id} not found")))
    }

    /// Delete a product; shop owner or admin only.
    pub async fn delete_product(&self, principal: Principal, id: ProductId) -> Result<()> {
        self.authorize_manage(principal, id).await?;
        if !self.store.delete_product(id).await? {
            return Err(AppError::NotFound(format!("product {id} not found")));
        }
        Ok(())
    }

    /// Create a shop owned by the caller.
    pub async fn create_shop(&self, owner: UserId, shop: NewShop) -> Result<Shop> {
        if shop.name.trim().is_empty() {
            return Err(AppError::InvalidInput("shop name must not be empty".to_owned()));
        }
        Ok(self.store.create_shop(owner, shop).await?)
    }

    /// Fetch one shop.
    pub async fn shop(&self, id: ShopId) -> Result<Shop> {
        self.store
            .shop(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("shop {id} not found")))
    }

    /// All shops.
    pub async fn shops(&self) -> Result<Vec<Shop>> {
        Ok(self.store.list_shops().await?)
    }

    /// The shop's products (unpaged; shop catalogs are small).
    pub async fn shop_products(&self, id: ShopId) -> Result<Vec<Product>> {
        self.shop(id).await?;
        let filter = ProductFilter {
            shop_id: Some(id),
            page: 1,
            page_size: MAX_PAGE_SIZE,
            ..ProductFilter::default()
        };
        let (products, _) = self.store.list_products(&filter).await?;
        Ok(products)
    }

    async fn authorize_manage(&self, principal: Principal, id: ProductId) -> Result<()> {
        let product = self.product(id).await?;
        let allowed = match product.shop_id {
            _ if principal.is_admin() => true,
            Some(shop_id) => self.shop(shop_id).await?.owner_id == principal.user_id,
            None => false,
        };
        if !allowed {
            return Err(AppError::Unauthorized(
                "you do not manage this product".to_owned(),
            ));
        }
        Ok(())
    }
}

fn validate_product_fields(name: &str, price: Decimal, stock: i32) -> Result<()> {
    if name.trim().is_empty() {
        return Err(AppError::InvalidInput("product name must not be empty".to_owned()));
    }
    if price <= Decimal::ZERO {
        return Err(AppError::InvalidInput("price must be positive".to_owned()));
    }
    if stock < 0 {
        return Err(AppError::InvalidInput("stock must not be negative".to_owned()));
    }
    Ok(())
}
