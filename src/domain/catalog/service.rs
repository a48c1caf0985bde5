use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;

use crate::error::Result;
use crate::store::{Store, StoreError};

use super::errors::CatalogError;
use super::value_objects::*;

// ============================================================================
// Catalog Service
// ============================================================================
//
// CRUD over products, categories and menus. Orders never read through this
// service; the composer resolves entries straight from the store.
//
// ============================================================================

pub struct CatalogService {
    store: Arc<dyn Store>,
}

fn require_text(field: &'static str, value: &str) -> Result<String, CatalogError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CatalogError::EmptyField(field));
    }
    Ok(value.to_string())
}

/// Prices are stored as NUMERIC(10, 2).
fn require_price(price: Decimal) -> Result<Decimal, CatalogError> {
    if price < Decimal::ZERO {
        return Err(CatalogError::NegativePrice);
    }
    if price.round_dp(2) != price {
        return Err(CatalogError::PriceTooPrecise);
    }
    if price >= Decimal::from(100_000_000) {
        return Err(CatalogError::PriceTooLarge);
    }
    Ok(price)
}

impl CatalogService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    // ------------------------------------------------------------------
    // Categories
    // ------------------------------------------------------------------

    pub async fn list_categories(&self) -> Result<Vec<ProductCategory>> {
        Ok(self.store.list_categories().await?)
    }

    pub async fn get_category(&self, id: i64) -> Result<ProductCategory> {
        self.store
            .find_category(id)
            .await?
            .ok_or_else(|| CatalogError::CategoryNotFound(id).into())
    }

    pub async fn create_category(&self, input: NewCategory) -> Result<ProductCategory> {
        let input = NewCategory {
            name: require_text("Name", &input.name)?,
            description: input.description.trim().to_string(),
        };

        let category = self.store.insert_category(&input).await?;
        tracing::info!(category_id = category.id, name = %category.name, "Category created");
        Ok(category)
    }

    pub async fn update_category(&self, id: i64, patch: CategoryPatch) -> Result<ProductCategory> {
        if patch.is_empty() {
            return Err(CatalogError::NothingToUpdate.into());
        }

        let mut category = self.get_category(id).await?;
        if let Some(name) = patch.name {
            category.name = require_text("Name", &name)?;
        }
        if let Some(description) = patch.description {
            category.description = description.trim().to_string();
        }

        self.store.update_category(&category).await?;
        tracing::info!(category_id = id, "Category updated");
        Ok(category)
    }

    pub async fn delete_category(&self, id: i64) -> Result<()> {
        self.get_category(id).await?;

        match self.store.delete_category(id).await {
            Ok(()) => {
                tracing::info!(category_id = id, "Category deleted");
                Ok(())
            }
            Err(StoreError::StillReferenced(_)) => Err(CatalogError::CategoryInUse(id).into()),
            Err(e) => Err(e.into()),
        }
    }

    // ------------------------------------------------------------------
    // Products
    // ------------------------------------------------------------------

    pub async fn list_products(&self) -> Result<Vec<Product>> {
        Ok(self.store.list_products().await?)
    }

    pub async fn get_product(&self, id: i64) -> Result<Product> {
        self.store
            .find_product(id)
            .await?
            .ok_or_else(|| CatalogError::ProductNotFound(id).into())
    }

    pub async fn create_product(&self, input: NewProduct) -> Result<Product> {
        if let Some(category_id) = input.category_id {
            self.get_category(category_id).await?;
        }

        let input = NewProduct {
            name: require_text("Name", &input.name)?,
            description: require_text("Description", &input.description)?,
            image: input.image.trim().to_string(),
            price: require_price(input.price)?,
            is_available: input.is_available,
            category_id: input.category_id,
        };

        let product = self.store.insert_product(&input).await?;
        tracing::info!(product_id = product.id, name = %product.name, "Product created");
        Ok(product)
    }

    pub async fn update_product(&self, id: i64, patch: ProductPatch) -> Result<Product> {
        if patch.is_empty() {
            return Err(CatalogError::NothingToUpdate.into());
        }

        let mut product = self.get_product(id).await?;
        if let Some(name) = patch.name {
            product.name = require_text("Name", &name)?;
        }
        if let Some(description) = patch.description {
            product.description = require_text("Description", &description)?;
        }
        if let Some(image) = patch.image {
            product.image = image.trim().to_string();
        }
        if let Some(price) = patch.price {
            product.price = require_price(price)?;
        }
        if let Some(is_available) = patch.is_available {
            product.is_available = is_available;
        }
        if let Some(category_id) = patch.category_id {
            self.get_category(category_id).await?;
            product.category_id = Some(category_id);
        }
        product.updated_at = Utc::now();

        self.store.update_product(&product).await?;
        tracing::info!(product_id = id, price = %product.price, available = product.is_available, "Product updated");
        Ok(product)
    }

    /// Removes the product from its menus; order snapshots keep their copy.
    pub async fn delete_product(&self, id: i64) -> Result<()> {
        self.get_product(id).await?;
        self.store.delete_product(id).await?;
        tracing::info!(product_id = id, "Product deleted");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Menus
    // ------------------------------------------------------------------

    pub async fn list_menus(&self) -> Result<Vec<Menu>> {
        Ok(self.store.list_menus().await?)
    }

    pub async fn get_menu(&self, id: i64) -> Result<Menu> {
        self.store
            .find_menu(id)
            .await?
            .ok_or_else(|| CatalogError::MenuNotFound(id).into())
    }

    pub async fn create_menu(&self, input: NewMenu) -> Result<Menu> {
        let input = NewMenu {
            name: require_text("Name", &input.name)?,
            description: require_text("Description", &input.description)?,
            image: input.image.trim().to_string(),
            price: require_price(input.price)?,
            is_available: input.is_available,
            product_ids: self.check_menu_products(input.product_ids).await?,
        };

        let menu = self.store.insert_menu(&input).await?;
        tracing::info!(menu_id = menu.id, name = %menu.name, products = menu.product_ids.len(), "Menu created");
        Ok(menu)
    }

    pub async fn update_menu(&self, id: i64, patch: MenuPatch) -> Result<Menu> {
        if patch.is_empty() {
            return Err(CatalogError::NothingToUpdate.into());
        }

        let mut menu = self.get_menu(id).await?;
        if let Some(name) = patch.name {
            menu.name = require_text("Name", &name)?;
        }
        if let Some(description) = patch.description {
            menu.description = require_text("Description", &description)?;
        }
        if let Some(image) = patch.image {
            menu.image = image.trim().to_string();
        }
        if let Some(price) = patch.price {
            menu.price = require_price(price)?;
        }
        if let Some(is_available) = patch.is_available {
            menu.is_available = is_available;
        }
        if let Some(product_ids) = patch.product_ids {
            menu.product_ids = self.check_menu_products(product_ids).await?;
        }
        menu.updated_at = Utc::now();

        self.store.update_menu(&menu).await?;
        tracing::info!(menu_id = id, price = %menu.price, available = menu.is_available, "Menu updated");
        Ok(menu)
    }

    pub async fn delete_menu(&self, id: i64) -> Result<()> {
        self.get_menu(id).await?;
        self.store.delete_menu(id).await?;
        tracing::info!(menu_id = id, "Menu deleted");
        Ok(())
    }

    /// Every id must exist; duplicates collapse, first occurrence wins.
    async fn check_menu_products(&self, product_ids: Vec<i64>) -> Result<Vec<i64>> {
        let mut checked: Vec<i64> = Vec::with_capacity(product_ids.len());
        for id in product_ids {
            if checked.contains(&id) {
                continue;
            }
            if self.store.find_product(id).await?.is_none() {
                return Err(CatalogError::MenuProductNotFound(id).into());
            }
            checked.push(id);
        }
        Ok(checked)
    }
}
