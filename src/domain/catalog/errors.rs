use crate::error::ErrorKind;

// ============================================================================
// Catalog Business Rule Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CatalogError {
    #[error("Product not found.")]
    ProductNotFound(i64),

    #[error("Product {0}: product not found.")]
    MenuProductNotFound(i64),

    #[error("Menu not found.")]
    MenuNotFound(i64),

    #[error("Product category not found.")]
    CategoryNotFound(i64),

    #[error("Product category {0} is still used by products.")]
    CategoryInUse(i64),

    #[error("{0} cannot be empty.")]
    EmptyField(&'static str),

    #[error("Price cannot be negative.")]
    NegativePrice,

    #[error("Price cannot have more than 2 decimal places.")]
    PriceTooPrecise,

    #[error("Price must be below 100000000.")]
    PriceTooLarge,

    #[error("No data to update.")]
    NothingToUpdate,
}

impl CatalogError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CatalogError::ProductNotFound(_)
            | CatalogError::MenuProductNotFound(_)
            | CatalogError::MenuNotFound(_)
            | CatalogError::CategoryNotFound(_) => ErrorKind::NotFound,
            CatalogError::CategoryInUse(_) => ErrorKind::Conflict,
            CatalogError::EmptyField(_)
            | CatalogError::NegativePrice
            | CatalogError::PriceTooPrecise
            | CatalogError::PriceTooLarge
            | CatalogError::NothingToUpdate => ErrorKind::InvalidInput,
        }
    }
}
