// ============================================================================
// Storage Layer
// ============================================================================
//
// Repository traits consumed by the domain services, plus two backends:
// - memory/   - process-local maps behind a tokio RwLock
// - postgres/ - sqlx over PostgreSQL
//
// The handle is passed explicitly (`Arc<dyn Store>`); there is no global
// connection.
//
// ============================================================================

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::catalog::{Menu, NewCategory, NewMenu, NewProduct, Product, ProductCategory};
use crate::domain::order::{OrderAggregate, OrderEvent, OrderStatus};
use crate::domain::user::{NewUserRecord, User};
use crate::event_sourcing::EventEnvelope;
use crate::utils::IsTransient;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Concurrency conflict on order {order_id}: expected version {expected}, but current is {actual}")]
    VersionConflict { order_id: Uuid, expected: i64, actual: i64 },

    #[error("Duplicate value for {0}")]
    Duplicate(&'static str),

    #[error("Record is still referenced by {0}")]
    StillReferenced(&'static str),

    #[error("Record {0} does not exist")]
    Missing(String),

    #[error("Corrupted row: {0}")]
    Corrupted(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl IsTransient for StoreError {
    /// Connection-level failures may clear up; everything else will not.
    fn is_transient(&self) -> bool {
        matches!(
            self,
            StoreError::Database(sqlx::Error::Io(_)) | StoreError::Database(sqlx::Error::PoolTimedOut)
        )
    }
}

/// Products, categories and menus.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn list_categories(&self) -> StoreResult<Vec<ProductCategory>>;
    async fn find_category(&self, id: i64) -> StoreResult<Option<ProductCategory>>;
    async fn insert_category(&self, category: &NewCategory) -> StoreResult<ProductCategory>;
    async fn update_category(&self, category: &ProductCategory) -> StoreResult<()>;
    /// Fails with `StillReferenced` while products point at the category.
    async fn delete_category(&self, id: i64) -> StoreResult<()>;

    async fn list_products(&self) -> StoreResult<Vec<Product>>;
    async fn find_product(&self, id: i64) -> StoreResult<Option<Product>>;
    async fn insert_product(&self, product: &NewProduct) -> StoreResult<Product>;
    async fn update_product(&self, product: &Product) -> StoreResult<()>;
    /// Also drops the product from every menu.
    async fn delete_product(&self, id: i64) -> StoreResult<()>;

    async fn list_menus(&self) -> StoreResult<Vec<Menu>>;
    async fn find_menu(&self, id: i64) -> StoreResult<Option<Menu>>;
    async fn insert_menu(&self, menu: &NewMenu) -> StoreResult<Menu>;
    async fn update_menu(&self, menu: &Menu) -> StoreResult<()>;
    async fn delete_menu(&self, id: i64) -> StoreResult<()>;
}

/// Orders with their snapshots and event history.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Newest first, optionally filtered by status.
    async fn list_orders(&self, status: Option<OrderStatus>) -> StoreResult<Vec<OrderAggregate>>;
    async fn find_order(&self, id: Uuid) -> StoreResult<Option<OrderAggregate>>;

    /// Writes the order state and its new events in one atomic step.
    ///
    /// `expected_version` is `None` for a brand new order; otherwise the
    /// stored version must match or `VersionConflict` is returned.
    async fn save_order(
        &self,
        order: &OrderAggregate,
        expected_version: Option<i64>,
        events: &[EventEnvelope<OrderEvent>],
    ) -> StoreResult<()>;

    /// Event history in sequence order.
    async fn load_events(&self, order_id: Uuid) -> StoreResult<Vec<EventEnvelope<OrderEvent>>>;
}

/// Staff accounts.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn list_users(&self) -> StoreResult<Vec<User>>;
    async fn find_user(&self, id: i64) -> StoreResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    /// Fails with `Duplicate("email")` when the email is taken.
    async fn insert_user(&self, user: &NewUserRecord) -> StoreResult<User>;
    async fn update_user(&self, user: &User) -> StoreResult<()>;
    /// Fails with `StillReferenced("orders")` while the user owns orders.
    async fn delete_user(&self, id: i64) -> StoreResult<()>;
}

/// Everything the application needs from persistence.
pub trait Store: CatalogStore + OrderStore + UserStore {}

impl<T: CatalogStore + OrderStore + UserStore> Store for T {}
