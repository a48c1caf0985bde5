use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{FromRow, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::catalog::{Menu, NewCategory, NewMenu, NewProduct, Product, ProductCategory};
use crate::domain::order::{OrderAggregate, OrderEvent, OrderItemSnapshot, OrderStatus};
use crate::domain::user::{Email, NewUserRecord, User};
use crate::event_sourcing::{deserialize_event, serialize_event, EventEnvelope};

use super::{CatalogStore, OrderStore, StoreError, StoreResult, UserStore};

// ============================================================================
// PostgreSQL Store
// ============================================================================
//
// Orders are written as: order row + snapshot rows + event rows, inside one
// transaction. The order row update is conditional on the version that was
// loaded (optimistic concurrency).
//
// ============================================================================

const SCHEMA: &str = include_str!("../../migrations/0001_init.sql");

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Apply the schema. Safe to run on every start.
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        tracing::info!("Database schema is up to date");
        Ok(())
    }
}

/// Translate constraint violations into store-level errors.
fn constraint_error(err: sqlx::Error, what: &'static str) -> StoreError {
    if let Some(db) = err.as_database_error() {
        if db.is_unique_violation() {
            return StoreError::Duplicate(what);
        }
        if db.is_foreign_key_violation() {
            return StoreError::StillReferenced(what);
        }
    }
    StoreError::Database(err)
}

// ----------------------------------------------------------------------------
// Row types
// ----------------------------------------------------------------------------

#[derive(FromRow)]
struct CategoryRow {
    id: i64,
    name: String,
    description: String,
}

impl From<CategoryRow> for ProductCategory {
    fn from(row: CategoryRow) -> Self {
        Self { id: row.id, name: row.name, description: row.description }
    }
}

#[derive(FromRow)]
struct ProductRow {
    id: i64,
    name: String,
    description: String,
    image: String,
    price: Decimal,
    is_available: bool,
    category_id: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            image: row.image,
            price: row.price,
            is_available: row.is_available,
            category_id: row.category_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct MenuRow {
    id: i64,
    name: String,
    description: String,
    image: String,
    price: Decimal,
    is_available: bool,
    product_ids: Vec<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<MenuRow> for Menu {
    fn from(row: MenuRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            image: row.image,
            price: row.price,
            is_available: row.is_available,
            product_ids: row.product_ids,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct UserRow {
    id: i64,
    email: String,
    password_hash: String,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> StoreResult<Self> {
        Ok(Self {
            id: row.id,
            email: Email::parse(&row.email)
                .map_err(|e| StoreError::Corrupted(format!("user {} email: {}", row.id, e)))?,
            password_hash: row.password_hash,
            role: row
                .role
                .parse()
                .map_err(|e| StoreError::Corrupted(format!("user {} role: {}", row.id, e)))?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct OrderRow {
    id: Uuid,
    version: i64,
    ticket_number: String,
    user_id: i64,
    status: String,
    ordered_at: DateTime<Utc>,
    prepared_at: Option<DateTime<Utc>>,
    delivered_at: Option<DateTime<Utc>>,
}

#[derive(FromRow)]
struct OrderItemRow {
    id: Uuid,
    order_id: Uuid,
    quantity: i32,
    content_name: String,
    content_description: String,
    content_image: String,
    content_price: Decimal,
}

impl From<OrderItemRow> for OrderItemSnapshot {
    fn from(row: OrderItemRow) -> Self {
        Self {
            id: row.id,
            quantity: row.quantity,
            content_name: row.content_name,
            content_description: row.content_description,
            content_image: row.content_image,
            content_price: row.content_price,
        }
    }
}

fn assemble_order(row: OrderRow, items: Vec<OrderItemSnapshot>) -> StoreResult<OrderAggregate> {
    let status: OrderStatus = row
        .status
        .parse()
        .map_err(|e| StoreError::Corrupted(format!("order {} status: {}", row.id, e)))?;

    Ok(OrderAggregate {
        id: row.id,
        version: row.version,
        ticket_number: row.ticket_number,
        user_id: row.user_id,
        status,
        items,
        ordered_at: row.ordered_at,
        prepared_at: row.prepared_at,
        delivered_at: row.delivered_at,
    })
}

#[derive(FromRow)]
struct EventRow {
    event_id: Uuid,
    order_id: Uuid,
    sequence_number: i64,
    event_type: String,
    event_version: i32,
    event_data: String,
    correlation_id: Uuid,
    user_id: Option<i64>,
    created_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for EventEnvelope<OrderEvent> {
    type Error = StoreError;

    fn try_from(row: EventRow) -> StoreResult<Self> {
        let event_data = deserialize_event(&row.event_data)
            .map_err(|e| StoreError::Corrupted(format!("event {}: {}", row.event_id, e)))?;

        Ok(Self {
            event_id: row.event_id,
            aggregate_id: row.order_id,
            sequence_number: row.sequence_number,
            event_type: row.event_type,
            event_version: row.event_version,
            event_data,
            correlation_id: row.correlation_id,
            user_id: row.user_id,
            timestamp: row.created_at,
        })
    }
}

// ----------------------------------------------------------------------------
// Catalog
// ----------------------------------------------------------------------------

const PRODUCT_COLUMNS: &str =
    "id, name, description, image, price, is_available, category_id, created_at, updated_at";

const MENU_SELECT: &str = "
    SELECT m.id, m.name, m.description, m.image, m.price, m.is_available,
           COALESCE(array_agg(mp.product_id ORDER BY mp.position)
                    FILTER (WHERE mp.product_id IS NOT NULL), '{}') AS product_ids,
           m.created_at, m.updated_at
    FROM menus m
    LEFT JOIN menu_products mp ON mp.menu_id = m.id";

async fn write_menu_products(
    tx: &mut Transaction<'_, Postgres>,
    menu_id: i64,
    product_ids: &[i64],
) -> StoreResult<()> {
    sqlx::query("DELETE FROM menu_products WHERE menu_id = $1")
        .bind(menu_id)
        .execute(&mut **tx)
        .await?;

    for (position, product_id) in product_ids.iter().enumerate() {
        sqlx::query("INSERT INTO menu_products (menu_id, product_id, position) VALUES ($1, $2, $3)")
            .bind(menu_id)
            .bind(product_id)
            .bind(position as i32)
            .execute(&mut **tx)
            .await
            .map_err(|e| constraint_error(e, "products"))?;
    }
    Ok(())
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn list_categories(&self) -> StoreResult<Vec<ProductCategory>> {
        let rows: Vec<CategoryRow> =
            sqlx::query_as("SELECT id, name, description FROM product_categories ORDER BY id")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_category(&self, id: i64) -> StoreResult<Option<ProductCategory>> {
        let row: Option<CategoryRow> =
            sqlx::query_as("SELECT id, name, description FROM product_categories WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(Into::into))
    }

    async fn insert_category(&self, category: &NewCategory) -> StoreResult<ProductCategory> {
        let row: CategoryRow = sqlx::query_as(
            "INSERT INTO product_categories (name, description) VALUES ($1, $2)
             RETURNING id, name, description",
        )
        .bind(&category.name)
        .bind(&category.description)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn update_category(&self, category: &ProductCategory) -> StoreResult<()> {
        let result = sqlx::query("UPDATE product_categories SET name = $2, description = $3 WHERE id = $1")
            .bind(category.id)
            .bind(&category.name)
            .bind(&category.description)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Missing(format!("category {}", category.id)));
        }
        Ok(())
    }

    async fn delete_category(&self, id: i64) -> StoreResult<()> {
        sqlx::query("DELETE FROM product_categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| constraint_error(e, "products"))?;
        Ok(())
    }

    async fn list_products(&self) -> StoreResult<Vec<Product>> {
        let rows: Vec<ProductRow> =
            sqlx::query_as(&format!("SELECT {} FROM products ORDER BY id", PRODUCT_COLUMNS))
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_product(&self, id: i64) -> StoreResult<Option<Product>> {
        let row: Option<ProductRow> =
            sqlx::query_as(&format!("SELECT {} FROM products WHERE id = $1", PRODUCT_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(Into::into))
    }

    async fn insert_product(&self, product: &NewProduct) -> StoreResult<Product> {
        let row: ProductRow = sqlx::query_as(&format!(
            "INSERT INTO products (name, description, image, price, is_available, category_id)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {}",
            PRODUCT_COLUMNS
        ))
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.image)
        .bind(product.price)
        .bind(product.is_available)
        .bind(product.category_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| constraint_error(e, "category"))?;
        Ok(row.into())
    }

    async fn update_product(&self, product: &Product) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE products
             SET name = $2, description = $3, image = $4, price = $5,
                 is_available = $6, category_id = $7, updated_at = $8
             WHERE id = $1",
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.image)
        .bind(product.price)
        .bind(product.is_available)
        .bind(product.category_id)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| constraint_error(e, "category"))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Missing(format!("product {}", product.id)));
        }
        Ok(())
    }

    async fn delete_product(&self, id: i64) -> StoreResult<()> {
        // menu_products rows go with it (ON DELETE CASCADE)
        sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_menus(&self) -> StoreResult<Vec<Menu>> {
        let rows: Vec<MenuRow> = sqlx::query_as(&format!("{} GROUP BY m.id ORDER BY m.id", MENU_SELECT))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_menu(&self, id: i64) -> StoreResult<Option<Menu>> {
        let row: Option<MenuRow> =
            sqlx::query_as(&format!("{} WHERE m.id = $1 GROUP BY m.id", MENU_SELECT))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(Into::into))
    }

    async fn insert_menu(&self, menu: &NewMenu) -> StoreResult<Menu> {
        let mut tx = self.pool.begin().await?;

        let (id, created_at): (i64, DateTime<Utc>) = sqlx::query_as(
            "INSERT INTO menus (name, description, image, price, is_available)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id, created_at",
        )
        .bind(&menu.name)
        .bind(&menu.description)
        .bind(&menu.image)
        .bind(menu.price)
        .bind(menu.is_available)
        .fetch_one(&mut *tx)
        .await?;

        write_menu_products(&mut tx, id, &menu.product_ids).await?;
        tx.commit().await?;

        Ok(Menu {
            id,
            name: menu.name.clone(),
            description: menu.description.clone(),
            image: menu.image.clone(),
            price: menu.price,
            is_available: menu.is_available,
            product_ids: menu.product_ids.clone(),
            created_at,
            updated_at: created_at,
        })
    }

    async fn update_menu(&self, menu: &Menu) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE menus
             SET name = $2, description = $3, image = $4, price = $5,
                 is_available = $6, updated_at = $7
             WHERE id = $1",
        )
        .bind(menu.id)
        .bind(&menu.name)
        .bind(&menu.description)
        .bind(&menu.image)
        .bind(menu.price)
        .bind(menu.is_available)
        .bind(menu.updated_at)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Missing(format!("menu {}", menu.id)));
        }

        write_menu_products(&mut tx, menu.id, &menu.product_ids).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn delete_menu(&self, id: i64) -> StoreResult<()> {
        sqlx::query("DELETE FROM menus WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Orders
// ----------------------------------------------------------------------------

const ORDER_COLUMNS: &str =
    "id, version, ticket_number, user_id, status, ordered_at, prepared_at, delivered_at";

const ITEM_COLUMNS: &str =
    "id, order_id, quantity, content_name, content_description, content_image, content_price";

impl PgStore {
    async fn items_for(&self, order_ids: &[Uuid]) -> StoreResult<HashMap<Uuid, Vec<OrderItemSnapshot>>> {
        let rows: Vec<OrderItemRow> = sqlx::query_as(&format!(
            "SELECT {} FROM order_items WHERE order_id = ANY($1) ORDER BY order_id, position",
            ITEM_COLUMNS
        ))
        .bind(order_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut items: HashMap<Uuid, Vec<OrderItemSnapshot>> = HashMap::new();
        for row in rows {
            items.entry(row.order_id).or_default().push(row.into());
        }
        Ok(items)
    }
}

async fn replace_items(tx: &mut Transaction<'_, Postgres>, order: &OrderAggregate) -> StoreResult<()> {
    sqlx::query("DELETE FROM order_items WHERE order_id = $1")
        .bind(order.id)
        .execute(&mut **tx)
        .await?;

    for (position, item) in order.items.iter().enumerate() {
        sqlx::query(
            "INSERT INTO order_items
                 (id, order_id, position, quantity, content_name, content_description, content_image, content_price)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(item.id)
        .bind(order.id)
        .bind(position as i32)
        .bind(item.quantity)
        .bind(&item.content_name)
        .bind(&item.content_description)
        .bind(&item.content_image)
        .bind(item.content_price)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

async fn append_events(
    tx: &mut Transaction<'_, Postgres>,
    events: &[EventEnvelope<OrderEvent>],
) -> StoreResult<()> {
    for envelope in events {
        let event_data = serialize_event(&envelope.event_data)
            .map_err(|e| StoreError::Corrupted(format!("event {}: {}", envelope.event_id, e)))?;

        sqlx::query(
            "INSERT INTO order_events
                 (event_id, order_id, sequence_number, event_type, event_version,
                  event_data, correlation_id, user_id, created_at)
             VALUES ($1, $2, $3, $4, $5, $6::jsonb, $7, $8, $9)",
        )
        .bind(envelope.event_id)
        .bind(envelope.aggregate_id)
        .bind(envelope.sequence_number)
        .bind(&envelope.event_type)
        .bind(envelope.event_version)
        .bind(event_data)
        .bind(envelope.correlation_id)
        .bind(envelope.user_id)
        .bind(envelope.timestamp)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

#[async_trait]
impl OrderStore for PgStore {
    async fn list_orders(&self, status: Option<OrderStatus>) -> StoreResult<Vec<OrderAggregate>> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {} FROM orders
             WHERE ($1::text IS NULL OR status = $1)
             ORDER BY ordered_at DESC",
            ORDER_COLUMNS
        ))
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut items = self.items_for(&ids).await?;

        rows.into_iter()
            .map(|row| {
                let order_items = items.remove(&row.id).unwrap_or_default();
                assemble_order(row, order_items)
            })
            .collect()
    }

    async fn find_order(&self, id: Uuid) -> StoreResult<Option<OrderAggregate>> {
        let row: Option<OrderRow> =
            sqlx::query_as(&format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let items = self.items_for(&[id]).await?.remove(&id).unwrap_or_default();
        assemble_order(row, items).map(Some)
    }

    async fn save_order(
        &self,
        order: &OrderAggregate,
        expected_version: Option<i64>,
        events: &[EventEnvelope<OrderEvent>],
    ) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        let items_changed = match expected_version {
            None => {
                sqlx::query(
                    "INSERT INTO orders
                         (id, version, ticket_number, user_id, status, ordered_at, prepared_at, delivered_at)
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
                )
                .bind(order.id)
                .bind(order.version)
                .bind(&order.ticket_number)
                .bind(order.user_id)
                .bind(order.status.as_str())
                .bind(order.ordered_at)
                .bind(order.prepared_at)
                .bind(order.delivered_at)
                .execute(&mut *tx)
                .await
                .map_err(|e| constraint_error(e, "order"))?;
                true
            }
            Some(expected) => {
                let result = sqlx::query(
                    "UPDATE orders
                     SET version = $2, ticket_number = $3, status = $4,
                         prepared_at = $5, delivered_at = $6
                     WHERE id = $1 AND version = $7",
                )
                .bind(order.id)
                .bind(order.version)
                .bind(&order.ticket_number)
                .bind(order.status.as_str())
                .bind(order.prepared_at)
                .bind(order.delivered_at)
                .bind(expected)
                .execute(&mut *tx)
                .await?;

                if result.rows_affected() == 0 {
                    let actual: Option<i64> = sqlx::query_scalar("SELECT version FROM orders WHERE id = $1")
                        .bind(order.id)
                        .fetch_optional(&mut *tx)
                        .await?;

                    return Err(match actual {
                        Some(actual) => StoreError::VersionConflict { order_id: order.id, expected, actual },
                        None => StoreError::Missing(format!("order {}", order.id)),
                    });
                }

                events.iter().any(|e| e.event_data.replaces_items())
            }
        };

        if items_changed {
            replace_items(&mut tx, order).await?;
        }
        append_events(&mut tx, events).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn load_events(&self, order_id: Uuid) -> StoreResult<Vec<EventEnvelope<OrderEvent>>> {
        let rows: Vec<EventRow> = sqlx::query_as(
            "SELECT event_id, order_id, sequence_number, event_type, event_version,
                    event_data::text AS event_data, correlation_id, user_id, created_at
             FROM order_events
             WHERE order_id = $1
             ORDER BY sequence_number",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}

// ----------------------------------------------------------------------------
// Users
// ----------------------------------------------------------------------------

const USER_COLUMNS: &str = "id, email, password_hash, role, created_at, updated_at";

#[async_trait]
impl UserStore for PgStore {
    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let rows: Vec<UserRow> = sqlx::query_as(&format!("SELECT {} FROM users ORDER BY id", USER_COLUMNS))
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn find_user(&self, id: i64) -> StoreResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS))
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn insert_user(&self, user: &NewUserRecord) -> StoreResult<User> {
        let row: UserRow = sqlx::query_as(&format!(
            "INSERT INTO users (email, password_hash, role) VALUES ($1, $2, $3) RETURNING {}",
            USER_COLUMNS
        ))
        .bind(user.email.as_str())
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| constraint_error(e, "email"))?;
        row.try_into()
    }

    async fn update_user(&self, user: &User) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE users SET email = $2, password_hash = $3, role = $4, updated_at = $5 WHERE id = $1",
        )
        .bind(user.id)
        .bind(user.email.as_str())
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| constraint_error(e, "email"))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Missing(format!("user {}", user.id)));
        }
        Ok(())
    }

    async fn delete_user(&self, id: i64) -> StoreResult<()> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| constraint_error(e, "orders"))?;
        Ok(())
    }
}
