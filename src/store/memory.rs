use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::catalog::{Menu, NewCategory, NewMenu, NewProduct, Product, ProductCategory};
use crate::domain::order::{OrderAggregate, OrderEvent, OrderStatus};
use crate::domain::user::{NewUserRecord, User};
use crate::event_sourcing::EventEnvelope;

use super::{CatalogStore, OrderStore, StoreError, StoreResult, UserStore};

// ============================================================================
// In-Memory Store
// ============================================================================
//
// Same contract as the Postgres store, held in process. One lock guards
// everything so multi-table writes stay atomic.
//
// ============================================================================

#[derive(Default)]
struct Tables {
    categories: BTreeMap<i64, ProductCategory>,
    products: BTreeMap<i64, Product>,
    menus: BTreeMap<i64, Menu>,
    users: BTreeMap<i64, User>,
    orders: HashMap<Uuid, OrderAggregate>,
    order_events: HashMap<Uuid, Vec<EventEnvelope<OrderEvent>>>,
    sequences: HashMap<&'static str, i64>,
}

impl Tables {
    /// Per-table sequence starting at 1; ids are never reused.
    fn next_id(&mut self, table: &'static str) -> i64 {
        let last = self.sequences.entry(table).or_insert(0);
        *last += 1;
        *last
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn list_categories(&self) -> StoreResult<Vec<ProductCategory>> {
        Ok(self.tables.read().await.categories.values().cloned().collect())
    }

    async fn find_category(&self, id: i64) -> StoreResult<Option<ProductCategory>> {
        Ok(self.tables.read().await.categories.get(&id).cloned())
    }

    async fn insert_category(&self, category: &NewCategory) -> StoreResult<ProductCategory> {
        let mut tables = self.tables.write().await;
        let id = tables.next_id("categories");
        let category = ProductCategory {
            id,
            name: category.name.clone(),
            description: category.description.clone(),
        };
        tables.categories.insert(id, category.clone());
        Ok(category)
    }

    async fn update_category(&self, category: &ProductCategory) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        match tables.categories.get_mut(&category.id) {
            Some(slot) => {
                *slot = category.clone();
                Ok(())
            }
            None => Err(StoreError::Missing(format!("category {}", category.id))),
        }
    }

    async fn delete_category(&self, id: i64) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.products.values().any(|p| p.category_id == Some(id)) {
            return Err(StoreError::StillReferenced("products"));
        }
        tables.categories.remove(&id);
        Ok(())
    }

    async fn list_products(&self) -> StoreResult<Vec<Product>> {
        Ok(self.tables.read().await.products.values().cloned().collect())
    }

    async fn find_product(&self, id: i64) -> StoreResult<Option<Product>> {
        Ok(self.tables.read().await.products.get(&id).cloned())
    }

    async fn insert_product(&self, product: &NewProduct) -> StoreResult<Product> {
        let mut tables = self.tables.write().await;
        let id = tables.next_id("products");
        let now = Utc::now();
        let product = Product {
            id,
            name: product.name.clone(),
            description: product.description.clone(),
            image: product.image.clone(),
            price: product.price,
            is_available: product.is_available,
            category_id: product.category_id,
            created_at: now,
            updated_at: now,
        };
        tables.products.insert(id, product.clone());
        Ok(product)
    }

    async fn update_product(&self, product: &Product) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        match tables.products.get_mut(&product.id) {
            Some(slot) => {
                *slot = product.clone();
                Ok(())
            }
            None => Err(StoreError::Missing(format!("product {}", product.id))),
        }
    }

    async fn delete_product(&self, id: i64) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables.products.remove(&id);
        for menu in tables.menus.values_mut() {
            menu.product_ids.retain(|p| *p != id);
        }
        Ok(())
    }

    async fn list_menus(&self) -> StoreResult<Vec<Menu>> {
        Ok(self.tables.read().await.menus.values().cloned().collect())
    }

    async fn find_menu(&self, id: i64) -> StoreResult<Option<Menu>> {
        Ok(self.tables.read().await.menus.get(&id).cloned())
    }

    async fn insert_menu(&self, menu: &NewMenu) -> StoreResult<Menu> {
        let mut tables = self.tables.write().await;
        let id = tables.next_id("menus");
        let now = Utc::now();
        let menu = Menu {
            id,
            name: menu.name.clone(),
            description: menu.description.clone(),
            image: menu.image.clone(),
            price: menu.price,
            is_available: menu.is_available,
            product_ids: menu.product_ids.clone(),
            created_at: now,
            updated_at: now,
        };
        tables.menus.insert(id, menu.clone());
        Ok(menu)
    }

    async fn update_menu(&self, menu: &Menu) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        match tables.menus.get_mut(&menu.id) {
            Some(slot) => {
                *slot = menu.clone();
                Ok(())
            }
            None => Err(StoreError::Missing(format!("menu {}", menu.id))),
        }
    }

    async fn delete_menu(&self, id: i64) -> StoreResult<()> {
        self.tables.write().await.menus.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn list_orders(&self, status: Option<OrderStatus>) -> StoreResult<Vec<OrderAggregate>> {
        let tables = self.tables.read().await;
        let mut orders: Vec<OrderAggregate> = tables
            .orders
            .values()
            .filter(|o| status.map_or(true, |s| o.status == s))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.ordered_at.cmp(&a.ordered_at));
        Ok(orders)
    }

    async fn find_order(&self, id: Uuid) -> StoreResult<Option<OrderAggregate>> {
        Ok(self.tables.read().await.orders.get(&id).cloned())
    }

    async fn save_order(
        &self,
        order: &OrderAggregate,
        expected_version: Option<i64>,
        events: &[EventEnvelope<OrderEvent>],
    ) -> StoreResult<()> {
        let mut tables = self.tables.write().await;

        let current = tables.orders.get(&order.id).map(|o| o.version);
        match (expected_version, current) {
            (None, None) => {}
            (None, Some(_)) => return Err(StoreError::Duplicate("order")),
            (Some(expected), Some(actual)) if expected == actual => {}
            (Some(expected), Some(actual)) => {
                return Err(StoreError::VersionConflict { order_id: order.id, expected, actual });
            }
            (Some(_), None) => return Err(StoreError::Missing(format!("order {}", order.id))),
        }

        tables.orders.insert(order.id, order.clone());
        tables
            .order_events
            .entry(order.id)
            .or_default()
            .extend(events.iter().cloned());
        Ok(())
    }

    async fn load_events(&self, order_id: Uuid) -> StoreResult<Vec<EventEnvelope<OrderEvent>>> {
        Ok(self
            .tables
            .read()
            .await
            .order_events
            .get(&order_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn list_users(&self) -> StoreResult<Vec<User>> {
        Ok(self.tables.read().await.users.values().cloned().collect())
    }

    async fn find_user(&self, id: i64) -> StoreResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self
            .tables
            .read()
            .await
            .users
            .values()
            .find(|u| u.email.as_str() == email)
            .cloned())
    }

    async fn insert_user(&self, user: &NewUserRecord) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate("email"));
        }

        let id = tables.next_id("users");
        let now = Utc::now();
        let user = User {
            id,
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            role: user.role,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(id, user.clone());
        Ok(user)
    }

    async fn update_user(&self, user: &User) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.id != user.id && u.email == user.email) {
            return Err(StoreError::Duplicate("email"));
        }
        match tables.users.get_mut(&user.id) {
            Some(slot) => {
                *slot = user.clone();
                Ok(())
            }
            None => Err(StoreError::Missing(format!("user {}", user.id))),
        }
    }

    async fn delete_user(&self, id: i64) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.orders.values().any(|o| o.user_id == id) {
            return Err(StoreError::StillReferenced("orders"));
        }
        tables.users.remove(&id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::{CreateOrder, OrderCommand, OrderItemSnapshot};
    use crate::domain::user::{Email, Role};
    use crate::event_sourcing::{wrap_events, Aggregate};
    use rust_decimal::Decimal;

    fn new_order(user_id: i64) -> (OrderAggregate, Vec<EventEnvelope<OrderEvent>>) {
        let (order, event) = OrderAggregate::create(&CreateOrder {
            order_id: Uuid::new_v4(),
            ticket_number: "T1".to_string(),
            user_id,
            items: vec![OrderItemSnapshot {
                id: Uuid::new_v4(),
                quantity: 1,
                content_name: "Fries".to_string(),
                content_description: String::new(),
                content_image: String::new(),
                content_price: Decimal::new(250, 2),
            }],
        })
        .unwrap();
        let envelopes = wrap_events(order.id, 0, vec![event], Uuid::new_v4(), Some(user_id));
        (order, envelopes)
    }

    #[tokio::test]
    async fn test_stale_version_rejected() {
        let store = MemoryStore::new();
        let (order, envelopes) = new_order(1);
        store.save_order(&order, None, &envelopes).await.unwrap();

        // two writers load version 1
        let mut first = store.find_order(order.id).await.unwrap().unwrap();
        let mut second = first.clone();

        let events = first.execute(&OrderCommand::MarkInPreparation).unwrap();
        let envelopes = wrap_events(order.id, 1, events, Uuid::new_v4(), Some(1));
        store.save_order(&first, Some(1), &envelopes).await.unwrap();

        let events = second
            .execute(&OrderCommand::RenameTicket { ticket_number: "T2".to_string() })
            .unwrap();
        let envelopes = wrap_events(order.id, 1, events, Uuid::new_v4(), Some(1));
        let err = store.save_order(&second, Some(1), &envelopes).await.unwrap_err();

        assert!(matches!(err, StoreError::VersionConflict { expected: 1, actual: 2, .. }));
        assert_eq!(store.load_events(order.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_double_insert_rejected() {
        let store = MemoryStore::new();
        let (order, envelopes) = new_order(1);
        store.save_order(&order, None, &envelopes).await.unwrap();

        let err = store.save_order(&order, None, &envelopes).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate("order")));
    }

    #[tokio::test]
    async fn test_list_orders_filters_by_status() {
        let store = MemoryStore::new();
        let (mut a, envelopes) = new_order(1);
        store.save_order(&a, None, &envelopes).await.unwrap();
        let (b, envelopes) = new_order(1);
        store.save_order(&b, None, &envelopes).await.unwrap();

        let events = a.execute(&OrderCommand::MarkInPreparation).unwrap();
        let envelopes = wrap_events(a.id, 1, events, Uuid::new_v4(), None);
        store.save_order(&a, Some(1), &envelopes).await.unwrap();

        let in_preparation = store.list_orders(Some(OrderStatus::InPreparation)).await.unwrap();
        assert_eq!(in_preparation.len(), 1);
        assert_eq!(in_preparation[0].id, a.id);
        assert_eq!(store.list_orders(None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_user_with_orders_cannot_be_deleted() {
        let store = MemoryStore::new();
        let user = store
            .insert_user(&NewUserRecord {
                email: Email::parse("a@wacdo.com").unwrap(),
                password_hash: "h".to_string(),
                role: Role::Greeter,
            })
            .await
            .unwrap();
        let (order, envelopes) = new_order(user.id);
        store.save_order(&order, None, &envelopes).await.unwrap();

        let err = store.delete_user(user.id).await.unwrap_err();
        assert!(matches!(err, StoreError::StillReferenced("orders")));
    }
}
