use serde::Deserialize;
use uuid::Uuid;

use crate::domain::catalog::{Menu, Product};
use crate::error::{Error, Result};
use crate::store::CatalogStore;
use super::errors::OrderError;
use super::value_objects::{ItemKind, ItemRef, OrderItemSnapshot, OrderLineRequest};

// ============================================================================
// Order Composer
// ============================================================================
//
// Turns requested lines into priced snapshots. Per line the checks run in
// a fixed order (existence, availability, quantity) and the first failing
// line aborts the whole composition.
//
// ============================================================================

/// One line as it arrives on the wire: `{"quantity", "productID", "menuID"}`.
///
/// An id of `0` (or a missing field) means "absent".
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct OrderItemInput {
    pub quantity: i32,
    #[serde(rename = "productID", default)]
    pub product_id: Option<i64>,
    #[serde(rename = "menuID", default)]
    pub menu_id: Option<i64>,
}

impl OrderItemInput {
    /// `position` is the 1-based index used in error messages.
    pub fn into_line(self, position: usize) -> Result<OrderLineRequest, OrderError> {
        let product = self.product_id.filter(|id| *id != 0);
        let menu = self.menu_id.filter(|id| *id != 0);

        let item = match (product, menu) {
            (Some(id), None) => ItemRef::Product(id),
            (None, Some(id)) => ItemRef::Menu(id),
            (Some(_), Some(_)) => return Err(OrderError::AmbiguousItemRef(position)),
            (None, None) => return Err(OrderError::MissingItemRef(position)),
        };

        Ok(OrderLineRequest { item, quantity: self.quantity })
    }
}

impl From<OrderLineRequest> for OrderItemInput {
    fn from(line: OrderLineRequest) -> Self {
        let (product_id, menu_id) = match line.item {
            ItemRef::Product(id) => (Some(id), None),
            ItemRef::Menu(id) => (None, Some(id)),
        };
        Self { quantity: line.quantity, product_id, menu_id }
    }
}

/// Convert wire lines, stopping at the first malformed one.
pub fn lines_from_inputs(inputs: Vec<OrderItemInput>) -> Result<Vec<OrderLineRequest>, OrderError> {
    inputs
        .into_iter()
        .enumerate()
        .map(|(index, input)| input.into_line(index + 1))
        .collect()
}

pub async fn resolve_product<C: CatalogStore + ?Sized>(catalog: &C, id: i64) -> Result<Product> {
    catalog
        .find_product(id)
        .await?
        .ok_or_else(|| OrderError::ItemNotFound { kind: ItemKind::Product, id }.into())
}

pub async fn resolve_menu<C: CatalogStore + ?Sized>(catalog: &C, id: i64) -> Result<Menu> {
    catalog
        .find_menu(id)
        .await?
        .ok_or_else(|| OrderError::ItemNotFound { kind: ItemKind::Menu, id }.into())
}

/// Content copied from whichever catalog entry a line resolved to.
struct Resolved {
    name: String,
    description: String,
    image: String,
    price: rust_decimal::Decimal,
    is_available: bool,
}

impl From<Product> for Resolved {
    fn from(p: Product) -> Self {
        Self {
            name: p.name,
            description: p.description,
            image: p.image,
            price: p.price,
            is_available: p.is_available,
        }
    }
}

impl From<Menu> for Resolved {
    fn from(m: Menu) -> Self {
        Self {
            name: m.name,
            description: m.description,
            image: m.image,
            price: m.price,
            is_available: m.is_available,
        }
    }
}

/// Resolve every line against the catalog and freeze its content.
///
/// Reads only; nothing is written even when composition succeeds.
pub async fn compose_order_items<C: CatalogStore + ?Sized>(
    catalog: &C,
    lines: &[OrderLineRequest],
) -> Result<Vec<OrderItemSnapshot>> {
    let mut snapshots = Vec::with_capacity(lines.len());

    for line in lines {
        let kind = line.item.kind();
        let id = line.item.id();

        let resolved: Resolved = match line.item {
            ItemRef::Product(id) => resolve_product(catalog, id).await?.into(),
            ItemRef::Menu(id) => resolve_menu(catalog, id).await?.into(),
        };

        if !resolved.is_available {
            return Err(Error::Order(OrderError::ItemUnavailable { kind, id }));
        }

        if line.quantity <= 0 {
            return Err(Error::Order(OrderError::InvalidQuantity { kind, id }));
        }

        snapshots.push(OrderItemSnapshot {
            id: Uuid::new_v4(),
            quantity: line.quantity,
            content_name: resolved.name,
            content_description: resolved.description,
            content_image: resolved.image,
            content_price: resolved.price,
        });
    }

    if snapshots.is_empty() {
        return Err(Error::Order(OrderError::EmptyItems));
    }

    tracing::debug!(items = snapshots.len(), "Order items composed");
    Ok(snapshots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::{NewMenu, NewProduct};
    use crate::error::ErrorKind;
    use crate::store::MemoryStore;
    use rust_decimal::Decimal;

    async fn seeded_catalog() -> MemoryStore {
        let store = MemoryStore::new();

        // product 1: available at 2.50
        store
            .insert_product(&NewProduct {
                name: "Fries".to_string(),
                description: "Salted fries".to_string(),
                image: "fries.png".to_string(),
                price: Decimal::new(250, 2),
                is_available: true,
                category_id: None,
            })
            .await
            .unwrap();

        // product 2: unavailable
        store
            .insert_product(&NewProduct {
                name: "Milkshake".to_string(),
                description: "Vanilla".to_string(),
                image: String::new(),
                price: Decimal::new(300, 2),
                is_available: false,
                category_id: None,
            })
            .await
            .unwrap();

        // menu 1: available at 8.54
        store
            .insert_menu(&NewMenu {
                name: "Best Of".to_string(),
                description: "Burger, fries and drink".to_string(),
                image: "bestof.png".to_string(),
                price: Decimal::new(854, 2),
                is_available: true,
                product_ids: vec![1],
            })
            .await
            .unwrap();

        // menu 2: unavailable
        store
            .insert_menu(&NewMenu {
                name: "Maxi Best Of".to_string(),
                description: "Bigger".to_string(),
                image: String::new(),
                price: Decimal::new(1020, 2),
                is_available: false,
                product_ids: vec![],
            })
            .await
            .unwrap();

        store
    }

    #[tokio::test]
    async fn test_compose_product_and_menu() {
        let store = seeded_catalog().await;
        let lines = [OrderLineRequest::product(1, 2), OrderLineRequest::menu(1, 1)];

        let items = compose_order_items(&store, &lines).await.unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].quantity, 2);
        assert_eq!(items[0].content_name, "Fries");
        assert_eq!(items[0].content_price, Decimal::new(250, 2));
        assert_eq!(items[1].quantity, 1);
        assert_eq!(items[1].content_name, "Best Of");
        assert_eq!(items[1].content_image, "bestof.png");
        assert_eq!(items[1].content_price, Decimal::new(854, 2));
    }

    #[tokio::test]
    async fn test_missing_product_names_the_id() {
        let store = seeded_catalog().await;
        let lines = [OrderLineRequest::product(1, 1), OrderLineRequest::product(9999, 1)];

        let err = compose_order_items(&store, &lines).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_string(), "Product 9999: item not found.");
    }

    #[tokio::test]
    async fn test_unavailable_entries_are_invalid_state() {
        let store = seeded_catalog().await;

        let product = compose_order_items(&store, &[OrderLineRequest::product(2, 1)])
            .await
            .unwrap_err();
        let menu = compose_order_items(&store, &[OrderLineRequest::menu(2, 1)])
            .await
            .unwrap_err();

        assert_eq!(product.kind(), ErrorKind::InvalidState);
        assert_eq!(product.to_string(), "Product 2: item is not available.");
        assert_eq!(menu.kind(), ErrorKind::InvalidState);
        assert_eq!(menu.to_string(), "Menu 2: item is not available.");
    }

    #[tokio::test]
    async fn test_non_positive_quantity() {
        let store = seeded_catalog().await;

        for quantity in [0, -3] {
            let err = compose_order_items(&store, &[OrderLineRequest::menu(1, quantity)])
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInput);
            assert_eq!(err.to_string(), "Menu 1: item quantity should be superior than 0.");
        }

        assert!(compose_order_items(&store, &[OrderLineRequest::menu(1, 1)]).await.is_ok());
    }

    #[tokio::test]
    async fn test_existence_checked_before_availability_and_quantity() {
        let store = seeded_catalog().await;

        // unavailable and bad quantity: availability wins
        let err = compose_order_items(&store, &[OrderLineRequest::product(2, 0)])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);

        // missing and bad quantity: existence wins
        let err = compose_order_items(&store, &[OrderLineRequest::menu(77, 0)])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_empty_list_rejected() {
        let store = seeded_catalog().await;
        let err = compose_order_items(&store, &[]).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(err.to_string(), "At least one item must be provided.");
    }

    #[tokio::test]
    async fn test_snapshots_survive_catalog_changes() {
        let store = seeded_catalog().await;
        let items = compose_order_items(&store, &[OrderLineRequest::product(1, 2)])
            .await
            .unwrap();

        let mut product = store.find_product(1).await.unwrap().unwrap();
        product.price = Decimal::new(999, 2);
        product.name = "Renamed".to_string();
        store.update_product(&product).await.unwrap();
        store.delete_product(1).await.unwrap();

        assert_eq!(items[0].content_name, "Fries");
        assert_eq!(items[0].content_price, Decimal::new(250, 2));
    }

    #[test]
    fn test_wire_entry_conversion() {
        let entries: Vec<OrderItemInput> = serde_json::from_str(
            r#"[{"quantity": 2, "productID": 1}, {"quantity": 1, "menuID": 1, "productID": 0}]"#,
        )
        .unwrap();

        let lines = lines_from_inputs(entries).unwrap();
        assert_eq!(lines, vec![OrderLineRequest::product(1, 2), OrderLineRequest::menu(1, 1)]);
    }

    #[test]
    fn test_wire_entry_needs_exactly_one_ref() {
        let neither = OrderItemInput { quantity: 1, product_id: Some(0), menu_id: None };
        let both = OrderItemInput { quantity: 1, product_id: Some(1), menu_id: Some(1) };

        assert_eq!(neither.into_line(1), Err(OrderError::MissingItemRef(1)));
        assert_eq!(both.into_line(3), Err(OrderError::AmbiguousItemRef(3)));
        assert_eq!(
            OrderError::AmbiguousItemRef(3).to_string(),
            "Item 3: an item must reference either a product or a menu, not both."
        );
    }
}
