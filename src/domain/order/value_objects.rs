use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::OrderError;

// ============================================================================
// Order Value Objects
// ============================================================================

/// Preparation lifecycle of an order.
///
/// Wire and storage encoding is the lowercase token returned by
/// [`OrderStatus::as_str`]; both sides go through the same conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Created,
    InPreparation,
    Prepared,
    Delivered,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Created => "created",
            OrderStatus::InPreparation => "in_preparation",
            OrderStatus::Prepared => "prepared",
            OrderStatus::Delivered => "delivered",
        }
    }

    /// Ticket number and items may only change before the order is prepared.
    pub fn is_editable(&self) -> bool {
        matches!(self, OrderStatus::Created | OrderStatus::InPreparation)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(OrderStatus::Created),
            "in_preparation" => Ok(OrderStatus::InPreparation),
            "prepared" => Ok(OrderStatus::Prepared),
            "delivered" => Ok(OrderStatus::Delivered),
            other => Err(OrderError::UnknownStatus(other.to_string())),
        }
    }
}

/// Kind of catalog entry an order line points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Product,
    Menu,
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKind::Product => f.write_str("Product"),
            ItemKind::Menu => f.write_str("Menu"),
        }
    }
}

/// Reference to exactly one orderable catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemRef {
    Product(i64),
    Menu(i64),
}

impl ItemRef {
    pub fn kind(&self) -> ItemKind {
        match self {
            ItemRef::Product(_) => ItemKind::Product,
            ItemRef::Menu(_) => ItemKind::Menu,
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            ItemRef::Product(id) | ItemRef::Menu(id) => *id,
        }
    }
}

/// One requested line: what to order and how many.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderLineRequest {
    pub item: ItemRef,
    pub quantity: i32,
}

impl OrderLineRequest {
    pub fn product(id: i64, quantity: i32) -> Self {
        Self { item: ItemRef::Product(id), quantity }
    }

    pub fn menu(id: i64, quantity: i32) -> Self {
        Self { item: ItemRef::Menu(id), quantity }
    }
}

/// Catalog content frozen onto an order at composition time.
///
/// Never rewritten after creation: later catalog edits or deletions do not
/// reach it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemSnapshot {
    pub id: Uuid,
    pub quantity: i32,
    pub content_name: String,
    pub content_description: String,
    pub content_image: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub content_price: Decimal,
}

impl OrderItemSnapshot {
    pub fn line_total(&self) -> Decimal {
        self.content_price * Decimal::from(self.quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_tokens_are_stable() {
        let statuses = [
            (OrderStatus::Created, "created"),
            (OrderStatus::InPreparation, "in_preparation"),
            (OrderStatus::Prepared, "prepared"),
            (OrderStatus::Delivered, "delivered"),
        ];

        for (status, token) in statuses {
            assert_eq!(status.as_str(), token);
            assert_eq!(token.parse::<OrderStatus>().unwrap(), status);
            assert_eq!(serde_json::to_string(&status).unwrap(), format!("\"{}\"", token));
        }
    }

    #[test]
    fn test_unknown_status_token_rejected() {
        let result = "1".parse::<OrderStatus>();
        assert!(matches!(result, Err(OrderError::UnknownStatus(_))));
    }

    #[test]
    fn test_editable_states() {
        assert!(OrderStatus::Created.is_editable());
        assert!(OrderStatus::InPreparation.is_editable());
        assert!(!OrderStatus::Prepared.is_editable());
        assert!(!OrderStatus::Delivered.is_editable());
    }

    #[test]
    fn test_item_ref_accessors() {
        let product = ItemRef::Product(3);
        let menu = ItemRef::Menu(9);

        assert_eq!(product.kind(), ItemKind::Product);
        assert_eq!(product.id(), 3);
        assert_eq!(menu.kind(), ItemKind::Menu);
        assert_eq!(menu.id(), 9);
        assert_eq!(menu.kind().to_string(), "Menu");
    }

    #[test]
    fn test_snapshot_line_total() {
        let snapshot = OrderItemSnapshot {
            id: Uuid::new_v4(),
            quantity: 3,
            content_name: "Fries".to_string(),
            content_description: "Crispy".to_string(),
            content_image: String::new(),
            content_price: Decimal::new(250, 2),
        };

        assert_eq!(snapshot.line_total(), Decimal::new(750, 2));
    }

    #[test]
    fn test_snapshot_price_serializes_as_number() {
        let snapshot = OrderItemSnapshot {
            id: Uuid::new_v4(),
            quantity: 1,
            content_name: "Menu".to_string(),
            content_description: "Burger and fries".to_string(),
            content_image: String::new(),
            content_price: Decimal::new(854, 2),
        };

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["contentPrice"], serde_json::json!(8.54));
        assert_eq!(json["quantity"], serde_json::json!(1));
    }
}
