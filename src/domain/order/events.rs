use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event_sourcing::DomainEvent;
use super::value_objects::OrderItemSnapshot;

// ============================================================================
// Order Events - Domain Events for Order Aggregate
// ============================================================================

/// Order Event - Union type for all order events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    Created(OrderCreated),
    TicketRenamed(OrderTicketRenamed),
    ItemsReplaced(OrderItemsReplaced),
    MarkedInPreparation(OrderMarkedInPreparation),
    MarkedPrepared(OrderMarkedPrepared),
    MarkedDelivered(OrderMarkedDelivered),
}

impl DomainEvent for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::Created(_) => "OrderCreated",
            OrderEvent::TicketRenamed(_) => "OrderTicketRenamed",
            OrderEvent::ItemsReplaced(_) => "OrderItemsReplaced",
            OrderEvent::MarkedInPreparation(_) => "OrderMarkedInPreparation",
            OrderEvent::MarkedPrepared(_) => "OrderMarkedPrepared",
            OrderEvent::MarkedDelivered(_) => "OrderMarkedDelivered",
        }
    }
}

impl OrderEvent {
    /// Whether persisting this event rewrites the snapshot rows.
    pub fn replaces_items(&self) -> bool {
        matches!(self, OrderEvent::Created(_) | OrderEvent::ItemsReplaced(_))
    }
}

// ============================================================================
// Individual Event Types
// ============================================================================

/// Order Created - Initial event in order lifecycle
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreated {
    pub ticket_number: String,
    pub user_id: i64,
    pub items: Vec<OrderItemSnapshot>,
    pub ordered_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderTicketRenamed {
    pub ticket_number: String,
}

/// Order Items Replaced - the previous snapshots are discarded
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemsReplaced {
    pub items: Vec<OrderItemSnapshot>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderMarkedInPreparation {
    pub started_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderMarkedPrepared {
    pub prepared_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderMarkedDelivered {
    pub delivered_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_sourcing::{deserialize_event, serialize_event};

    #[test]
    fn test_event_type_names() {
        let now = Utc::now();
        assert_eq!(
            OrderEvent::MarkedPrepared(OrderMarkedPrepared { prepared_at: now }).event_type(),
            "OrderMarkedPrepared"
        );
        assert_eq!(
            OrderEvent::TicketRenamed(OrderTicketRenamed { ticket_number: "A2".to_string() }).event_type(),
            "OrderTicketRenamed"
        );
    }

    #[test]
    fn test_tagged_serialization() {
        let event = OrderEvent::TicketRenamed(OrderTicketRenamed {
            ticket_number: "B12".to_string(),
        });

        let json = serialize_event(&event).unwrap();
        assert!(json.contains("\"type\":\"TicketRenamed\""));
        assert!(json.contains("\"ticketNumber\":\"B12\""));

        let back: OrderEvent = deserialize_event(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_only_item_events_replace_items() {
        let now = Utc::now();
        assert!(OrderEvent::ItemsReplaced(OrderItemsReplaced { items: vec![] }).replaces_items());
        assert!(!OrderEvent::MarkedDelivered(OrderMarkedDelivered { delivered_at: now }).replaces_items());
    }
}
