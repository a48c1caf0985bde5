use uuid::Uuid;

use super::value_objects::OrderItemSnapshot;

// ============================================================================
// Order Commands - Represent user intent
// ============================================================================

/// Opens a new order. Items are already composed and priced.
#[derive(Debug, Clone)]
pub struct CreateOrder {
    pub order_id: Uuid,
    pub ticket_number: String,
    pub user_id: i64,
    pub items: Vec<OrderItemSnapshot>,
}

/// Commands against an existing order. There is no command that assigns
/// a status directly.
#[derive(Debug, Clone)]
pub enum OrderCommand {
    RenameTicket { ticket_number: String },
    ReplaceItems { items: Vec<OrderItemSnapshot> },
    MarkInPreparation,
    MarkPrepared,
    MarkDelivered,
}

impl OrderCommand {
    /// Metric label for the command
    pub fn name(&self) -> &'static str {
        match self {
            OrderCommand::RenameTicket { .. } => "rename_ticket",
            OrderCommand::ReplaceItems { .. } => "replace_items",
            OrderCommand::MarkInPreparation => "in_preparation",
            OrderCommand::MarkPrepared => "prepared",
            OrderCommand::MarkDelivered => "delivered",
        }
    }
}
