use super::value_objects::ItemKind;
use crate::error::ErrorKind;

// ============================================================================
// Order Business Rule Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OrderError {
    // --- composition ---
    #[error("{kind} {id}: item not found.")]
    ItemNotFound { kind: ItemKind, id: i64 },

    #[error("{kind} {id}: item is not available.")]
    ItemUnavailable { kind: ItemKind, id: i64 },

    #[error("{kind} {id}: item quantity should be superior than 0.")]
    InvalidQuantity { kind: ItemKind, id: i64 },

    #[error("At least one item must be provided.")]
    EmptyItems,

    #[error("Item quantity should be superior than 0 (got {0}).")]
    NonPositiveQuantity(i32),

    #[error("Item {0}: an item must reference a product or a menu.")]
    MissingItemRef(usize),

    #[error("Item {0}: an item must reference either a product or a menu, not both.")]
    AmbiguousItemRef(usize),

    // --- lifecycle ---
    #[error("Order is already in preparation.")]
    AlreadyInPreparation,

    #[error("Order is already prepared.")]
    AlreadyPrepared,

    #[error("Order is already delivered.")]
    AlreadyDelivered,

    #[error("Order must be in preparation before it can be prepared.")]
    NotInPreparation,

    #[error("Order must be prepared before it can be delivered.")]
    NotPrepared,

    #[error("Order cannot be modified because it has already been prepared.")]
    NotEditable,

    // --- input ---
    #[error("Ticket number is required.")]
    EmptyTicketNumber,

    #[error("No data to update.")]
    NothingToUpdate,

    #[error("Unknown order status: {0}")]
    UnknownStatus(String),

    #[error("Order not found.")]
    OrderNotFound,

    #[error("Order owner {0} not found.")]
    OwnerNotFound(i64),

    #[error("Aggregate not initialized")]
    NotInitialized,
}

impl OrderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OrderError::ItemNotFound { .. }
            | OrderError::OrderNotFound
            | OrderError::OwnerNotFound(_) => ErrorKind::NotFound,

            OrderError::ItemUnavailable { .. }
            | OrderError::AlreadyInPreparation
            | OrderError::AlreadyPrepared
            | OrderError::AlreadyDelivered
            | OrderError::NotInPreparation
            | OrderError::NotPrepared
            | OrderError::NotEditable
            | OrderError::NotInitialized => ErrorKind::InvalidState,

            OrderError::InvalidQuantity { .. }
            | OrderError::EmptyItems
            | OrderError::NonPositiveQuantity(_)
            | OrderError::MissingItemRef(_)
            | OrderError::AmbiguousItemRef(_)
            | OrderError::EmptyTicketNumber
            | OrderError::NothingToUpdate
            | OrderError::UnknownStatus(_) => ErrorKind::InvalidInput,
        }
    }
}
