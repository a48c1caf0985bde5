// ============================================================================
// Order Domain - Composition and Lifecycle
// ============================================================================
//
// This module contains ALL Order-specific code:
// - Value objects (OrderStatus, ItemRef, OrderItemSnapshot)
// - Composer (catalog references → priced snapshots)
// - Events (OrderCreated, OrderMarkedPrepared, etc.)
// - Commands (CreateOrder, OrderCommand)
// - Errors (OrderError enum)
// - Aggregate (OrderAggregate with the lifecycle state machine)
// - Command Handler (OrderCommandHandler)
//
// ============================================================================

pub mod value_objects;
pub mod composer;
pub mod events;
pub mod commands;
pub mod errors;
pub mod aggregate;
pub mod command_handler;

// Re-export for convenience
pub use value_objects::*;
pub use composer::*;
pub use events::*;
pub use commands::*;
pub use errors::*;
pub use aggregate::*;
pub use command_handler::*;
