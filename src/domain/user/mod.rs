// ============================================================================
// User Domain - Staff Accounts and Roles
// ============================================================================

pub mod value_objects;
pub mod errors;
pub mod service;

pub use value_objects::*;
pub use errors::*;
pub use service::*;
