// ============================================================================
// Catalog Domain - Products, Categories and Menus
// ============================================================================

pub mod value_objects;
pub mod errors;
pub mod service;

pub use value_objects::*;
pub use errors::*;
pub use service::*;
