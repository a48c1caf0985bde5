// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// Each area has its own subdirectory with value objects, errors and the
// service that applies its rules:
// - catalog/ - products, categories, menus
// - order/   - composition, lifecycle, event history
// - user/    - staff accounts and roles
//
// Persistence is reached only through the traits in `crate::store`.
//
// ============================================================================

pub mod catalog;
pub mod order;
pub mod user;
