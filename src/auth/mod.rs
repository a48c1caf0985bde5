// ============================================================================
// Authentication & Authorization
// ============================================================================
//
// - password/ - bcrypt hashing on the blocking pool
// - token/    - HS256 bearer tokens
// - policy/   - which roles may perform which actions
//
// ============================================================================

mod password;
mod policy;
mod token;

pub use password::{hash_password, verify_password};
pub use policy::{authorize, Action};
pub use token::{Claims, TokenService};
