use crate::error::ErrorKind;

// ============================================================================
// User Business Rule Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UserError {
    #[error("User not found.")]
    NotFound(i64),

    #[error("Email already used.")]
    EmailTaken,

    #[error("Email cannot be empty.")]
    EmptyEmail,

    #[error("Invalid email format: {0}")]
    InvalidEmail(String),

    #[error("Invalid password: {0}.")]
    WeakPassword(&'static str),

    #[error("Unknown role: {0}")]
    UnknownRole(String),

    #[error("Invalid email or password.")]
    InvalidCredentials,

    #[error("User {0} still owns orders and cannot be deleted.")]
    HasOrders(i64),

    #[error("No data to update.")]
    NothingToUpdate,
}

impl UserError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            UserError::NotFound(_) => ErrorKind::NotFound,
            UserError::EmailTaken | UserError::HasOrders(_) => ErrorKind::Conflict,
            UserError::InvalidCredentials => ErrorKind::Unauthorized,
            UserError::EmptyEmail
            | UserError::InvalidEmail(_)
            | UserError::WeakPassword(_)
            | UserError::UnknownRole(_)
            | UserError::NothingToUpdate => ErrorKind::InvalidInput,
        }
    }
}
