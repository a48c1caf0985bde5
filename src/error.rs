use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};

use crate::domain::catalog::CatalogError;
use crate::domain::order::OrderError;
use crate::domain::user::UserError;
use crate::store::StoreError;

// ============================================================================
// Application Errors
// ============================================================================
//
// Domain modules raise their own error enums; this type carries them to the
// HTTP edge, where each kind maps to one status code.
//
// ============================================================================

/// Failure categories shared by every domain error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    InvalidState,
    Conflict,
    Unauthorized,
    Forbidden,
    Storage,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidState => "invalid_state",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::Storage => "storage",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    User(#[from] UserError),

    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Order was modified concurrently, please retry.")]
    Conflict,

    #[error("Storage error: {0}")]
    Storage(StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Order(e) => e.kind(),
            Error::Catalog(e) => e.kind(),
            Error::User(e) => e.kind(),
            Error::InvalidInput(_) => ErrorKind::InvalidInput,
            Error::Unauthorized(_) => ErrorKind::Unauthorized,
            Error::Forbidden(_) => ErrorKind::Forbidden,
            Error::Conflict => ErrorKind::Conflict,
            Error::Storage(_) | Error::Internal(_) => ErrorKind::Storage,
        }
    }

    /// Text safe to show to API callers.
    pub fn public_message(&self) -> String {
        match self {
            Error::Storage(_) | Error::Internal(_) => "Internal server error.".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::VersionConflict { .. } => Error::Conflict,
            other => Error::Storage(other),
        }
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::InvalidInput | ErrorKind::InvalidState => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.kind() == ErrorKind::Storage {
            tracing::error!(error = %self, "Request failed on storage");
        }

        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": self.public_message(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::ItemKind;

    #[test]
    fn test_status_codes_per_kind() {
        let cases = [
            (Error::from(OrderError::EmptyItems), StatusCode::BAD_REQUEST),
            (Error::from(OrderError::AlreadyDelivered), StatusCode::BAD_REQUEST),
            (Error::from(OrderError::ItemNotFound { kind: ItemKind::Product, id: 9 }), StatusCode::NOT_FOUND),
            (Error::from(UserError::EmailTaken), StatusCode::CONFLICT),
            (Error::from(UserError::InvalidCredentials), StatusCode::UNAUTHORIZED),
            (Error::Forbidden("nope".to_string()), StatusCode::FORBIDDEN),
            (Error::Internal("boom".to_string()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (error, status) in cases {
            assert_eq!(error.status_code(), status, "{error}");
        }
    }

    #[test]
    fn test_version_conflict_maps_to_conflict() {
        let err = Error::from(StoreError::VersionConflict {
            order_id: uuid::Uuid::new_v4(),
            expected: 2,
            actual: 3,
        });

        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(err.to_string(), "Order was modified concurrently, please retry.");
    }

    #[test]
    fn test_storage_details_stay_private() {
        let err = Error::Storage(StoreError::Corrupted("bad status column".to_string()));
        assert_eq!(err.public_message(), "Internal server error.");
    }
}
