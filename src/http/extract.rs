use std::future::Future;
use std::pin::Pin;

use actix_web::http::header;
use actix_web::{web, FromRequest, HttpRequest};
use uuid::Uuid;

use crate::domain::user::Role;
use crate::error::{Error, ErrorKind};

use super::AppState;

/// Caller identity taken from a verified bearer token.
///
/// The account must still exist; its current role is used, not the one
/// recorded in the token.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser {
    pub id: i64,
    pub role: Role,
}

fn bearer_token(req: &HttpRequest) -> Option<String> {
    let value = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then(|| token.to_string())
}

impl FromRequest for AuthenticatedUser {
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        let state = req.app_data::<web::Data<AppState>>().cloned();
        let token = bearer_token(req);

        Box::pin(async move {
            let state = state.ok_or_else(|| Error::Internal("application state missing".to_string()))?;
            let token = token.ok_or_else(|| Error::Unauthorized("Authentication required.".to_string()))?;

            let claims = state.tokens.verify(&token)?;
            let user = state
                .users
                .get_user(claims.sub)
                .await
                .map_err(|e| match e.kind() {
                    ErrorKind::NotFound => Error::Unauthorized("Invalid or expired token.".to_string()),
                    _ => e,
                })?;

            Ok(AuthenticatedUser { id: user.id, role: user.role })
        })
    }
}

/// Groups the events recorded for one request.
///
/// Taken from a valid `X-Request-Id` header, otherwise generated.
pub fn correlation_id(req: &HttpRequest) -> Uuid {
    req.headers()
        .get("X-Request-Id")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v).ok())
        .unwrap_or_else(Uuid::new_v4)
}
