// ============================================================================
// HTTP Layer
// ============================================================================
//
// actix-web routes over the domain services. Handlers authenticate, check
// the role policy, call one service method and serialize the result; every
// failure goes out through `Error`'s ResponseError impl as {"error": ...}.
//
// ============================================================================

mod catalog;
mod extract;
mod orders;
mod users;

pub use extract::{correlation_id, AuthenticatedUser};

use std::sync::Arc;

use actix_web::middleware::DefaultHeaders;
use actix_web::{error, web, HttpResponse};
use serde::Serialize;

use crate::auth::TokenService;
use crate::domain::catalog::CatalogService;
use crate::domain::order::OrderCommandHandler;
use crate::domain::user::{Credentials, UserService};
use crate::error::Result;
use crate::metrics::Metrics;
use crate::store::Store;

/// Services shared by every worker.
pub struct AppState {
    pub orders: OrderCommandHandler,
    pub catalog: CatalogService,
    pub users: UserService,
    pub tokens: TokenService,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, metrics: Arc<Metrics>, tokens: TokenService, bcrypt_cost: u32) -> Self {
        Self {
            orders: OrderCommandHandler::new(store.clone(), metrics),
            catalog: CatalogService::new(store.clone()),
            users: UserService::new(store, bcrypt_cost),
            tokens,
        }
    }
}

/// Malformed bodies answer 400 "Invalid data."
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        tracing::debug!(error = %err, "Rejected request body");
        error::InternalError::from_response(err, bad_request("Invalid data.")).into()
    })
}

/// Unparsable path ids answer 400 "Invalid ID."
pub fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(|err, _req| {
        error::InternalError::from_response(err, bad_request("Invalid ID.")).into()
    })
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| {
        error::InternalError::from_response(err, bad_request("Invalid data.")).into()
    })
}

fn bad_request(message: &str) -> HttpResponse {
    HttpResponse::BadRequest().json(serde_json::json!({ "error": message }))
}

pub fn security_headers() -> DefaultHeaders {
    DefaultHeaders::new()
        .add(("X-Frame-Options", "DENY"))
        .add(("X-Content-Type-Options", "nosniff"))
        .add(("X-XSS-Protection", "1; mode=block"))
        .add(("Content-Security-Policy", "default-src 'self'"))
}

/// Mount every route.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/status", web::get().to(status))
        .route("/login", web::post().to(login))
        .configure(users::configure)
        .configure(catalog::configure)
        .configure(orders::configure);
}

#[derive(Serialize)]
struct Message {
    message: String,
}

fn deleted(entity: &str) -> HttpResponse {
    HttpResponse::Ok().json(Message {
        message: format!("{} deleted successfully.", entity),
    })
}

async fn status() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

#[derive(Serialize)]
struct TokenResponse {
    token: String,
}

async fn login(state: web::Data<AppState>, body: web::Json<Credentials>) -> Result<HttpResponse> {
    let token = state.users.login(body.into_inner(), &state.tokens).await?;
    Ok(HttpResponse::Ok().json(TokenResponse { token }))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::domain::user::{NewUser, Role};
    use crate::store::MemoryStore;

    pub const PASSWORD: &str = "Secret123!";

    pub fn state() -> web::Data<AppState> {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let metrics = Arc::new(Metrics::new().unwrap());
        web::Data::new(AppState::new(store, metrics, TokenService::new("test-secret", 60), 4))
    }

    /// Same wiring as the server in main, minus the request logger.
    macro_rules! test_app {
        ($state:expr) => {
            actix_web::test::init_service(
                actix_web::App::new()
                    .app_data($state)
                    .app_data($crate::http::json_config())
                    .app_data($crate::http::path_config())
                    .app_data($crate::http::query_config())
                    .wrap($crate::http::security_headers())
                    .configure($crate::http::configure),
            )
            .await
        };
    }
    pub(crate) use test_app;

    /// Create a user with `role` and return a bearer header value for it.
    pub async fn bearer(state: &web::Data<AppState>, email: &str, role: Role) -> String {
        state
            .users
            .create_user(NewUser { email: email.to_string(), password: PASSWORD.to_string(), role })
            .await
            .unwrap();
        let token = state
            .users
            .login(
                Credentials { email: email.to_string(), password: PASSWORD.to_string() },
                &state.tokens,
            )
            .await
            .unwrap();
        format!("Bearer {}", token)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use crate::domain::user::Role;
    use actix_web::http::StatusCode;
    use actix_web::test;

    #[actix_web::test]
    async fn test_status_is_public_and_hardened() {
        let app = test_app!(state());

        let resp = test::call_service(&app, test::TestRequest::get().uri("/status").to_request()).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers().get("X-Frame-Options").unwrap(), "DENY");
        assert_eq!(resp.headers().get("X-Content-Type-Options").unwrap(), "nosniff");
    }

    #[actix_web::test]
    async fn test_login_flow() {
        let state = state();
        bearer(&state, "admin@wacdo.com", Role::Admin).await;
        let app = test_app!(state);

        let req = test::TestRequest::post()
            .uri("/login")
            .set_json(serde_json::json!({ "email": "admin@wacdo.com", "password": PASSWORD }))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert!(body["token"].as_str().is_some());

        let req = test::TestRequest::post()
            .uri("/login")
            .set_json(serde_json::json!({ "email": "admin@wacdo.com", "password": "Wrong123!" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Invalid email or password.");
    }

    #[actix_web::test]
    async fn test_malformed_body_is_invalid_data() {
        let app = test_app!(state());

        let req = test::TestRequest::post()
            .uri("/login")
            .insert_header(("Content-Type", "application/json"))
            .set_payload("{not json")
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Invalid data.");
    }

    #[actix_web::test]
    async fn test_protected_routes_need_a_token() {
        let app = test_app!(state());

        for uri in ["/orders", "/products", "/users"] {
            let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{uri}");
        }

        let req = test::TestRequest::get()
            .uri("/orders")
            .insert_header(("Authorization", "Bearer not-a-token"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
