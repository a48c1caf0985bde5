use actix_web::{web, HttpResponse};

use crate::auth::{authorize, Action};
use crate::domain::user::{NewUser, UserPatch};
use crate::error::Result;

use super::{deleted, AppState, AuthenticatedUser};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/users")
            .route(web::get().to(list_users))
            .route(web::post().to(create_user)),
    )
    .service(
        web::resource("/users/{id}")
            .route(web::get().to(get_user))
            .route(web::put().to(update_user))
            .route(web::delete().to(delete_user)),
    );
}

async fn list_users(state: web::Data<AppState>, caller: AuthenticatedUser) -> Result<HttpResponse> {
    authorize(caller.role, Action::ManageUsers)?;
    Ok(HttpResponse::Ok().json(state.users.list_users().await?))
}

async fn get_user(
    state: web::Data<AppState>,
    caller: AuthenticatedUser,
    id: web::Path<i64>,
) -> Result<HttpResponse> {
    authorize(caller.role, Action::ManageUsers)?;
    Ok(HttpResponse::Ok().json(state.users.get_user(*id).await?))
}

async fn create_user(
    state: web::Data<AppState>,
    caller: AuthenticatedUser,
    body: web::Json<NewUser>,
) -> Result<HttpResponse> {
    authorize(caller.role, Action::ManageUsers)?;
    let user = state.users.create_user(body.into_inner()).await?;
    Ok(HttpResponse::Created().json(user))
}

async fn update_user(
    state: web::Data<AppState>,
    caller: AuthenticatedUser,
    id: web::Path<i64>,
    body: web::Json<UserPatch>,
) -> Result<HttpResponse> {
    authorize(caller.role, Action::ManageUsers)?;
    let user = state.users.update_user(*id, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(user))
}

async fn delete_user(
    state: web::Data<AppState>,
    caller: AuthenticatedUser,
    id: web::Path<i64>,
) -> Result<HttpResponse> {
    authorize(caller.role, Action::ManageUsers)?;
    state.users.delete_user(*id).await?;
    Ok(deleted("User"))
}
