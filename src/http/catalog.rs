use actix_web::{web, HttpResponse};

use crate::auth::{authorize, Action};
use crate::domain::catalog::{CategoryPatch, MenuPatch, NewCategory, NewMenu, NewProduct, ProductPatch};
use crate::error::Result;

use super::{deleted, AppState, AuthenticatedUser};

pub fn configure(cfg: &mut web::ServiceConfig) {
    // categories first so "/products/categories" is not read as a product id
    cfg.service(
        web::resource("/products/categories")
            .route(web::get().to(list_categories))
            .route(web::post().to(create_category)),
    )
    .service(
        web::resource("/products/categories/{id}")
            .route(web::get().to(get_category))
            .route(web::put().to(update_category))
            .route(web::delete().to(delete_category)),
    )
    .service(
        web::resource("/products")
            .route(web::get().to(list_products))
            .route(web::post().to(create_product)),
    )
    .service(
        web::resource("/products/{id}")
            .route(web::get().to(get_product))
            .route(web::put().to(update_product))
            .route(web::delete().to(delete_product)),
    )
    .service(
        web::resource("/menus")
            .route(web::get().to(list_menus))
            .route(web::post().to(create_menu)),
    )
    .service(
        web::resource("/menus/{id}")
            .route(web::get().to(get_menu))
            .route(web::put().to(update_menu))
            .route(web::delete().to(delete_menu)),
    );
}

// --- categories ---

async fn list_categories(state: web::Data<AppState>, _caller: AuthenticatedUser) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(state.catalog.list_categories().await?))
}

async fn get_category(
    state: web::Data<AppState>,
    _caller: AuthenticatedUser,
    id: web::Path<i64>,
) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(state.catalog.get_category(*id).await?))
}

async fn create_category(
    state: web::Data<AppState>,
    caller: AuthenticatedUser,
    body: web::Json<NewCategory>,
) -> Result<HttpResponse> {
    authorize(caller.role, Action::ManageCatalog)?;
    let category = state.catalog.create_category(body.into_inner()).await?;
    Ok(HttpResponse::Created().json(category))
}

async fn update_category(
    state: web::Data<AppState>,
    caller: AuthenticatedUser,
    id: web::Path<i64>,
    body: web::Json<CategoryPatch>,
) -> Result<HttpResponse> {
    authorize(caller.role, Action::ManageCatalog)?;
    let category = state.catalog.update_category(*id, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(category))
}

async fn delete_category(
    state: web::Data<AppState>,
    caller: AuthenticatedUser,
    id: web::Path<i64>,
) -> Result<HttpResponse> {
    authorize(caller.role, Action::ManageCatalog)?;
    state.catalog.delete_category(*id).await?;
    Ok(deleted("Product category"))
}

// --- products ---

async fn list_products(state: web::Data<AppState>, _caller: AuthenticatedUser) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(state.catalog.list_products().await?))
}

async fn get_product(
    state: web::Data<AppState>,
    _caller: AuthenticatedUser,
    id: web::Path<i64>,
) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(state.catalog.get_product(*id).await?))
}

async fn create_product(
    state: web::Data<AppState>,
    caller: AuthenticatedUser,
    body: web::Json<NewProduct>,
) -> Result<HttpResponse> {
    authorize(caller.role, Action::ManageCatalog)?;
    let product = state.catalog.create_product(body.into_inner()).await?;
    Ok(HttpResponse::Created().json(product))
}

async fn update_product(
    state: web::Data<AppState>,
    caller: AuthenticatedUser,
    id: web::Path<i64>,
    body: web::Json<ProductPatch>,
) -> Result<HttpResponse> {
    authorize(caller.role, Action::ManageCatalog)?;
    let product = state.catalog.update_product(*id, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(product))
}

async fn delete_product(
    state: web::Data<AppState>,
    caller: AuthenticatedUser,
    id: web::Path<i64>,
) -> Result<HttpResponse> {
    authorize(caller.role, Action::ManageCatalog)?;
    state.catalog.delete_product(*id).await?;
    Ok(deleted("Product"))
}

// --- menus ---

async fn list_menus(state: web::Data<AppState>, _caller: AuthenticatedUser) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(state.catalog.list_menus().await?))
}

async fn get_menu(
    state: web::Data<AppState>,
    _caller: AuthenticatedUser,
    id: web::Path<i64>,
) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(state.catalog.get_menu(*id).await?))
}

async fn create_menu(
    state: web::Data<AppState>,
    caller: AuthenticatedUser,
    body: web::Json<NewMenu>,
) -> Result<HttpResponse> {
    authorize(caller.role, Action::ManageCatalog)?;
    let menu = state.catalog.create_menu(body.into_inner()).await?;
    Ok(HttpResponse::Created().json(menu))
}

async fn update_menu(
    state: web::Data<AppState>,
    caller: AuthenticatedUser,
    id: web::Path<i64>,
    body: web::Json<MenuPatch>,
) -> Result<HttpResponse> {
    authorize(caller.role, Action::ManageCatalog)?;
    let menu = state.catalog.update_menu(*id, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(menu))
}

async fn delete_menu(
    state: web::Data<AppState>,
    caller: AuthenticatedUser,
    id: web::Path<i64>,
) -> Result<HttpResponse> {
    authorize(caller.role, Action::ManageCatalog)?;
    state.catalog.delete_menu(*id).await?;
    Ok(deleted("Menu"))
}
