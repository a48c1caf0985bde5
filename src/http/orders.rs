use std::str::FromStr;

use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{authorize, Action};
use crate::domain::order::{lines_from_inputs, OrderEdit, OrderItemInput, OrderStatus};
use crate::error::Result;

use super::{correlation_id, AppState, AuthenticatedUser};

#[derive(Debug, Deserialize)]
struct CreateOrderRequest {
    #[serde(rename = "ticketNumber")]
    ticket_number: String,
    items: Vec<OrderItemInput>,
}

#[derive(Debug, Deserialize)]
struct EditOrderRequest {
    #[serde(rename = "ticketNumber", default)]
    ticket_number: Option<String>,
    #[serde(default)]
    items: Option<Vec<OrderItemInput>>,
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    status: Option<String>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/orders")
            .route(web::get().to(list_orders))
            .route(web::post().to(create_order)),
    )
    .service(
        web::resource("/orders/{id}")
            .route(web::get().to(get_order))
            .route(web::put().to(edit_order)),
    )
    .route("/orders/{id}/events", web::get().to(order_history))
    .route("/orders/{id}/in-preparation", web::patch().to(mark_in_preparation))
    .route("/orders/{id}/prepared", web::patch().to(mark_prepared))
    .route("/orders/{id}/delivered", web::patch().to(mark_delivered));
}

async fn list_orders(
    state: web::Data<AppState>,
    caller: AuthenticatedUser,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse> {
    authorize(caller.role, Action::Read)?;
    let status = query
        .status
        .as_deref()
        .map(OrderStatus::from_str)
        .transpose()?;
    Ok(HttpResponse::Ok().json(state.orders.list_orders(status).await?))
}

async fn create_order(
    req: HttpRequest,
    state: web::Data<AppState>,
    caller: AuthenticatedUser,
    body: web::Json<CreateOrderRequest>,
) -> Result<HttpResponse> {
    authorize(caller.role, Action::TakeOrders)?;
    let CreateOrderRequest { ticket_number, items } = body.into_inner();
    let lines = lines_from_inputs(items)?;

    let order = state
        .orders
        .create_order(&ticket_number, caller.id, &lines, correlation_id(&req))
        .await?;
    Ok(HttpResponse::Created().json(order))
}

async fn get_order(
    state: web::Data<AppState>,
    caller: AuthenticatedUser,
    id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    authorize(caller.role, Action::Read)?;
    Ok(HttpResponse::Ok().json(state.orders.get_order(*id).await?))
}

async fn edit_order(
    req: HttpRequest,
    state: web::Data<AppState>,
    caller: AuthenticatedUser,
    id: web::Path<Uuid>,
    body: web::Json<EditOrderRequest>,
) -> Result<HttpResponse> {
    authorize(caller.role, Action::TakeOrders)?;
    let EditOrderRequest { ticket_number, items } = body.into_inner();
    let edit = OrderEdit { ticket_number, items };

    let order = state
        .orders
        .edit_order(*id, edit, caller.id, correlation_id(&req))
        .await?;
    Ok(HttpResponse::Ok().json(order))
}

async fn order_history(
    state: web::Data<AppState>,
    caller: AuthenticatedUser,
    id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    authorize(caller.role, Action::Read)?;
    Ok(HttpResponse::Ok().json(state.orders.order_history(*id).await?))
}

async fn mark_in_preparation(
    req: HttpRequest,
    state: web::Data<AppState>,
    caller: AuthenticatedUser,
    id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    authorize(caller.role, Action::PrepareOrders)?;
    let order = state
        .orders
        .mark_in_preparation(*id, caller.id, correlation_id(&req))
        .await?;
    Ok(HttpResponse::Ok().json(order))
}

async fn mark_prepared(
    req: HttpRequest,
    state: web::Data<AppState>,
    caller: AuthenticatedUser,
    id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    authorize(caller.role, Action::PrepareOrders)?;
    let order = state
        .orders
        .mark_prepared(*id, caller.id, correlation_id(&req))
        .await?;
    Ok(HttpResponse::Ok().json(order))
}

async fn mark_delivered(
    req: HttpRequest,
    state: web::Data<AppState>,
    caller: AuthenticatedUser,
    id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    authorize(caller.role, Action::DeliverOrders)?;
    let order = state
        .orders
        .mark_delivered(*id, caller.id, correlation_id(&req))
        .await?;
    Ok(HttpResponse::Ok().json(order))
}
