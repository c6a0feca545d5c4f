//! Order lifecycle and line-item endpoints.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{BusinessId, OrderId, OrderItemId, UnitId, UserId};
use domain::{Order, OrderError, OrderItem, OrderStatus};
use order_store::OrderStore;
use payments::PaymentGateway;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use workflow::{NewOrderItem, OrderWorkflow};

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: OrderStore> {
    pub workflow: OrderWorkflow<S>,
    pub gateway: PaymentGateway<S>,
}

// -- Request types --

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub user_id: i64,
    pub business_id: i64,
    pub items: Vec<ItemRequest>,
}

#[derive(Deserialize)]
pub struct ItemRequest {
    pub unit_id: i64,
    pub quantity: i64,
    /// Ignored; the price snapshot always comes from the catalog.
    #[serde(default)]
    pub unit_price_cents: Option<i64>,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: i64,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: i64,
    pub user_id: i64,
    pub business_id: i64,
    pub status: OrderStatus,
    pub total_cents: i64,
    pub created_at: DateTime<Utc>,
    pub version: i64,
    pub items: Vec<ItemResponse>,
}

#[derive(Serialize)]
pub struct ItemResponse {
    pub id: i64,
    pub unit_id: i64,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub total_price_cents: i64,
}

fn item_response(item: &OrderItem) -> ItemResponse {
    ItemResponse {
        id: item.id.map(|id| id.as_i64()).unwrap_or_default(),
        unit_id: item.unit_id.as_i64(),
        quantity: item.quantity,
        unit_price_cents: item.unit_price.cents(),
        total_price_cents: item.total_price().cents(),
    }
}

fn order_response(order: &Order) -> OrderResponse {
    OrderResponse {
        id: order.id().map(|id| id.as_i64()).unwrap_or_default(),
        user_id: order.user_id().as_i64(),
        business_id: order.business_id().as_i64(),
        status: order.status(),
        total_cents: order.total().cents(),
        created_at: order.created_at(),
        version: order.version().as_i64(),
        items: order.items().iter().map(item_response).collect(),
    }
}

fn parse_path_id<T>(raw: &str, parse: fn(&str) -> Result<T, common::IdParseError>) -> Result<T, ApiError> {
    parse(raw).map_err(|e| ApiError::BadRequest(e.to_string()))
}

fn request_quantity(quantity: i64) -> Result<u32, ApiError> {
    u32::try_from(quantity)
        .ok()
        .filter(|q| *q >= 1)
        .ok_or(ApiError::from(OrderError::InvalidQuantity { quantity }))
}

fn new_item(req: &ItemRequest) -> Result<NewOrderItem, ApiError> {
    Ok(NewOrderItem {
        unit_id: UnitId::new(req.unit_id),
        quantity: request_quantity(req.quantity)?,
        unit_price: req.unit_price_cents.map(common::Money::from_cents),
    })
}

// -- Handlers --

/// POST /orders — create a new order.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let items = req
        .items
        .iter()
        .map(new_item)
        .collect::<Result<Vec<_>, _>>()?;

    let order = state
        .workflow
        .create_order(UserId::new(req.user_id), BusinessId::new(req.business_id), items)
        .await?;

    Ok((StatusCode::CREATED, Json(order_response(&order))))
}

/// GET /orders — list every order.
#[tracing::instrument(skip(state))]
pub async fn list<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = state.workflow.list_orders().await?;
    Ok(Json(orders.iter().map(order_response).collect()))
}

/// GET /orders/:id — load an order by id.
#[tracing::instrument(skip(state))]
pub async fn get<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let id = parse_path_id(&id, OrderId::parse)?;
    let order = state.workflow.get_order(id).await?;
    Ok(Json(order_response(&order)))
}

/// GET /orders/user/:id — list a client's orders.
#[tracing::instrument(skip(state))]
pub async fn list_by_user<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let id = parse_path_id(&id, UserId::parse)?;
    let orders = state.workflow.list_orders_by_user(id).await?;
    Ok(Json(orders.iter().map(order_response).collect()))
}

/// GET /orders/business/:id — list a business's orders.
#[tracing::instrument(skip(state))]
pub async fn list_by_business<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let id = parse_path_id(&id, BusinessId::parse)?;
    let orders = state.workflow.list_orders_by_business(id).await?;
    Ok(Json(orders.iter().map(order_response).collect()))
}

/// PATCH /orders/:id/status — move an order to a new status.
#[tracing::instrument(skip(state, req))]
pub async fn update_status<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let id = parse_path_id(&id, OrderId::parse)?;
    let status = OrderStatus::parse_requested(&req.status).map_err(ApiError::from)?;

    let update = state.workflow.update_status(id, status).await?;
    Ok(Json(order_response(&update.order)))
}

/// POST /orders/:order_id/items — add an item to a pending order.
#[tracing::instrument(skip(state, req))]
pub async fn add_item<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(order_id): Path<String>,
    Json(req): Json<ItemRequest>,
) -> Result<(StatusCode, Json<ItemResponse>), ApiError> {
    let order_id = parse_path_id(&order_id, OrderId::parse)?;
    let item = new_item(&req)?;

    let order = state.workflow.add_item_to_order(order_id, item).await?;
    let added = order
        .items()
        .last()
        .ok_or_else(|| ApiError::Internal("added item missing from order".to_string()))?;

    Ok((StatusCode::CREATED, Json(item_response(added))))
}

/// DELETE /orders/:order_id/items/:item_id — remove an item.
#[tracing::instrument(skip(state))]
pub async fn remove_item<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path((order_id, item_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let order_id = parse_path_id(&order_id, OrderId::parse)?;
    let item_id = parse_path_id(&item_id, OrderItemId::parse)?;

    state.workflow.remove_item_from_order(order_id, item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PATCH /orders/:order_id/items/:item_id/quantity — change an item's quantity.
#[tracing::instrument(skip(state, req))]
pub async fn update_item_quantity<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path((order_id, item_id)): Path<(String, String)>,
    Json(req): Json<UpdateQuantityRequest>,
) -> Result<Json<ItemResponse>, ApiError> {
    let order_id = parse_path_id(&order_id, OrderId::parse)?;
    let item_id = parse_path_id(&item_id, OrderItemId::parse)?;

    let order = state
        .workflow
        .update_item_quantity(order_id, item_id, req.quantity)
        .await?;
    let item = order
        .items()
        .iter()
        .find(|i| i.id == Some(item_id))
        .ok_or_else(|| ApiError::Internal("updated item missing from order".to_string()))?;

    Ok(Json(item_response(item)))
}
