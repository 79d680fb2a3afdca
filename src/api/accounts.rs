//! Accounts API
//!
//! Endpoints over the broker core:
//! - POST /accounts - Open an account
//! - GET /accounts/:id - Account summary with balances and margin
//! - GET /accounts/:id/positions - Positions marked to the live mid
//! - POST /accounts/:id/orders - Place an order (400 when rejected)
//! - GET /accounts/:id/orders - Order history, optional ?status= filter
//! - GET /accounts/:id/fills - Fill history

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::types::{AccountSummary, Fill, Order, OrderRequest, OrderStatus, PositionView};
use crate::AppState;

/// Create the accounts router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/accounts", post(create_account))
        .route("/accounts/:id", get(get_account))
        .route("/accounts/:id/positions", get(list_positions))
        .route("/accounts/:id/orders", post(place_order).get(list_orders))
        .route("/accounts/:id/fills", get(list_fills))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountRequest {
    pub initial_capital: f64,
}

#[derive(Debug, Serialize)]
pub struct CreateAccountResponse {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct ListOrdersQuery {
    pub status: Option<String>,
}

/// POST /accounts
async fn create_account(
    State(state): State<AppState>,
    Json(request): Json<CreateAccountRequest>,
) -> Result<(StatusCode, Json<CreateAccountResponse>), AppError> {
    let id = state.broker.create_account(request.initial_capital)?;
    Ok((StatusCode::CREATED, Json(CreateAccountResponse { id })))
}

/// GET /accounts/:id
async fn get_account(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AccountSummary>, AppError> {
    Ok(Json(state.broker.get_account(&id).await?))
}

/// GET /accounts/:id/positions
async fn list_positions(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<PositionView>>, AppError> {
    Ok(Json(state.broker.get_positions(&id).await?))
}

/// POST /accounts/:id/orders
///
/// Rejected orders are recorded in the account history and surface here as
/// 400 with the order body carrying the reason.
async fn place_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<OrderRequest>,
) -> Result<Response, AppError> {
    let order = state.broker.place_order(&id, request).await?;
    let status = if order.status == OrderStatus::Rejected {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(order)).into_response())
}

/// GET /accounts/:id/orders?status=...
async fn list_orders(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<Vec<Order>>, AppError> {
    let orders = state.broker.get_orders(&id, query.status.as_deref()).await?;
    Ok(Json(orders))
}

/// GET /accounts/:id/fills
async fn list_fills(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Fill>>, AppError> {
    Ok(Json(state.broker.get_fills(&id).await?))
}
