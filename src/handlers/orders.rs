use super::common::{created_response, extract_approver, success_response, validate_input};
use crate::{errors::ServiceError, handlers::AppState};
use axum::{
    extract::{Path, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct ApproveOrderRequest {
    /// Supplied on the first approval of the chain; ignored afterwards.
    pub pr_number: Option<String>,
    pub pr_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RejectOrderRequest {
    #[validate(length(min = 1, message = "a rejection reason is required"))]
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct SplitOrderResponse {
    pub parent_order_id: Uuid,
    pub sub_order_ids: Vec<Uuid>,
}

/// Split a cart order into per-vendor fulfillment units.
pub async fn split_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let sub_order_ids = state.services.order.split_order(order_id).await?;
    info!(%order_id, sub_orders = sub_order_ids.len(), "order split");
    Ok(created_response(SplitOrderResponse {
        parent_order_id: order_id,
        sub_order_ids,
    }))
}

/// Advance the order through its current approval gate.
pub async fn approve_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    headers: HeaderMap,
    Json(payload): Json<ApproveOrderRequest>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    validate_input(&payload)?;
    let approver = extract_approver(&headers)?;
    let outcome = state
        .services
        .order
        .approve(order_id, approver, payload.pr_number, payload.pr_date)
        .await?;
    info!(%order_id, new_status = %outcome.new_pr_status, "order approved");
    Ok(success_response(outcome))
}

/// Reject the order at its current gate. Terminal.
pub async fn reject_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    headers: HeaderMap,
    Json(payload): Json<RejectOrderRequest>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    validate_input(&payload)?;
    let approver = extract_approver(&headers)?;
    let pr_status = state
        .services
        .order
        .reject(order_id, approver, payload.reason)
        .await?;
    info!(%order_id, "order rejected");
    Ok(success_response(json!({
        "order_id": order_id,
        "pr_status": pr_status,
    })))
}

pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let order = state.services.order.get_order(order_id).await?;
    Ok(success_response(order))
}

pub async fn list_sub_orders(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let sub_orders = state.services.order.list_sub_orders(order_id).await?;
    Ok(success_response(sub_orders))
}

/// The calling approver's pending queue, scoped by their role.
pub async fn list_pending_approvals(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let approver = extract_approver(&headers)?;
    let orders = state
        .services
        .order
        .list_pending_approvals(&approver)
        .await?;
    Ok(success_response(orders))
}

pub fn orders_router() -> Router<AppState> {
    Router::new()
        .route("/:id", get(get_order))
        .route("/:id/split", post(split_order))
        .route("/:id/approve", post(approve_order))
        .route("/:id/reject", post(reject_order))
        .route("/:id/sub-orders", get(list_sub_orders))
}

pub fn approvals_router() -> Router<AppState> {
    Router::new().route("/pending", get(list_pending_approvals))
}
