use super::common::{created_response, success_response};
use crate::{errors::ServiceError, handlers::AppState, identity::canonical_id};
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct AcknowledgeReceiptRequest {
    /// Vendor-side user confirming dispatch.
    pub acknowledger_id: String,
}

/// Vendor acknowledges dispatch against an open purchase order. Calling it
/// again returns the already-approved receipt unchanged.
pub async fn acknowledge_receipt(
    State(state): State<AppState>,
    Path(purchase_order_id): Path<Uuid>,
    Json(payload): Json<AcknowledgeReceiptRequest>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let acknowledger_id = canonical_id(&payload.acknowledger_id, "acknowledger id")?;
    let receipt = state
        .services
        .procurement
        .acknowledge_receipt(purchase_order_id, acknowledger_id)
        .await?;
    info!(%purchase_order_id, receipt_id = %receipt.id, "goods receipt acknowledged");
    Ok(created_response(receipt))
}

pub async fn get_purchase_order(
    State(state): State<AppState>,
    Path(purchase_order_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let po = state
        .services
        .procurement
        .get_purchase_order(purchase_order_id)
        .await?;
    Ok(success_response(po))
}

pub async fn get_goods_receipt(
    State(state): State<AppState>,
    Path(purchase_order_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let receipt = state
        .services
        .procurement
        .get_goods_receipt(purchase_order_id)
        .await?;
    Ok(success_response(receipt))
}

pub async fn get_purchase_order_for_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let po = state
        .services
        .procurement
        .get_purchase_order_for_order(order_id)
        .await?;
    Ok(success_response(po))
}

pub fn purchase_orders_router() -> Router<AppState> {
    Router::new()
        .route("/:id", get(get_purchase_order))
        .route("/:id/acknowledge", post(acknowledge_receipt))
        .route("/:id/goods-receipt", get(get_goods_receipt))
}

/// Procurement routes that hang off an order id.
pub fn order_procurement_router() -> Router<AppState> {
    Router::new().route("/:id/purchase-order", get(get_purchase_order_for_order))
}
