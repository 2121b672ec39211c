pub mod common;
pub mod orders;
pub mod receipts;
pub mod shipments;

use crate::services::{
    orders::OrderService, procurement::ProcurementService, shipments::ShipmentService,
};
use axum::{routing::get, Json, Router};
use serde_json::json;
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub order: Arc<OrderService>,
    pub shipments: Arc<ShipmentService>,
    pub procurement: Arc<ProcurementService>,
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// The full versioned API surface.
pub fn api_router() -> Router<AppState> {
    let orders = orders::orders_router()
        .merge(shipments::order_shipments_router())
        .merge(receipts::order_procurement_router());

    Router::new()
        .nest("/orders", orders)
        .nest("/approvals", orders::approvals_router())
        .nest("/purchase-orders", receipts::purchase_orders_router())
        .nest("/shipments", shipments::shipments_router())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api_router())
}
