use super::common::{created_response, success_response, validate_input};
use crate::{
    errors::ServiceError, handlers::AppState, identity::canonical_id,
    providers::ServiceabilityRequest,
};
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Default)]
pub struct CreateShipmentRequest {
    /// Overrides the company's default provider when set.
    pub provider_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateManualShipmentRequest {
    #[validate(length(min = 1, message = "tracking_number is required"))]
    pub tracking_number: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ServiceabilityQuery {
    pub company_id: String,
    pub provider_id: Option<Uuid>,
    #[validate(length(min = 4))]
    pub origin_pincode: String,
    #[validate(length(min = 4))]
    pub dest_pincode: String,
    pub weight_kg: f64,
}

#[derive(Debug, Deserialize)]
pub struct ProviderHealthQuery {
    pub company_id: String,
    pub provider_id: Option<Uuid>,
}

/// Dispatch an approved order through its provider. Note the 201 covers the
/// FAILED persistence path too: the shipment record exists either way, and
/// its status field says what happened at the carrier.
pub async fn create_shipment(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    payload: Option<Json<CreateShipmentRequest>>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let provider_id = payload.and_then(|Json(p)| p.provider_id);
    let shipment = state
        .services
        .shipments
        .create_shipment(order_id, provider_id)
        .await?;
    info!(%order_id, shipment_id = %shipment.id, status = %shipment.status, "shipment recorded");
    Ok(created_response(shipment))
}

/// Record an operator-dispatched shipment with its carrier slip number.
pub async fn create_manual_shipment(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<CreateManualShipmentRequest>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    validate_input(&payload)?;
    let shipment = state
        .services
        .shipments
        .create_manual_shipment(order_id, payload.tracking_number)
        .await?;
    Ok(created_response(shipment))
}

/// Pull fresh tracking from the provider and fold it into the record.
pub async fn reconcile_shipment(
    State(state): State<AppState>,
    Path(shipment_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let snapshot = state
        .services
        .shipments
        .reconcile_tracking(shipment_id)
        .await?;
    Ok(success_response(snapshot))
}

pub async fn get_shipment(
    State(state): State<AppState>,
    Path(shipment_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let shipment = state.services.shipments.get_shipment(shipment_id).await?;
    Ok(success_response(shipment))
}

pub async fn list_shipments_for_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let shipments = state
        .services
        .shipments
        .list_shipments_for_order(order_id)
        .await?;
    Ok(success_response(shipments))
}

pub async fn check_serviceability(
    State(state): State<AppState>,
    Query(query): Query<ServiceabilityQuery>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    validate_input(&query)?;
    let company_id = canonical_id(&query.company_id, "company id")?;
    let result = state
        .services
        .shipments
        .check_serviceability(
            company_id,
            query.provider_id,
            ServiceabilityRequest {
                origin_pincode: query.origin_pincode,
                dest_pincode: query.dest_pincode,
                weight_kg: query.weight_kg,
            },
        )
        .await?;
    Ok(success_response(result))
}

pub async fn provider_health(
    State(state): State<AppState>,
    Query(query): Query<ProviderHealthQuery>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let company_id = canonical_id(&query.company_id, "company id")?;
    let health = state
        .services
        .shipments
        .provider_health(company_id, query.provider_id)
        .await?;
    Ok(success_response(health))
}

pub fn shipments_router() -> Router<AppState> {
    Router::new()
        .route("/:id", get(get_shipment))
        .route("/:id/reconcile", post(reconcile_shipment))
        .route("/serviceability", get(check_serviceability))
        .route("/provider-health", get(provider_health))
}

/// Shipment routes that hang off an order id.
pub fn order_shipments_router() -> Router<AppState> {
    Router::new()
        .route(
            "/:id/shipments",
            post(create_shipment).get(list_shipments_for_order),
        )
        .route("/:id/shipments/manual", post(create_manual_shipment))
}
