//! Pluggable third-party logistics providers.
//!
//! Every carrier is wrapped behind [`ShippingProvider`], which normalizes
//! heterogeneous carrier responses into one canonical shape. Business logic
//! never branches on a provider code; dispatch happens in the registry only.

pub mod credentials;
pub mod mock;
pub mod registry;
pub mod shiprocket;

use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerError};
use crate::entities::provider_credential::ProviderKind;
use crate::entities::shipment::ShipmentStatus;
use crate::errors::ServiceError;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::future::Future;

/// Failure classes surfaced by adapters.
///
/// `Api` means the carrier answered and said no; its detail is preserved and
/// shipment creation is never blindly retried on it. `Transient` covers
/// timeouts and connectivity, where no carrier-side effect is assumed.
#[derive(thiserror::Error, Debug)]
pub enum ProviderError {
    #[error("{provider} API error: {detail}")]
    Api { provider: String, detail: String },

    #[error("{provider} unreachable: {detail}")]
    Transient { provider: String, detail: String },
}

impl ProviderError {
    pub fn api(provider: impl Into<String>, detail: impl Into<String>) -> Self {
        ProviderError::Api {
            provider: provider.into(),
            detail: detail.into(),
        }
    }

    pub fn transient(provider: impl Into<String>, detail: impl Into<String>) -> Self {
        ProviderError::Transient {
            provider: provider.into(),
            detail: detail.into(),
        }
    }

    /// Classify a reqwest failure: timeouts and connection errors are
    /// transient, anything else is treated as an explicit API failure.
    pub fn from_reqwest(provider: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            ProviderError::transient(provider, err.to_string())
        } else {
            ProviderError::api(provider, err.to_string())
        }
    }
}

impl From<ProviderError> for ServiceError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Api { provider, detail } => {
                ServiceError::Provider { provider, detail }
            }
            ProviderError::Transient { provider, detail } => {
                ServiceError::Transient(format!("{provider}: {detail}"))
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Address {
    pub name: String,
    pub line1: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
    pub phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipmentItem {
    pub name: String,
    pub sku: String,
    pub units: i32,
    pub unit_price: Decimal,
}

/// Carrier-agnostic shipment creation payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipmentRequest {
    /// Caller-chosen reference, also used as the carrier-side idempotency
    /// key where the carrier supports one.
    pub reference: String,
    pub pr_number: Option<String>,
    pub pickup: Address,
    pub delivery: Address,
    pub items: Vec<ShipmentItem>,
    pub weight_kg: f64,
}

/// What a successful create returns. Carriers commonly assign the AWB later
/// during pickup scheduling, so the tracking number may be absent here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedShipment {
    pub provider_reference: String,
    pub tracking_number: Option<String>,
}

/// Normalized tracking snapshot. `tracking_number: None` means "not yet
/// assigned" and is a valid intermediate state, not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingUpdate {
    pub tracking_number: Option<String>,
    pub status: ShipmentStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceabilityRequest {
    pub origin_pincode: String,
    pub dest_pincode: String,
    pub weight_kg: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourierQuote {
    pub name: String,
    pub estimated_days: Option<u32>,
    pub rate: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Serviceability {
    pub serviceable: bool,
    pub estimated_days: Option<u32>,
    pub couriers: Vec<CourierQuote>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderHealth {
    pub healthy: bool,
    pub latency_ms: u64,
}

/// Uniform capability interface over carrier APIs.
#[async_trait]
pub trait ShippingProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    async fn create_shipment(
        &self,
        request: &ShipmentRequest,
    ) -> Result<CreatedShipment, ProviderError>;

    async fn fetch_tracking(
        &self,
        provider_reference: &str,
    ) -> Result<TrackingUpdate, ProviderError>;

    async fn check_serviceability(
        &self,
        request: &ServiceabilityRequest,
    ) -> Result<Serviceability, ProviderError>;

    async fn cancel_shipment(&self, provider_reference: &str) -> Result<(), ProviderError>;

    async fn health_check(&self) -> ProviderHealth;
}

/// Run a provider call through its circuit breaker, folding the breaker's
/// open-circuit rejection into the transient error class.
pub async fn guarded_call<F, Fut, T>(
    breaker: &CircuitBreaker,
    provider: ProviderKind,
    f: F,
) -> Result<T, ServiceError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    match breaker.call(f).await {
        Ok(v) => Ok(v),
        Err(CircuitBreakerError::Open) => Err(ServiceError::Transient(format!(
            "{provider} circuit breaker open"
        ))),
        Err(CircuitBreakerError::Inner(e)) => Err(e.into()),
    }
}
