//! Shiprocket REST adapter.
//!
//! Shiprocket's responses are notoriously shape-unstable: the AWB appears as
//! `awb_code`, `awb` or `awb_number`, sometimes nested under `payload` or
//! `response.data`, and is frequently an empty string until pickup is
//! scheduled. All of that is normalized here, once, so the rest of the
//! system only ever sees the canonical tracking field.

use super::{
    Address, CreatedShipment, ProviderError, ProviderHealth, Serviceability,
    ServiceabilityRequest, ShipmentRequest, ShippingProvider, TrackingUpdate,
};
use crate::entities::provider_credential::ProviderKind;
use crate::entities::shipment::ShipmentStatus;
use crate::providers::credentials::ProviderCredentialBundle;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

const PROVIDER: &str = "shiprocket";
const DEFAULT_BASE_URL: &str = "https://apiv2.shiprocket.in";

pub struct ShiprocketProvider {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl ShiprocketProvider {
    pub fn new(
        credentials: &ProviderCredentialBundle,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::transient(PROVIDER, e.to_string()))?;
        let base_url = credentials
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: credentials.api_token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn get_json(&self, url: String) -> Result<Value, ProviderError> {
        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(PROVIDER, e))?;
        Self::json_body(resp).await
    }

    async fn post_json(&self, url: String, body: Value) -> Result<Value, ProviderError> {
        let resp = self
            .client
            .post(url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(PROVIDER, e))?;
        Self::json_body(resp).await
    }

    async fn json_body(resp: reqwest::Response) -> Result<Value, ProviderError> {
        let status = resp.status();
        let body: Value = resp
            .json()
            .await
            .map_err(|e| ProviderError::api(PROVIDER, format!("unparseable response: {e}")))?;
        if !status.is_success() {
            let detail = body
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("HTTP {status}"));
            return Err(ProviderError::api(PROVIDER, detail));
        }
        Ok(body)
    }
}

/// Pull a string field out of a response, searching the well-known nesting
/// levels Shiprocket has shipped over the years.
fn extract_str(body: &Value, keys: &[&str]) -> Option<String> {
    let scopes = [
        Some(body),
        body.get("payload"),
        body.get("data"),
        body.get("response").and_then(|r| r.get("data")),
        body.get("tracking_data"),
    ];
    for scope in scopes.into_iter().flatten() {
        for key in keys {
            match scope.get(key) {
                Some(Value::String(s)) if !s.is_empty() => return Some(s.clone()),
                Some(Value::Number(n)) => return Some(n.to_string()),
                _ => {}
            }
        }
    }
    None
}

fn extract_awb(body: &Value) -> Option<String> {
    extract_str(body, &["awb_code", "awb", "awb_number", "courier_awb"])
}

/// Normalize the carrier's free-text status vocabulary.
fn normalize_status(raw: &str) -> ShipmentStatus {
    let s = raw.trim().to_ascii_uppercase().replace([' ', '-'], "_");
    match s.as_str() {
        "PICKED_UP" | "PKD" | "PICKUP_COMPLETE" => ShipmentStatus::PickedUp,
        "IN_TRANSIT" | "SHIPPED" | "OUT_FOR_DELIVERY" | "OFD" | "REACHED_DESTINATION_HUB" => {
            ShipmentStatus::InTransit
        }
        "DELIVERED" | "DLVD" => ShipmentStatus::Delivered,
        "CANCELLED" | "CANCELED" => ShipmentStatus::Cancelled,
        "UNDELIVERED" | "RTO_INITIATED" | "LOST" => ShipmentStatus::Failed,
        _ => ShipmentStatus::Created,
    }
}

#[async_trait]
impl ShippingProvider for ShiprocketProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Shiprocket
    }

    #[instrument(skip(self, request), fields(reference = %request.reference))]
    async fn create_shipment(
        &self,
        request: &ShipmentRequest,
    ) -> Result<CreatedShipment, ProviderError> {
        let body = json!({
            // The caller's reference doubles as the carrier-side
            // idempotency key: replays with the same order_id do not
            // dispatch twice.
            "order_id": request.reference,
            "pr_number": request.pr_number,
            "pickup_location": address_json(&request.pickup),
            "delivery_location": address_json(&request.delivery),
            "weight": request.weight_kg,
            "order_items": request.items.iter().map(|i| json!({
                "name": i.name,
                "sku": i.sku,
                "units": i.units,
                "selling_price": i.unit_price,
            })).collect::<Vec<_>>(),
        });

        let resp = self
            .post_json(self.url("/v1/external/shipments/create/adhoc"), body)
            .await?;

        let provider_reference = extract_str(&resp, &["shipment_id", "id"]).ok_or_else(|| {
            ProviderError::api(PROVIDER, "create response carried no shipment id")
        })?;
        let tracking_number = extract_awb(&resp);
        debug!(%provider_reference, awb_assigned = tracking_number.is_some(), "shipment created");

        Ok(CreatedShipment {
            provider_reference,
            tracking_number,
        })
    }

    #[instrument(skip(self))]
    async fn fetch_tracking(
        &self,
        provider_reference: &str,
    ) -> Result<TrackingUpdate, ProviderError> {
        let resp = self
            .get_json(self.url(&format!(
                "/v1/external/courier/track/shipment/{provider_reference}"
            )))
            .await?;

        let status = extract_str(&resp, &["current_status", "shipment_status", "status"])
            .map(|s| normalize_status(&s))
            .unwrap_or(ShipmentStatus::Created);

        Ok(TrackingUpdate {
            tracking_number: extract_awb(&resp),
            status,
        })
    }

    #[instrument(skip(self, request))]
    async fn check_serviceability(
        &self,
        request: &ServiceabilityRequest,
    ) -> Result<Serviceability, ProviderError> {
        let resp = self
            .get_json(self.url(&format!(
                "/v1/external/courier/serviceability/?pickup_postcode={}&delivery_postcode={}&weight={}&cod=0",
                request.origin_pincode, request.dest_pincode, request.weight_kg
            )))
            .await?;

        let empty = Vec::new();
        let companies = resp
            .get("data")
            .and_then(|d| d.get("available_courier_companies"))
            .and_then(Value::as_array)
            .unwrap_or(&empty);

        let couriers: Vec<_> = companies
            .iter()
            .map(|c| super::CourierQuote {
                name: c
                    .get("courier_name")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown")
                    .to_string(),
                estimated_days: c
                    .get("estimated_delivery_days")
                    .and_then(Value::as_str)
                    .and_then(|s| s.parse().ok())
                    .or_else(|| c.get("etd_days").and_then(Value::as_u64).map(|d| d as u32)),
                rate: c.get("rate").and_then(Value::as_f64),
            })
            .collect();

        Ok(Serviceability {
            serviceable: !couriers.is_empty(),
            estimated_days: couriers.iter().filter_map(|c| c.estimated_days).min(),
            couriers,
        })
    }

    #[instrument(skip(self))]
    async fn cancel_shipment(&self, provider_reference: &str) -> Result<(), ProviderError> {
        self.post_json(
            self.url("/v1/external/orders/cancel"),
            json!({ "ids": [provider_reference] }),
        )
        .await
        .map(|_| ())
    }

    async fn health_check(&self) -> ProviderHealth {
        let started = Instant::now();
        let healthy = self
            .client
            .get(self.url("/v1/external/settings/company/pickup"))
            .bearer_auth(&self.token)
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false);
        ProviderHealth {
            healthy,
            latency_ms: started.elapsed().as_millis() as u64,
        }
    }
}

fn address_json(addr: &Address) -> Value {
    json!({
        "name": addr.name,
        "address": addr.line1,
        "city": addr.city,
        "state": addr.state,
        "pin_code": addr.pincode,
        "phone": addr.phone,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ShipmentItem;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider_for(server: &MockServer) -> ShiprocketProvider {
        let creds = ProviderCredentialBundle {
            account: "ops@example.com".into(),
            api_token: "tkn".into(),
            pickup_location: None,
            base_url: Some(server.uri()),
        };
        ShiprocketProvider::new(&creds, Duration::from_secs(2)).unwrap()
    }

    fn request() -> ShipmentRequest {
        ShipmentRequest {
            reference: "ord-1".into(),
            pr_number: Some("PR-77".into()),
            pickup: Address {
                name: "Vendor".into(),
                line1: "1 Mill Rd".into(),
                city: "Pune".into(),
                state: "MH".into(),
                pincode: "411001".into(),
                phone: "900000000".into(),
            },
            delivery: Address {
                name: "Employee".into(),
                line1: "2 Office Park".into(),
                city: "Mumbai".into(),
                state: "MH".into(),
                pincode: "400001".into(),
                phone: "911111111".into(),
            },
            items: vec![ShipmentItem {
                name: "Polo shirt".into(),
                sku: "POLO-M".into(),
                units: 2,
                unit_price: dec!(499.00),
            }],
            weight_kg: 0.6,
        }
    }

    #[tokio::test]
    async fn create_parses_awb_from_drifted_field_names() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/external/shipments/create/adhoc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "payload": { "shipment_id": 4412, "awb": "SRAWB-99" }
            })))
            .mount(&server)
            .await;

        let created = provider_for(&server)
            .create_shipment(&request())
            .await
            .unwrap();
        assert_eq!(created.provider_reference, "4412");
        assert_eq!(created.tracking_number.as_deref(), Some("SRAWB-99"));
    }

    #[tokio::test]
    async fn create_tolerates_missing_awb() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/external/shipments/create/adhoc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "shipment_id": "9001", "awb_code": ""
            })))
            .mount(&server)
            .await;

        let created = provider_for(&server)
            .create_shipment(&request())
            .await
            .unwrap();
        assert_eq!(created.provider_reference, "9001");
        assert_eq!(created.tracking_number, None);
    }

    #[tokio::test]
    async fn carrier_rejection_surfaces_as_api_error_with_detail() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/external/shipments/create/adhoc"))
            .respond_with(ResponseTemplate::new(422).set_body_json(serde_json::json!({
                "message": "pickup address not serviceable"
            })))
            .mount(&server)
            .await;

        let err = provider_for(&server)
            .create_shipment(&request())
            .await
            .unwrap_err();
        assert_matches!(err, ProviderError::Api { detail, .. } => {
            assert!(detail.contains("pickup address not serviceable"));
        });
    }

    #[tokio::test]
    async fn tracking_normalizes_carrier_status_vocabulary() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/external/courier/track/shipment/4412"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "tracking_data": { "current_status": "OUT FOR DELIVERY", "awb_code": "SRAWB-99" }
            })))
            .mount(&server)
            .await;

        let update = provider_for(&server).fetch_tracking("4412").await.unwrap();
        assert_eq!(update.status, ShipmentStatus::InTransit);
        assert_eq!(update.tracking_number.as_deref(), Some("SRAWB-99"));
    }

    #[test]
    fn status_normalization_covers_known_variants() {
        assert_eq!(normalize_status("picked up"), ShipmentStatus::PickedUp);
        assert_eq!(normalize_status("DLVD"), ShipmentStatus::Delivered);
        assert_eq!(normalize_status("CANCELED"), ShipmentStatus::Cancelled);
        assert_eq!(normalize_status("something new"), ShipmentStatus::Created);
    }
}
