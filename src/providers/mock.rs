//! Deterministic in-process provider used by integration tests.
//!
//! Same contract as the real carriers, synthetic data: the AWB is a stable
//! function of the caller's reference, and tracking advances one step per
//! poll. Failure and delayed-AWB behavior are scriptable per instance.

use super::{
    CreatedShipment, CourierQuote, ProviderError, ProviderHealth, Serviceability,
    ServiceabilityRequest, ShipmentRequest, ShippingProvider, TrackingUpdate,
};
use crate::entities::provider_credential::ProviderKind;
use crate::entities::shipment::ShipmentStatus;
use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

const REFERENCE_PREFIX: &str = "MOCK-";

#[derive(Default)]
pub struct MockProvider {
    fail_create: AtomicBool,
    delay_awb: AtomicBool,
    polls: Mutex<HashMap<String, u32>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the next create calls to fail with a carrier error.
    pub fn set_fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    /// Script creates to return no AWB, mimicking carriers that assign the
    /// tracking number during pickup scheduling.
    pub fn set_delay_awb(&self, delay: bool) {
        self.delay_awb.store(delay, Ordering::SeqCst);
    }

    fn awb_for(reference: &str) -> String {
        let mut hasher = DefaultHasher::new();
        reference.hash(&mut hasher);
        format!("MAWB{:010}", hasher.finish() % 10_000_000_000)
    }

    fn status_for_poll(poll: u32) -> ShipmentStatus {
        match poll {
            0 | 1 => ShipmentStatus::PickedUp,
            2 => ShipmentStatus::InTransit,
            _ => ShipmentStatus::Delivered,
        }
    }
}

#[async_trait]
impl ShippingProvider for MockProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Mock
    }

    async fn create_shipment(
        &self,
        request: &ShipmentRequest,
    ) -> Result<CreatedShipment, ProviderError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(ProviderError::api("mock", "scripted create failure"));
        }
        let tracking_number = if self.delay_awb.load(Ordering::SeqCst) {
            None
        } else {
            Some(Self::awb_for(&request.reference))
        };
        Ok(CreatedShipment {
            provider_reference: format!("{REFERENCE_PREFIX}{}", request.reference),
            tracking_number,
        })
    }

    async fn fetch_tracking(
        &self,
        provider_reference: &str,
    ) -> Result<TrackingUpdate, ProviderError> {
        let original = provider_reference
            .strip_prefix(REFERENCE_PREFIX)
            .ok_or_else(|| ProviderError::api("mock", "unknown shipment reference"))?;

        let poll = {
            let mut polls = self.polls.lock().unwrap_or_else(|p| p.into_inner());
            let entry = polls.entry(provider_reference.to_string()).or_insert(0);
            *entry += 1;
            *entry
        };

        // The AWB is always assigned by the time the first poll happens.
        Ok(TrackingUpdate {
            tracking_number: Some(Self::awb_for(original)),
            status: Self::status_for_poll(poll),
        })
    }

    async fn check_serviceability(
        &self,
        request: &ServiceabilityRequest,
    ) -> Result<Serviceability, ProviderError> {
        // Pincode 000000 is the scripted dead zone.
        let serviceable = request.origin_pincode != "000000" && request.dest_pincode != "000000";
        let estimated_days = serviceable.then(|| 2 + (request.weight_kg as u32 % 3));
        Ok(Serviceability {
            serviceable,
            estimated_days,
            couriers: if serviceable {
                vec![
                    CourierQuote {
                        name: "Mock Express".into(),
                        estimated_days,
                        rate: Some(79.0),
                    },
                    CourierQuote {
                        name: "Mock Surface".into(),
                        estimated_days: estimated_days.map(|d| d + 2),
                        rate: Some(49.0),
                    },
                ]
            } else {
                Vec::new()
            },
        })
    }

    async fn cancel_shipment(&self, provider_reference: &str) -> Result<(), ProviderError> {
        if provider_reference.starts_with(REFERENCE_PREFIX) {
            Ok(())
        } else {
            Err(ProviderError::api("mock", "unknown shipment reference"))
        }
    }

    async fn health_check(&self) -> ProviderHealth {
        ProviderHealth {
            healthy: true,
            latency_ms: 1,
        }
    }
}
