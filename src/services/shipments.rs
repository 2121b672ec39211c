use crate::{
    db::DbPool,
    entities::order::{self, OrderStatus, PrStatus},
    entities::shipment::{self, ShipmentMode, ShipmentStatus},
    entities::{employee, order_item, product, vendor},
    errors::ServiceError,
    events::{Event, EventSender},
    providers::registry::{ProviderRegistry, ResolvedProvider},
    providers::{
        guarded_call, Address, ProviderHealth, Serviceability, ServiceabilityRequest,
        ShipmentItem, ShipmentRequest, TrackingUpdate,
    },
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

// Flat-pack garments; good enough for serviceability quotes.
const ITEM_WEIGHT_KG: f64 = 0.3;

/// What reconciliation reports back to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingSnapshot {
    pub tracking_number: Option<String>,
    pub status: ShipmentStatus,
}

/// Creates shipments against resolved providers and reconciles their
/// tracking state until terminal.
#[derive(Clone)]
pub struct ShipmentService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    registry: Arc<ProviderRegistry>,
}

impl ShipmentService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        registry: Arc<ProviderRegistry>,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            registry,
        }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Dispatch a fully approved fulfillment unit through a provider.
    ///
    /// On adapter failure the shipment is still persisted, in `FAILED`
    /// state with the cause attached, and is deliberately not auto-retried:
    /// the carrier may have partially succeeded, and a blind retry risks a
    /// duplicate physical dispatch. A later explicit call on the same unit
    /// is permitted and creates a fresh shipment record.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn create_shipment(
        &self,
        order_id: Uuid,
        provider_id: Option<Uuid>,
    ) -> Result<shipment::Model, ServiceError> {
        let order = self.shippable_order(order_id).await?;

        let resolved = self
            .registry
            .resolve(order.company_id, provider_id)
            .await?;
        let request = self.build_request(&order).await?;

        let created = guarded_call(&resolved.breaker, resolved.kind, || {
            let adapter = resolved.adapter.clone();
            let request = request.clone();
            async move { adapter.create_shipment(&request).await }
        })
        .await;

        match created {
            Ok(created) => {
                let model = self
                    .persist_created(&order, &resolved, created.provider_reference, created.tracking_number)
                    .await?;
                self.event_sender
                    .send_or_log(Event::ShipmentCreated {
                        shipment_id: model.id,
                        order_id: order.id,
                    })
                    .await;
                Ok(model)
            }
            // Carrier-side failures persist as a FAILED shipment so the
            // error detail is durable; configuration and state errors above
            // never reach this point and persist nothing.
            Err(err @ (ServiceError::Provider { .. } | ServiceError::Transient(_))) => {
                let model = self.persist_failed(&order, &resolved, &err).await?;
                warn!(shipment_id = %model.id, error = %err, "shipment creation failed at carrier");
                self.event_sender
                    .send_or_log(Event::ShipmentFailed {
                        shipment_id: model.id,
                        order_id: order.id,
                    })
                    .await;
                Ok(model)
            }
            Err(other) => Err(other),
        }
    }

    /// Record an operator-dispatched shipment. Its tracking number is
    /// entered by the operator and treated as already canonical; manual
    /// shipments never participate in reconciliation.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn create_manual_shipment(
        &self,
        order_id: Uuid,
        tracking_number: String,
    ) -> Result<shipment::Model, ServiceError> {
        if tracking_number.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "manual shipments require an operator-entered tracking number".into(),
            ));
        }
        let order = self.shippable_order(order_id).await?;
        let now = Utc::now();
        let model = shipment::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            pr_number: Set(order.pr_number.clone()),
            shipment_mode: Set(ShipmentMode::Manual),
            provider_id: Set(None),
            provider_reference: Set(None),
            tracking_number: Set(Some(tracking_number)),
            status: Set(ShipmentStatus::Created),
            failure_reason: Set(None),
            courier_awb: Set(None),
            awb_number: Set(None),
            shipment_number: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db_pool)
        .await?;

        self.event_sender
            .send_or_log(Event::ShipmentCreated {
                shipment_id: model.id,
                order_id: order.id,
            })
            .await;
        Ok(model)
    }

    /// Re-fetch tracking from the provider and fold it into the canonical
    /// field. Safe to call repeatedly; duplicate reconciliations racing
    /// each other settle on last-write-wins for the tracking number, while
    /// status only ever moves forward unless the carrier explicitly
    /// reports a cancellation.
    #[instrument(skip(self), fields(shipment_id = %shipment_id))]
    pub async fn reconcile_tracking(
        &self,
        shipment_id: Uuid,
    ) -> Result<TrackingSnapshot, ServiceError> {
        let shipment = shipment::Entity::find_by_id(shipment_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("shipment {shipment_id} not found"))
            })?;

        if shipment.shipment_mode == ShipmentMode::Manual {
            return Err(ServiceError::StateConflict(format!(
                "shipment {} is manual and does not reconcile",
                shipment.id
            )));
        }
        if shipment.status.is_terminal() {
            return Err(ServiceError::StateConflict(format!(
                "shipment {} is already {}",
                shipment.id, shipment.status
            )));
        }
        let provider_reference = shipment.provider_reference.clone().ok_or_else(|| {
            ServiceError::InternalError(format!(
                "API-mode shipment {} has no provider reference",
                shipment.id
            ))
        })?;

        let order = order::Entity::find_by_id(shipment.order_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "shipment {} references missing order {}",
                    shipment.id, shipment.order_id
                ))
            })?;

        let resolved = self
            .registry
            .resolve(order.company_id, shipment.provider_id)
            .await?;

        let update = guarded_call(&resolved.breaker, resolved.kind, || {
            let adapter = resolved.adapter.clone();
            let reference = provider_reference.clone();
            async move { adapter.fetch_tracking(&reference).await }
        })
        .await?;

        self.apply_update(shipment, update).await
    }

    pub async fn get_shipment(&self, shipment_id: Uuid) -> Result<shipment::Model, ServiceError> {
        shipment::Entity::find_by_id(shipment_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("shipment {shipment_id} not found")))
    }

    pub async fn list_shipments_for_order(
        &self,
        order_id: Uuid,
    ) -> Result<Vec<shipment::Model>, ServiceError> {
        Ok(shipment::Entity::find()
            .filter(shipment::Column::OrderId.eq(order_id))
            .all(&*self.db_pool)
            .await?)
    }

    pub async fn check_serviceability(
        &self,
        company_id: Uuid,
        provider_id: Option<Uuid>,
        request: ServiceabilityRequest,
    ) -> Result<Serviceability, ServiceError> {
        let resolved = self.registry.resolve(company_id, provider_id).await?;
        guarded_call(&resolved.breaker, resolved.kind, || {
            let adapter = resolved.adapter.clone();
            async move { adapter.check_serviceability(&request).await }
        })
        .await
    }

    pub async fn provider_health(
        &self,
        company_id: Uuid,
        provider_id: Option<Uuid>,
    ) -> Result<ProviderHealth, ServiceError> {
        self.registry.health(company_id, provider_id).await
    }

    /// Shipment creation precondition: the unit must have cleared (or
    /// bypassed) its whole approval chain. Checked here, not assumed from
    /// caller discipline, so a rejected order can never reach a carrier.
    async fn shippable_order(&self, order_id: Uuid) -> Result<order::Model, ServiceError> {
        let order = order::Entity::find_by_id(order_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("order {order_id} not found")))?;

        if order.pr_status == PrStatus::Rejected || order.status == OrderStatus::Cancelled {
            return Err(ServiceError::StateConflict(format!(
                "order {} was rejected; shipments cannot be created for it",
                order.id
            )));
        }
        if order.status != OrderStatus::AwaitingFulfilment {
            return Err(ServiceError::StateConflict(format!(
                "order {} is {} ({}); shipment creation requires a fully approved unit",
                order.id, order.status, order.pr_status
            )));
        }
        if order.vendor_id.is_none() {
            return Err(ServiceError::ValidationError(format!(
                "order {} is not a vendor fulfillment unit",
                order.id
            )));
        }
        Ok(order)
    }

    /// Assemble the carrier payload: vendor pickup, employee delivery,
    /// current line items. The order id doubles as the idempotency key.
    async fn build_request(&self, order: &order::Model) -> Result<ShipmentRequest, ServiceError> {
        let vendor_id = order.vendor_id.ok_or_else(|| {
            ServiceError::InternalError(format!("order {} lost its vendor assignment", order.id))
        })?;
        let vendor = vendor::Entity::find_by_id(vendor_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| {
                ServiceError::InternalError(format!("vendor {vendor_id} missing from catalog"))
            })?;
        let employee = employee::Entity::find_by_id(order.employee_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "employee {} missing from catalog",
                    order.employee_id
                ))
            })?;

        let items = order_item::Entity::find()
            .filter(order_item::Column::OrderId.eq(order.id))
            .all(&*self.db_pool)
            .await?;

        let mut shipment_items = Vec::with_capacity(items.len());
        let mut total_units = 0i32;
        for item in items {
            let product = product::Entity::find_by_id(item.product_id)
                .one(&*self.db_pool)
                .await?;
            let (name, sku) = product
                .map(|p| (p.name, p.sku))
                .unwrap_or_else(|| ("unknown".to_string(), item.product_id.to_string()));
            total_units += item.quantity;
            shipment_items.push(ShipmentItem {
                name,
                sku,
                units: item.quantity,
                unit_price: item.unit_price,
            });
        }

        Ok(ShipmentRequest {
            reference: order.id.to_string(),
            pr_number: order.pr_number.clone(),
            pickup: Address {
                name: vendor.name,
                line1: vendor.pickup_address,
                city: vendor.pickup_city,
                state: vendor.pickup_state,
                pincode: vendor.pickup_pincode,
                phone: vendor.contact_phone,
            },
            delivery: Address {
                name: employee.name,
                line1: employee.shipping_address,
                city: employee.city,
                state: employee.state,
                pincode: employee.pincode,
                phone: employee.phone,
            },
            items: shipment_items,
            weight_kg: f64::from(total_units.max(1)) * ITEM_WEIGHT_KG,
        })
    }

    async fn persist_created(
        &self,
        order: &order::Model,
        resolved: &ResolvedProvider,
        provider_reference: String,
        tracking_number: Option<String>,
    ) -> Result<shipment::Model, ServiceError> {
        let now = Utc::now();
        let model = shipment::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            pr_number: Set(order.pr_number.clone()),
            shipment_mode: Set(ShipmentMode::Api),
            provider_id: Set(Some(resolved.provider_id)),
            provider_reference: Set(Some(provider_reference)),
            tracking_number: Set(tracking_number),
            status: Set(ShipmentStatus::Created),
            failure_reason: Set(None),
            courier_awb: Set(None),
            awb_number: Set(None),
            shipment_number: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db_pool)
        .await?;
        info!(shipment_id = %model.id, awb_assigned = model.tracking_number.is_some(), "shipment created");
        Ok(model)
    }

    async fn persist_failed(
        &self,
        order: &order::Model,
        resolved: &ResolvedProvider,
        err: &ServiceError,
    ) -> Result<shipment::Model, ServiceError> {
        let now = Utc::now();
        Ok(shipment::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            pr_number: Set(order.pr_number.clone()),
            shipment_mode: Set(ShipmentMode::Api),
            provider_id: Set(Some(resolved.provider_id)),
            provider_reference: Set(None),
            tracking_number: Set(None),
            status: Set(ShipmentStatus::Failed),
            failure_reason: Set(Some(err.to_string())),
            courier_awb: Set(None),
            awb_number: Set(None),
            shipment_number: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db_pool)
        .await?)
    }

    async fn apply_update(
        &self,
        shipment: shipment::Model,
        update: TrackingUpdate,
    ) -> Result<TrackingSnapshot, ServiceError> {
        let current = shipment.status;
        // Only an explicit carrier cancellation may move status backwards;
        // a late-arriving earlier status is dropped.
        let next_status = if update.status == ShipmentStatus::Cancelled
            || update.status.rank() > current.rank()
        {
            update.status
        } else {
            current
        };

        let stored_tracking = shipment.resolve_tracking_number();
        let next_tracking = match &update.tracking_number {
            // "Not yet assigned" is a valid intermediate; keep what we have
            // and let the caller re-poll.
            None => stored_tracking.clone(),
            Some(t) => Some(t.clone()),
        };

        let changed = next_status != current || next_tracking != stored_tracking;
        if changed {
            let mut am = shipment::ActiveModel {
                id: Set(shipment.id),
                ..Default::default()
            };
            am.tracking_number = Set(next_tracking.clone());
            am.status = Set(next_status);
            am.updated_at = Set(Utc::now());

            // Write only if the row still carries the status this
            // reconcile observed; a racing reconcile that committed a
            // fresher status in between must not be overwritten with
            // our now-stale view.
            let result = shipment::Entity::update_many()
                .set(am)
                .filter(shipment::Column::Id.eq(shipment.id))
                .filter(shipment::Column::Status.eq(current))
                .exec(&*self.db_pool)
                .await?;
            if result.rows_affected == 0 {
                let latest = self.get_shipment(shipment.id).await?;
                return Ok(TrackingSnapshot {
                    tracking_number: latest.resolve_tracking_number(),
                    status: latest.status,
                });
            }

            info!(shipment_id = %shipment.id, status = %next_status, "tracking reconciled");
            self.event_sender
                .send_or_log(Event::ShipmentTrackingUpdated {
                    shipment_id: shipment.id,
                    status: next_status.to_string(),
                })
                .await;
        }

        Ok(TrackingSnapshot {
            tracking_number: next_tracking,
            status: next_status,
        })
    }
}
