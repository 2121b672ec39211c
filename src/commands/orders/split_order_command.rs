use crate::{
    commands::Command,
    db::DbPool,
    entities::order::{self, OrderStatus, PrStatus},
    entities::{approval_policy, order_item, product, vendor},
    errors::ServiceError,
    events::{Event, EventSender},
};
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, TransactionTrait,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Partition a submitted cart order into one sub-order per vendor.
///
/// All-or-nothing: an item with no resolvable vendor for the employee's
/// company fails the whole split and persists nothing. Sub-order line
/// prices are re-read from the current product price, not the price the
/// cart displayed, and the initial approval state is computed here from the
/// company's policy snapshot.
#[derive(Debug)]
pub struct SplitOrderCommand {
    pub order_id: Uuid,
}

#[async_trait]
impl Command for SplitOrderCommand {
    type Result = Vec<Uuid>;

    #[instrument(skip(self, db_pool, event_sender), fields(order_id = %self.order_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let parent = order::Entity::find_by_id(self.order_id)
            .one(&*db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("order {} not found", self.order_id)))?;

        if parent.parent_order_id.is_some() {
            return Err(ServiceError::ValidationError(format!(
                "order {} is itself a vendor sub-order and cannot be split",
                parent.id
            )));
        }
        match parent.status {
            OrderStatus::AwaitingApproval => {}
            OrderStatus::Split => {
                return Err(ServiceError::StateConflict(format!(
                    "order {} has already been split",
                    parent.id
                )))
            }
            other => {
                return Err(ServiceError::StateConflict(format!(
                    "order {} is {other} and cannot be split",
                    parent.id
                )))
            }
        }

        let items = order_item::Entity::find()
            .filter(order_item::Column::OrderId.eq(parent.id))
            .all(&*db_pool)
            .await?;
        if items.is_empty() {
            return Err(ServiceError::ValidationError(format!(
                "order {} has no line items",
                parent.id
            )));
        }

        let policy = approval_policy::Entity::find_by_id(parent.company_id)
            .one(&*db_pool)
            .await?
            .unwrap_or(approval_policy::Model {
                company_id: parent.company_id,
                pr_enabled: false,
                site_admin_approval: false,
                company_admin_approval: false,
                updated_at: Utc::now(),
            });

        let groups = self.resolve_vendors(&db_pool, &parent, &items).await?;

        let sub_order_ids = self
            .persist_split(&db_pool, &parent, &policy, groups, &event_sender)
            .await?;

        info!(parent = %parent.id, count = sub_order_ids.len(), "order split into vendor sub-orders");
        event_sender
            .send_or_log(Event::OrderSplit {
                parent_order_id: parent.id,
                sub_order_ids: sub_order_ids.clone(),
            })
            .await;

        Ok(sub_order_ids)
    }
}

struct VendorGroup {
    items: Vec<(order_item::Model, product::Model)>,
}

impl SplitOrderCommand {
    /// Resolve every line item to a vendor via the product catalog, scoped
    /// to the employee's company. Any unresolvable item fails the split.
    async fn resolve_vendors(
        &self,
        db: &DbPool,
        parent: &order::Model,
        items: &[order_item::Model],
    ) -> Result<BTreeMap<Uuid, VendorGroup>, ServiceError> {
        let mut groups: BTreeMap<Uuid, VendorGroup> = BTreeMap::new();

        for item in items {
            let product = product::Entity::find_by_id(item.product_id)
                .one(db)
                .await?
                .ok_or_else(|| {
                    ServiceError::ValidationError(format!(
                        "product {} on order {} does not exist",
                        item.product_id, parent.id
                    ))
                })?;

            let vendor_id = match product.vendor_id {
                Some(v) if product.company_id == parent.company_id => v,
                _ => {
                    return Err(ServiceError::ValidationError(format!(
                        "no eligible vendor for product {} in company {}",
                        product.id, parent.company_id
                    )))
                }
            };

            // The vendor row itself must exist and belong to the company.
            let vendor_exists = vendor::Entity::find_by_id(vendor_id)
                .filter(vendor::Column::CompanyId.eq(parent.company_id))
                .one(db)
                .await?
                .is_some();
            if !vendor_exists {
                return Err(ServiceError::ValidationError(format!(
                    "no eligible vendor for product {} in company {}",
                    product.id, parent.company_id
                )));
            }

            groups
                .entry(vendor_id)
                .or_insert_with(|| VendorGroup { items: Vec::new() })
                .items
                .push((item.clone(), product));
        }

        Ok(groups)
    }

    async fn persist_split(
        &self,
        db: &DbPool,
        parent: &order::Model,
        policy: &approval_policy::Model,
        groups: BTreeMap<Uuid, VendorGroup>,
        event_sender: &EventSender,
    ) -> Result<Vec<Uuid>, ServiceError> {
        let txn = db.begin().await?;
        let now = Utc::now();
        let initial = super::initial_pr_status(policy);

        let mut sub_order_ids = Vec::with_capacity(groups.len());
        let mut issued_pos = Vec::new();

        for (seq, (vendor_id, group)) in groups.into_iter().enumerate() {
            let sub_id = Uuid::new_v4();
            let mut total = Decimal::ZERO;

            for (item, product) in &group.items {
                let unit_price = product.current_price;
                let line_total = unit_price * Decimal::from(item.quantity);
                total += line_total;

                order_item::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    order_id: Set(sub_id),
                    product_id: Set(item.product_id),
                    size: Set(item.size.clone()),
                    quantity: Set(item.quantity),
                    unit_price: Set(unit_price),
                    line_total: Set(line_total),
                }
                .insert(&txn)
                .await?;
            }

            let bypassed = initial == PrStatus::NotRequired;
            let sub_order = order::ActiveModel {
                id: Set(sub_id),
                order_number: Set(format!("{}-{}", parent.order_number, seq + 1)),
                employee_id: Set(parent.employee_id),
                company_id: Set(parent.company_id),
                location_id: Set(parent.location_id),
                parent_order_id: Set(Some(parent.id)),
                vendor_id: Set(Some(vendor_id)),
                status: Set(if bypassed {
                    OrderStatus::AwaitingFulfilment
                } else {
                    OrderStatus::AwaitingApproval
                }),
                pr_status: Set(initial),
                pr_number: Set(None),
                pr_date: Set(None),
                rejection_reason: Set(None),
                requires_site_admin_approval: Set(
                    policy.pr_enabled && policy.site_admin_approval
                ),
                requires_company_admin_approval: Set(
                    policy.pr_enabled && policy.company_admin_approval
                ),
                total_amount: Set(total),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(&txn)
            .await?;

            if bypassed {
                let po = super::issue_purchase_order(&txn, &sub_order).await?;
                issued_pos.push((po.id, sub_order.id));
            }

            sub_order_ids.push(sub_id);
        }

        // Parent becomes a container; fulfillment proceeds per sub-order.
        let mut parent_am: order::ActiveModel = parent.clone().into();
        parent_am.status = Set(OrderStatus::Split);
        parent_am.updated_at = Set(now);
        parent_am.update(&txn).await?;

        txn.commit().await?;

        for (po_id, order_id) in issued_pos {
            event_sender
                .send_or_log(Event::PurchaseOrderIssued {
                    purchase_order_id: po_id,
                    order_id,
                })
                .await;
        }

        Ok(sub_order_ids)
    }
}
