use crate::{
    commands::Command,
    db::DbPool,
    entities::order::{self, OrderStatus, PrStatus},
    errors::ServiceError,
    events::{Event, EventSender},
    identity::{Approver, ApproverRole},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Advance an order through its next approval gate.
///
/// Valid only from the `PENDING_*` state matching the approver's role. The
/// first approval in a chain assigns the PR number; later gates reuse it.
/// Clearing the final gate issues the purchase order in the same
/// transaction. The transition itself is an atomic conditional update, so a
/// concurrent approval that got there first surfaces as a stale-state
/// conflict rather than a double advance.
#[derive(Debug)]
pub struct ApproveOrderCommand {
    pub order_id: Uuid,
    pub approver: Approver,
    pub pr_number: Option<String>,
    pub pr_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalOutcome {
    pub order_id: Uuid,
    pub new_pr_status: PrStatus,
    pub pr_number: String,
    pub purchase_order_id: Option<Uuid>,
}

#[async_trait]
impl Command for ApproveOrderCommand {
    type Result = ApprovalOutcome;

    #[instrument(skip(self, db_pool, event_sender), fields(order_id = %self.order_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let order = order::Entity::find_by_id(self.order_id)
            .one(&*db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("order {} not found", self.order_id)))?;

        if order.pr_status.is_terminal() {
            return Err(ServiceError::StateConflict(format!(
                "order {} is already {}",
                order.id, order.pr_status
            )));
        }

        let expected = match self.approver.role {
            ApproverRole::SiteAdmin => PrStatus::PendingSiteAdminApproval,
            ApproverRole::CompanyAdmin => PrStatus::PendingCompanyAdminApproval,
        };
        if order.pr_status != expected {
            return Err(ServiceError::StateConflict(format!(
                "invalid transition: order {} is {}, {:?} approval expects {}",
                order.id, order.pr_status, self.approver.role, expected
            )));
        }

        self.check_scope(&db_pool, &order).await?;

        // Later gates never re-assign the PR number.
        let (pr_number, pr_date) = match &order.pr_number {
            Some(existing) => {
                if self.pr_number.as_deref().is_some_and(|n| n != existing) {
                    debug!(order_id = %order.id, existing = %existing, "ignoring replacement PR number on later gate");
                }
                (existing.clone(), order.pr_date.unwrap_or_else(Utc::now))
            }
            None => (
                self.pr_number.clone().unwrap_or_else(super::generate_pr_number),
                self.pr_date.unwrap_or_else(Utc::now),
            ),
        };

        let next = match (expected, order.requires_company_admin_approval) {
            (PrStatus::PendingSiteAdminApproval, true) => PrStatus::PendingCompanyAdminApproval,
            (PrStatus::PendingSiteAdminApproval, false) => PrStatus::SiteAdminApproved,
            _ => PrStatus::CompanyAdminApproved,
        };
        let final_gate = !next.is_pending();

        let txn = db_pool.begin().await?;

        let mut am = order::ActiveModel {
            id: Set(order.id),
            ..Default::default()
        };
        am.pr_status = Set(next);
        am.pr_number = Set(Some(pr_number.clone()));
        am.pr_date = Set(Some(pr_date));
        am.updated_at = Set(Utc::now());
        if final_gate {
            am.status = Set(OrderStatus::AwaitingFulfilment);
        }

        // Transition only if the state still matches the precondition.
        let result = order::Entity::update_many()
            .set(am)
            .filter(order::Column::Id.eq(order.id))
            .filter(order::Column::PrStatus.eq(expected))
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::StateConflict(format!(
                "stale approval state: order {} moved past {} concurrently",
                order.id, expected
            )));
        }

        let purchase_order_id = if final_gate {
            let approved = order::Model {
                pr_status: next,
                status: OrderStatus::AwaitingFulfilment,
                pr_number: Some(pr_number.clone()),
                ..order.clone()
            };
            Some(super::issue_purchase_order(&txn, &approved).await?.id)
        } else {
            None
        };

        txn.commit().await?;

        info!(order_id = %order.id, from = %expected, to = %next, "approval gate cleared");
        event_sender
            .send_or_log(Event::OrderApproved {
                order_id: order.id,
                new_pr_status: next.to_string(),
            })
            .await;
        if let Some(po_id) = purchase_order_id {
            event_sender
                .send_or_log(Event::PurchaseOrderIssued {
                    purchase_order_id: po_id,
                    order_id: order.id,
                })
                .await;
        }

        Ok(ApprovalOutcome {
            order_id: order.id,
            new_pr_status: next,
            pr_number,
            purchase_order_id,
        })
    }
}

impl ApproveOrderCommand {
    /// Approvers act only inside their scope, compared by canonical ids.
    async fn check_scope(&self, db: &DbPool, order: &order::Model) -> Result<(), ServiceError> {
        match self.approver.role {
            ApproverRole::SiteAdmin => {
                let managed =
                    crate::identity::site_admin_locations(db, self.approver.id).await?;
                if !managed.contains(&order.location_id) {
                    return Err(ServiceError::Forbidden(format!(
                        "site admin {} does not manage location {}",
                        self.approver.id, order.location_id
                    )));
                }
            }
            ApproverRole::CompanyAdmin => {
                let company_id = self.approver.company_id()?;
                if company_id != order.company_id {
                    return Err(ServiceError::Forbidden(format!(
                        "company admin {} belongs to a different company than order {}",
                        self.approver.id, order.id
                    )));
                }
            }
        }
        Ok(())
    }
}
