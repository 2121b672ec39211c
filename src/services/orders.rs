use crate::{
    commands::orders::{
        ApprovalOutcome, ApproveOrderCommand, RejectOrderCommand, SplitOrderCommand,
    },
    commands::Command,
    db::DbPool,
    entities::order::{self, PrStatus},
    errors::ServiceError,
    events::EventSender,
    identity::{resolve_scope, Approver, ApproverScope},
};
use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Facade over the order lifecycle: splitting, the approval state machine,
/// and the approval queues.
#[derive(Clone)]
pub struct OrderService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl OrderService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Partition a cart order into per-vendor sub-orders.
    #[instrument(skip(self))]
    pub async fn split_order(&self, order_id: Uuid) -> Result<Vec<Uuid>, ServiceError> {
        SplitOrderCommand { order_id }
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    #[instrument(skip(self))]
    pub async fn approve(
        &self,
        order_id: Uuid,
        approver: Approver,
        pr_number: Option<String>,
        pr_date: Option<DateTime<Utc>>,
    ) -> Result<ApprovalOutcome, ServiceError> {
        ApproveOrderCommand {
            order_id,
            approver,
            pr_number,
            pr_date,
        }
        .execute(self.db_pool.clone(), self.event_sender.clone())
        .await
    }

    #[instrument(skip(self))]
    pub async fn reject(
        &self,
        order_id: Uuid,
        approver: Approver,
        reason: String,
    ) -> Result<PrStatus, ServiceError> {
        RejectOrderCommand {
            order_id,
            approver,
            reason,
        }
        .execute(self.db_pool.clone(), self.event_sender.clone())
        .await
    }

    /// Orders waiting on this approver, filtered by exact gate state plus
    /// canonical-id scope. Under-showing is preferred to over-showing: a
    /// state that does not match the approver's gate is never listed.
    #[instrument(skip(self))]
    pub async fn list_pending_approvals(
        &self,
        approver: &Approver,
    ) -> Result<Vec<order::Model>, ServiceError> {
        let scope = resolve_scope(&self.db_pool, approver).await?;

        let query = match scope {
            ApproverScope::SiteAdmin { location_ids } => {
                if location_ids.is_empty() {
                    return Ok(Vec::new());
                }
                order::Entity::find()
                    .filter(order::Column::PrStatus.eq(PrStatus::PendingSiteAdminApproval))
                    .filter(order::Column::LocationId.is_in(location_ids))
            }
            ApproverScope::CompanyAdmin { company_id } => order::Entity::find()
                .filter(order::Column::PrStatus.eq(PrStatus::PendingCompanyAdminApproval))
                .filter(order::Column::CompanyId.eq(company_id)),
        };

        Ok(query
            .order_by_asc(order::Column::CreatedAt)
            .all(&*self.db_pool)
            .await?)
    }

    pub async fn get_order(&self, order_id: Uuid) -> Result<order::Model, ServiceError> {
        order::Entity::find_by_id(order_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("order {order_id} not found")))
    }

    /// The vendor sub-orders produced by splitting `parent_order_id`.
    pub async fn list_sub_orders(
        &self,
        parent_order_id: Uuid,
    ) -> Result<Vec<order::Model>, ServiceError> {
        Ok(order::Entity::find()
            .filter(order::Column::ParentOrderId.eq(parent_order_id))
            .order_by_asc(order::Column::OrderNumber)
            .all(&*self.db_pool)
            .await?)
    }
}
