use crate::{
    commands::Command,
    db::DbPool,
    entities::order::{self, OrderStatus, PrStatus},
    errors::ServiceError,
    events::{Event, EventSender},
    identity::{Approver, ApproverRole},
};
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, Set};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Reject an order at any non-terminal approval state.
///
/// Rejection is the cancellation mechanism: it is final (a new order must
/// be created to resubmit) and it blocks any later shipment creation via
/// the approval-state precondition, not caller discipline.
#[derive(Debug)]
pub struct RejectOrderCommand {
    pub order_id: Uuid,
    pub approver: Approver,
    pub reason: String,
}

#[async_trait]
impl Command for RejectOrderCommand {
    type Result = PrStatus;

    #[instrument(skip(self, db_pool, event_sender), fields(order_id = %self.order_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        if self.reason.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "a rejection reason is required".into(),
            ));
        }

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

        self.check_scope(&db_pool, &order).await?;

        let mut am = order::ActiveModel {
            id: Set(order.id),
            ..Default::default()
        };
        am.pr_status = Set(PrStatus::Rejected);
        am.status = Set(OrderStatus::Cancelled);
        am.rejection_reason = Set(Some(self.reason.clone()));
        am.updated_at = Set(Utc::now());

        // Conditional on the state we observed, so a racing approval and
        // rejection cannot both claim the transition.
        let result = order::Entity::update_many()
            .set(am)
            .filter(order::Column::Id.eq(order.id))
            .filter(order::Column::PrStatus.eq(order.pr_status))
            .exec(&*db_pool)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::StateConflict(format!(
                "stale approval state: order {} changed concurrently",
                order.id
            )));
        }

        info!(order_id = %order.id, "order rejected");
        event_sender
            .send_or_log(Event::OrderRejected { order_id: order.id })
            .await;

        Ok(PrStatus::Rejected)
    }
}

impl RejectOrderCommand {
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
                if self.approver.company_id()? != order.company_id {
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
