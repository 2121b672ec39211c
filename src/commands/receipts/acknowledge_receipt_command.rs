use crate::{
    commands::Command,
    db::DbPool,
    entities::goods_receipt::{self, GrnStatus},
    entities::order::{self, OrderStatus, PrStatus},
    entities::purchase_order::{self, PurchaseOrderStatus},
    errors::ServiceError,
    events::{Event, EventSender},
};
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, SqlErr, TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Record goods-receipt confirmation for a purchase order and mark it
/// complete, closing the originating order.
///
/// Idempotent: re-acknowledging an already approved GRN returns the
/// existing record untouched. Legacy rows stuck in `Acknowledged` (from the
/// old acknowledgment-only workflow) are promoted to `Approved` rather than
/// duplicated.
#[derive(Debug)]
pub struct AcknowledgeReceiptCommand {
    pub purchase_order_id: Uuid,
    pub acknowledger_id: Uuid,
}

#[async_trait]
impl Command for AcknowledgeReceiptCommand {
    type Result = goods_receipt::Model;

    #[instrument(skip(self, db_pool, event_sender), fields(purchase_order_id = %self.purchase_order_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let po = purchase_order::Entity::find_by_id(self.purchase_order_id)
            .one(&*db_pool)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "purchase order {} not found",
                    self.purchase_order_id
                ))
            })?;

        if po.status == PurchaseOrderStatus::Cancelled {
            return Err(ServiceError::StateConflict(format!(
                "purchase order {} is cancelled and cannot receive goods",
                po.id
            )));
        }

        let existing = goods_receipt::Entity::find()
            .filter(goods_receipt::Column::PurchaseOrderId.eq(po.id))
            .one(&*db_pool)
            .await?;

        if let Some(grn) = &existing {
            if grn.status == GrnStatus::Approved {
                // Already closed; acknowledging again is a no-op.
                return Ok(grn.clone());
            }
        }

        let txn = db_pool.begin().await?;
        let now = Utc::now();

        let grn = match existing {
            Some(grn) => {
                let mut am: goods_receipt::ActiveModel = grn.into();
                am.status = Set(GrnStatus::Approved);
                am.acknowledged_by = Set(self.acknowledger_id);
                am.acknowledged_at = Set(now);
                am.update(&txn).await?
            }
            None => {
                let inserted = goods_receipt::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    purchase_order_id: Set(po.id),
                    status: Set(GrnStatus::Approved),
                    acknowledged_by: Set(self.acknowledger_id),
                    acknowledged_at: Set(now),
                }
                .insert(&txn)
                .await;
                match inserted {
                    Ok(grn) => grn,
                    // A concurrent acknowledgement won the insert; the
                    // unique index on purchase_order_id turned ours into
                    // a conflict. Return the winner's receipt.
                    Err(err)
                        if matches!(
                            err.sql_err(),
                            Some(SqlErr::UniqueConstraintViolation(_))
                        ) =>
                    {
                        txn.rollback().await?;
                        return goods_receipt::Entity::find()
                            .filter(goods_receipt::Column::PurchaseOrderId.eq(po.id))
                            .one(&*db_pool)
                            .await?
                            .ok_or_else(|| {
                                ServiceError::StateConflict(format!(
                                    "purchase order {} was acknowledged concurrently; retry",
                                    po.id
                                ))
                            });
                    }
                    Err(err) => return Err(err.into()),
                }
            }
        };

        let mut po_am: purchase_order::ActiveModel = po.clone().into();
        po_am.status = Set(PurchaseOrderStatus::Completed);
        po_am.update(&txn).await?;

        // Close the loop on the originating sub-order.
        let mut order_am = order::ActiveModel {
            id: Set(po.order_id),
            ..Default::default()
        };
        order_am.status = Set(OrderStatus::Fulfilled);
        order_am.pr_status = Set(PrStatus::Fulfilled);
        order_am.updated_at = Set(now);
        order::Entity::update_many()
            .set(order_am)
            .filter(order::Column::Id.eq(po.order_id))
            .filter(order::Column::PrStatus.ne(PrStatus::Rejected))
            .exec(&txn)
            .await?;

        txn.commit().await?;

        info!(purchase_order_id = %po.id, grn_id = %grn.id, "goods receipt approved, purchase order completed");
        event_sender
            .send_or_log(Event::GoodsReceiptAcknowledged {
                goods_receipt_id: grn.id,
                purchase_order_id: po.id,
            })
            .await;

        Ok(grn)
    }
}
