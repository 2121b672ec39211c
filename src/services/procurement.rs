use crate::{
    commands::receipts::AcknowledgeReceiptCommand,
    commands::Command,
    db::DbPool,
    entities::{goods_receipt, purchase_order},
    errors::ServiceError,
    events::EventSender,
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Read and acknowledge side of the PR/PO/GRN cycle. Purchase orders are
/// only ever created by the order state machine; this service closes them.
#[derive(Clone)]
pub struct ProcurementService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl ProcurementService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Vendor-side confirmation that goods were dispatched. Idempotent.
    #[instrument(skip(self))]
    pub async fn acknowledge_receipt(
        &self,
        purchase_order_id: Uuid,
        acknowledger_id: Uuid,
    ) -> Result<goods_receipt::Model, ServiceError> {
        AcknowledgeReceiptCommand {
            purchase_order_id,
            acknowledger_id,
        }
        .execute(self.db_pool.clone(), self.event_sender.clone())
        .await
    }

    pub async fn get_purchase_order(
        &self,
        purchase_order_id: Uuid,
    ) -> Result<purchase_order::Model, ServiceError> {
        purchase_order::Entity::find_by_id(purchase_order_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("purchase order {purchase_order_id} not found"))
            })
    }

    pub async fn get_purchase_order_for_order(
        &self,
        order_id: Uuid,
    ) -> Result<purchase_order::Model, ServiceError> {
        purchase_order::Entity::find()
            .filter(purchase_order::Column::OrderId.eq(order_id))
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("no purchase order issued for order {order_id}"))
            })
    }

    pub async fn get_goods_receipt(
        &self,
        purchase_order_id: Uuid,
    ) -> Result<goods_receipt::Model, ServiceError> {
        goods_receipt::Entity::find()
            .filter(goods_receipt::Column::PurchaseOrderId.eq(purchase_order_id))
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "no goods receipt for purchase order {purchase_order_id}"
                ))
            })
    }
}
