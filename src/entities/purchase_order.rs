use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum PurchaseOrderStatus {
    #[sea_orm(string_value = "OPEN")]
    Open,

    /// Closed by an approved goods receipt.
    #[sea_orm(string_value = "COMPLETED")]
    Completed,

    #[sea_orm(string_value = "CANCELLED")]
    Cancelled,
}

impl fmt::Display for PurchaseOrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PurchaseOrderStatus::Open => write!(f, "Open"),
            PurchaseOrderStatus::Completed => write!(f, "Completed"),
            PurchaseOrderStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// Formal order to a vendor, issued once all approval gates pass.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "purchase_orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub po_number: String,
    pub order_id: Uuid,
    pub vendor_id: Uuid,
    pub company_id: Uuid,
    pub status: PurchaseOrderStatus,
    pub issued_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::goods_receipt::Entity")]
    GoodsReceipts,
}

impl Related<super::goods_receipt::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GoodsReceipts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
