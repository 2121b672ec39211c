use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse order lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum OrderStatus {
    #[sea_orm(string_value = "AWAITING_APPROVAL")]
    AwaitingApproval,

    #[sea_orm(string_value = "AWAITING_FULFILMENT")]
    AwaitingFulfilment,

    #[sea_orm(string_value = "FULFILLED")]
    Fulfilled,

    #[sea_orm(string_value = "CANCELLED")]
    Cancelled,

    /// Parent cart orders only: the order has been partitioned into
    /// per-vendor sub-orders and is no longer directly fulfillable.
    #[sea_orm(string_value = "SPLIT")]
    Split,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::AwaitingApproval => write!(f, "Awaiting approval"),
            OrderStatus::AwaitingFulfilment => write!(f, "Awaiting fulfilment"),
            OrderStatus::Fulfilled => write!(f, "Fulfilled"),
            OrderStatus::Cancelled => write!(f, "Cancelled"),
            OrderStatus::Split => write!(f, "Split"),
        }
    }
}

/// Fine-grained approval state. Single source of truth for an order's
/// position in the approval chain; mutated only via conditional updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum PrStatus {
    #[sea_orm(string_value = "PENDING_SITE_ADMIN_APPROVAL")]
    PendingSiteAdminApproval,

    #[sea_orm(string_value = "SITE_ADMIN_APPROVED")]
    SiteAdminApproved,

    #[sea_orm(string_value = "PENDING_COMPANY_ADMIN_APPROVAL")]
    PendingCompanyAdminApproval,

    #[sea_orm(string_value = "COMPANY_ADMIN_APPROVED")]
    CompanyAdminApproved,

    /// Both approval flags disabled; the order bypassed the chain.
    #[sea_orm(string_value = "NOT_REQUIRED")]
    NotRequired,

    #[sea_orm(string_value = "FULFILLED")]
    Fulfilled,

    #[sea_orm(string_value = "REJECTED")]
    Rejected,
}

impl PrStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PrStatus::Fulfilled | PrStatus::Rejected)
    }

    /// True while the order sits at a gate waiting for an approver.
    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            PrStatus::PendingSiteAdminApproval | PrStatus::PendingCompanyAdminApproval
        )
    }
}

impl fmt::Display for PrStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PrStatus::PendingSiteAdminApproval => "PENDING_SITE_ADMIN_APPROVAL",
            PrStatus::SiteAdminApproved => "SITE_ADMIN_APPROVED",
            PrStatus::PendingCompanyAdminApproval => "PENDING_COMPANY_ADMIN_APPROVAL",
            PrStatus::CompanyAdminApproved => "COMPANY_ADMIN_APPROVED",
            PrStatus::NotRequired => "NOT_REQUIRED",
            PrStatus::Fulfilled => "FULFILLED",
            PrStatus::Rejected => "REJECTED",
        };
        write!(f, "{s}")
    }
}

/// An employee uniform order. Parent cart orders have `parent_order_id`
/// unset; vendor sub-orders produced by the splitter reference their parent
/// and carry the vendor they are dispatched to.
///
/// `requires_*` columns are the company's ApprovalPolicy snapshot taken at
/// split time, so in-flight approvals never consult the live policy.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub order_number: String,
    pub employee_id: Uuid,
    pub company_id: Uuid,
    pub location_id: Uuid,
    pub parent_order_id: Option<Uuid>,
    pub vendor_id: Option<Uuid>,
    pub status: OrderStatus,
    pub pr_status: PrStatus,
    pub pr_number: Option<String>,
    pub pr_date: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub requires_site_admin_approval: bool,
    pub requires_company_admin_approval: bool,
    pub total_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItems,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
