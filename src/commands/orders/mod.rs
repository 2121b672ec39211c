pub mod approve_order_command;
pub mod reject_order_command;
pub mod split_order_command;

pub use approve_order_command::{ApprovalOutcome, ApproveOrderCommand};
pub use reject_order_command::RejectOrderCommand;
pub use split_order_command::SplitOrderCommand;

use crate::entities::purchase_order::{self, PurchaseOrderStatus};
use crate::entities::{approval_policy, order};
use crate::errors::ServiceError;
use chrono::Utc;
use rand::Rng;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set};
use uuid::Uuid;

/// Issue the purchase order for a fully approved (or approval-bypassed)
/// sub-order. Runs inside the caller's transaction.
pub(crate) async fn issue_purchase_order<C: ConnectionTrait>(
    conn: &C,
    order: &order::Model,
) -> Result<purchase_order::Model, ServiceError> {
    let vendor_id = order.vendor_id.ok_or_else(|| {
        ServiceError::InternalError(format!(
            "order {} has no vendor; purchase orders are issued per vendor sub-order",
            order.id
        ))
    })?;

    let po = purchase_order::ActiveModel {
        id: Set(Uuid::new_v4()),
        po_number: Set(generate_po_number()),
        order_id: Set(order.id),
        vendor_id: Set(vendor_id),
        company_id: Set(order.company_id),
        status: Set(PurchaseOrderStatus::Open),
        issued_at: Set(Utc::now()),
    };
    Ok(po.insert(conn).await?)
}

/// Compute a sub-order's initial approval state from the company policy
/// snapshot. Called exactly once per sub-order, at split time.
pub(crate) fn initial_pr_status(policy: &approval_policy::Model) -> order::PrStatus {
    if !policy.pr_enabled || (!policy.site_admin_approval && !policy.company_admin_approval) {
        order::PrStatus::NotRequired
    } else if policy.site_admin_approval {
        order::PrStatus::PendingSiteAdminApproval
    } else {
        order::PrStatus::PendingCompanyAdminApproval
    }
}

pub(crate) fn generate_pr_number() -> String {
    format!(
        "PR-{}-{:06}",
        Utc::now().format("%Y%m%d"),
        rand::thread_rng().gen_range(0..=999_999u32)
    )
}

pub(crate) fn generate_po_number() -> String {
    format!(
        "PO-{}-{:06}",
        Utc::now().format("%Y%m%d"),
        rand::thread_rng().gen_range(0..=999_999u32)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(pr: bool, site: bool, company: bool) -> approval_policy::Model {
        approval_policy::Model {
            company_id: Uuid::new_v4(),
            pr_enabled: pr,
            site_admin_approval: site,
            company_admin_approval: company,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn disabled_workflow_bypasses_the_chain() {
        assert_eq!(
            initial_pr_status(&policy(false, true, true)),
            order::PrStatus::NotRequired
        );
        assert_eq!(
            initial_pr_status(&policy(true, false, false)),
            order::PrStatus::NotRequired
        );
    }

    #[test]
    fn site_admin_gate_comes_first_when_required() {
        assert_eq!(
            initial_pr_status(&policy(true, true, true)),
            order::PrStatus::PendingSiteAdminApproval
        );
        assert_eq!(
            initial_pr_status(&policy(true, true, false)),
            order::PrStatus::PendingSiteAdminApproval
        );
        assert_eq!(
            initial_pr_status(&policy(true, false, true)),
            order::PrStatus::PendingCompanyAdminApproval
        );
    }
}
