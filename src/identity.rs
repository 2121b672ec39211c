//! Canonical actor identity for approval operations.
//!
//! Upstream authentication is handled by the gateway and trusted; what this
//! module guards is representation. The legacy system compared an order's
//! stored actor reference against whatever form of the admin's identity the
//! caller happened to hold (string id vs. record reference), which made
//! orders silently vanish from approval queues. Here every cross-entity
//! reference is a `Uuid` and the boundary refuses anything that does not
//! parse into one, turning a silent miss into a loud error.

use crate::db::DbPool;
use crate::entities::site_admin_location;
use crate::errors::ServiceError;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApproverRole {
    SiteAdmin,
    CompanyAdmin,
}

impl ApproverRole {
    pub fn parse(raw: &str) -> Result<Self, ServiceError> {
        match raw {
            "site_admin" => Ok(ApproverRole::SiteAdmin),
            "company_admin" => Ok(ApproverRole::CompanyAdmin),
            other => Err(ServiceError::ValidationError(format!(
                "unknown approver role: {other}"
            ))),
        }
    }
}

/// An authenticated approver, normalized to canonical record ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approver {
    pub id: Uuid,
    pub role: ApproverRole,
    /// Required for company admins; the company whose orders they approve.
    pub company_id: Option<Uuid>,
}

impl Approver {
    pub fn company_id(&self) -> Result<Uuid, ServiceError> {
        self.company_id.ok_or_else(|| {
            ServiceError::ValidationError("company admin identity carries no company id".into())
        })
    }
}

/// Parse an id supplied by the identity collaborator. Anything that is not
/// a canonical `Uuid` is rejected loudly rather than compared as a string.
pub fn canonical_id(raw: &str, what: &str) -> Result<Uuid, ServiceError> {
    Uuid::parse_str(raw.trim()).map_err(|_| {
        ServiceError::ValidationError(format!("{what} is not a canonical record id: {raw:?}"))
    })
}

/// The scope an approver's pending-approval queue is filtered by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApproverScope {
    /// Site admins see only orders from locations under them.
    SiteAdmin { location_ids: Vec<Uuid> },
    /// Company admins see only orders from their company.
    CompanyAdmin { company_id: Uuid },
}

/// Resolve a site admin's managed locations from the identity read-side.
pub async fn site_admin_locations(
    db: &DbPool,
    admin_id: Uuid,
) -> Result<Vec<Uuid>, ServiceError> {
    let rows = site_admin_location::Entity::find()
        .filter(site_admin_location::Column::AdminId.eq(admin_id))
        .all(db)
        .await?;
    Ok(rows.into_iter().map(|r| r.location_id).collect())
}

/// Resolve the queue scope for an approver.
pub async fn resolve_scope(db: &DbPool, approver: &Approver) -> Result<ApproverScope, ServiceError> {
    match approver.role {
        ApproverRole::SiteAdmin => Ok(ApproverScope::SiteAdmin {
            location_ids: site_admin_locations(db, approver.id).await?,
        }),
        ApproverRole::CompanyAdmin => Ok(ApproverScope::CompanyAdmin {
            company_id: approver.company_id()?,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn non_uuid_identities_are_rejected_loudly() {
        assert_matches!(
            canonical_id("admin-42", "approver id"),
            Err(ServiceError::ValidationError(_))
        );
        assert!(canonical_id(" 550e8400-e29b-41d4-a716-446655440000 ", "approver id").is_ok());
    }

    #[test]
    fn company_admin_without_company_is_invalid() {
        let approver = Approver {
            id: Uuid::new_v4(),
            role: ApproverRole::CompanyAdmin,
            company_id: None,
        };
        assert_matches!(approver.company_id(), Err(ServiceError::ValidationError(_)));
    }
}
