use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How the shipment was dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum ShipmentMode {
    /// Created through an integrated provider; participates in reconciliation.
    #[sea_orm(string_value = "API")]
    Api,

    /// Operator-entered; its tracking number is already canonical and it
    /// never participates in reconciliation.
    #[sea_orm(string_value = "MANUAL")]
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum ShipmentStatus {
    #[sea_orm(string_value = "CREATED")]
    Created,

    #[sea_orm(string_value = "PICKED_UP")]
    PickedUp,

    #[sea_orm(string_value = "IN_TRANSIT")]
    InTransit,

    #[sea_orm(string_value = "DELIVERED")]
    Delivered,

    #[sea_orm(string_value = "FAILED")]
    Failed,

    #[sea_orm(string_value = "CANCELLED")]
    Cancelled,
}

impl ShipmentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ShipmentStatus::Delivered | ShipmentStatus::Failed | ShipmentStatus::Cancelled
        )
    }

    /// Position along the forward delivery progression. Carriers do not
    /// guarantee ordered delivery of status updates, so reconciliation only
    /// applies a status with a higher rank, or an explicit Cancelled.
    pub fn rank(&self) -> u8 {
        match self {
            ShipmentStatus::Created => 0,
            ShipmentStatus::PickedUp => 1,
            ShipmentStatus::InTransit => 2,
            ShipmentStatus::Delivered => 3,
            ShipmentStatus::Failed => 4,
            ShipmentStatus::Cancelled => 4,
        }
    }
}

impl fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ShipmentStatus::Created => "CREATED",
            ShipmentStatus::PickedUp => "PICKED_UP",
            ShipmentStatus::InTransit => "IN_TRANSIT",
            ShipmentStatus::Delivered => "DELIVERED",
            ShipmentStatus::Failed => "FAILED",
            ShipmentStatus::Cancelled => "CANCELLED",
        };
        write!(f, "{s}")
    }
}

/// One shipment per vendor fulfillment unit.
///
/// `tracking_number` is the single canonical tracking field. The legacy
/// columns below it are migration artifacts from the previous system, where
/// three differently-named AWB fields drifted apart; they are read exactly
/// once, at load time, through [`Model::resolve_tracking_number`], and are
/// never written by new code.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "shipments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub order_id: Uuid,
    pub pr_number: Option<String>,
    pub shipment_mode: ShipmentMode,
    pub provider_id: Option<Uuid>,
    /// The provider's opaque reference for this shipment.
    pub provider_reference: Option<String>,
    /// Canonical AWB / tracking number.
    pub tracking_number: Option<String>,
    pub status: ShipmentStatus,
    pub failure_reason: Option<String>,
    // Legacy duplicate AWB columns. Technical debt: kept only so pre-rewrite
    // rows remain readable. See resolve_tracking_number.
    pub courier_awb: Option<String>,
    pub awb_number: Option<String>,
    pub shipment_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Carriers routinely hand back empty-string AWBs; an empty value must not
// shadow a populated fallback field.
fn non_empty(value: &Option<String>) -> Option<String> {
    value.clone().filter(|s| !s.is_empty())
}

impl Model {
    /// Collapse the canonical field and the legacy duplicates into one
    /// tracking number. The only place legacy AWB columns are consulted.
    pub fn resolve_tracking_number(&self) -> Option<String> {
        non_empty(&self.tracking_number)
            .or_else(|| non_empty(&self.courier_awb))
            .or_else(|| non_empty(&self.awb_number))
            .or_else(|| non_empty(&self.shipment_number))
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn shipment(canonical: Option<&str>, legacy_awb: Option<&str>) -> Model {
        Model {
            id: Uuid::new_v4(),
            order_id: Uuid::new_v4(),
            pr_number: None,
            shipment_mode: ShipmentMode::Api,
            provider_id: None,
            provider_reference: None,
            tracking_number: canonical.map(str::to_string),
            status: ShipmentStatus::Created,
            failure_reason: None,
            courier_awb: legacy_awb.map(str::to_string),
            awb_number: None,
            shipment_number: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn canonical_field_wins_over_legacy_columns() {
        let s = shipment(Some("AWB-1"), Some("AWB-legacy"));
        assert_eq!(s.resolve_tracking_number().as_deref(), Some("AWB-1"));
    }

    #[test]
    fn legacy_column_is_used_only_when_canonical_is_absent() {
        let s = shipment(None, Some("AWB-legacy"));
        assert_eq!(s.resolve_tracking_number().as_deref(), Some("AWB-legacy"));
        assert_eq!(shipment(None, None).resolve_tracking_number(), None);
    }

    #[test]
    fn empty_canonical_value_does_not_shadow_a_populated_legacy_column() {
        let s = shipment(Some(""), Some("AWB-LEGACY-7"));
        assert_eq!(s.resolve_tracking_number().as_deref(), Some("AWB-LEGACY-7"));

        let mut s = shipment(Some(""), Some(""));
        s.awb_number = Some("AWB-DEEP-3".to_string());
        assert_eq!(s.resolve_tracking_number().as_deref(), Some("AWB-DEEP-3"));
    }

    #[test]
    fn status_never_ranks_backwards() {
        assert!(ShipmentStatus::InTransit.rank() > ShipmentStatus::PickedUp.rank());
        assert!(ShipmentStatus::Delivered.is_terminal());
        assert!(!ShipmentStatus::InTransit.is_terminal());
    }
}
