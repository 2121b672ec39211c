use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported logistics providers. Dispatch on this value happens only in
/// the provider registry; business logic never branches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum ProviderKind {
    #[sea_orm(string_value = "SHIPROCKET")]
    Shiprocket,

    /// Deterministic test double implementing the same contract.
    #[sea_orm(string_value = "MOCK")]
    Mock,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Shiprocket => write!(f, "shiprocket"),
            ProviderKind::Mock => write!(f, "mock"),
        }
    }
}

/// Per-company, per-provider sealed credential bundle. Owned by company
/// configuration; consumed read-only by the provider registry.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "provider_credentials")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub company_id: Uuid,
    pub provider: ProviderKind,
    /// Base64 payload plus integrity tag; see `providers::credentials`.
    pub sealed_payload: String,
    pub enabled: bool,
    pub is_default: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
