use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Catalog read-side: vendor master data, including the pickup address used
/// when building carrier payloads.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "vendors")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    pub pickup_address: String,
    pub pickup_city: String,
    pub pickup_state: String,
    pub pickup_pincode: String,
    pub contact_phone: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
