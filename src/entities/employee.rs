use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Catalog read-side: the ordering employee and their delivery address.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "employees")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub company_id: Uuid,
    pub location_id: Uuid,
    pub name: String,
    pub shipping_address: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
    pub phone: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
