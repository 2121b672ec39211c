use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Identity read-side: which locations a site admin manages. Both columns
/// are canonical record ids; approval-queue scoping joins on these and
/// nothing else.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "site_admin_locations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub admin_id: Uuid,
    #[sea_orm(primary_key, auto_increment = false)]
    pub location_id: Uuid,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
