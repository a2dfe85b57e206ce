use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "client_inventories")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub customer_id: Uuid,
    #[sea_orm(unique)]
    pub client_product_id: Uuid,
    /// Never negative.
    pub current_stock: i32,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::client_product::Entity",
        from = "Column::ClientProductId",
        to = "super::client_product::Column::Id"
    )]
    ClientProduct,
    #[sea_orm(has_many = "super::client_inventory_movement::Entity")]
    Movement,
}

impl Related<super::client_product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ClientProduct.def()
    }
}

impl Related<super::client_inventory_movement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Movement.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
