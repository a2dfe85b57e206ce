use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A customer's own copy of a catalogue product, keyed by `(customer_id, source_product_id)`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "client_products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub customer_id: Uuid,
    pub source_product_id: Uuid,
    pub name: String,
    pub cost_price: Decimal,
    pub sale_price: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::client_inventory::Entity")]
    ClientInventory,
}

impl Related<super::client_inventory::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ClientInventory.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
