use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Append-only stock movement ledger. `quantity` is signed: positive for
/// goods coming in, negative for goods going out. The cached
/// `products.stock_quantity` is the sum of this ledger.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_entries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub product_id: Uuid,
    pub kind: StockEntryKind,
    pub quantity: i32,
    #[sea_orm(nullable)]
    pub reference: Option<String>,
    #[sea_orm(nullable)]
    pub recorded_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Stock movement kind enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum StockEntryKind {
    /// Goods received from a supplier
    #[sea_orm(string_value = "in")]
    In,
    /// Goods sold through checkout
    #[sea_orm(string_value = "out")]
    Out,
    /// Manual correction by an admin
    #[sea_orm(string_value = "adjustment")]
    Adjustment,
    /// Goods restored by an order cancellation
    #[sea_orm(string_value = "return")]
    Return,
}
