use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Delivery zone keyed by an inclusive pincode range. Pincodes are 6-digit
/// strings and ranges compare lexicographically, which for fixed-width
/// numeric strings matches numeric order.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "delivery_zones")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub pincode_start: String,
    pub pincode_end: String,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub delivery_charge: Decimal,
    pub is_serviceable: bool,
    pub estimated_days: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    pub fn covers(&self, pincode: &str) -> bool {
        self.pincode_start.as_str() <= pincode && pincode <= self.pincode_end.as_str()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
