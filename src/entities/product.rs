use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::UserKind;

/// Medicine or healthcare product in the catalog.
///
/// Three price points are kept per product: the printed MRP, the retail
/// `patient_price`, and the wholesale `pharmacy_price`. `stock_quantity`
/// is a cached sum of the stock ledger, recomputed by every ledger write.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(unique)]
    pub slug: String,
    pub category_id: Uuid,
    #[sea_orm(nullable)]
    pub manufacturer_id: Option<Uuid>,
    #[sea_orm(column_type = "Text", nullable)]
    pub composition: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub prescription_required: bool,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub mrp_price: Decimal,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub patient_price: Decimal,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub pharmacy_price: Decimal,
    pub stock_quantity: i32,
    pub low_stock_threshold: i32,
    pub track_inventory: bool,
    pub is_active: bool,
    pub is_featured: bool,
    pub view_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    /// Effective unit price for a caller. Pharmacy accounts buy at the
    /// wholesale price; patients and guests pay the retail price.
    pub fn price_for(&self, kind: Option<UserKind>) -> Decimal {
        match kind {
            Some(UserKind::Pharmacy) => self.pharmacy_price,
            _ => self.patient_price,
        }
    }

    pub fn in_stock(&self) -> bool {
        !self.track_inventory || self.stock_quantity > 0
    }

    pub fn is_low_stock(&self) -> bool {
        self.track_inventory && self.stock_quantity <= self.low_stock_threshold
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id"
    )]
    Category,
    #[sea_orm(
        belongs_to = "super::manufacturer::Entity",
        from = "Column::ManufacturerId",
        to = "super::manufacturer::Column::Id"
    )]
    Manufacturer,
    #[sea_orm(has_many = "super::product_image::Entity")]
    Images,
    #[sea_orm(has_many = "super::product_review::Entity")]
    Reviews,
    #[sea_orm(has_many = "super::stock_entry::Entity")]
    StockEntries,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::manufacturer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Manufacturer.def()
    }
}

impl Related<super::product_image::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Images.def()
    }
}

impl Related<super::product_review::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reviews.def()
    }
}

impl Related<super::stock_entry::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StockEntries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
