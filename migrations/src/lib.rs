pub use sea_orm_migration::prelude::*;

mod m20250512_000001_create_account_tables;
mod m20250512_000002_create_catalog_tables;
mod m20250512_000003_create_stock_entries_table;
mod m20250512_000004_create_cart_tables;
mod m20250512_000005_create_coupon_tables;
mod m20250512_000006_create_delivery_zones_table;
mod m20250512_000007_create_order_tables;
mod m20250609_000008_add_storefront_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250512_000001_create_account_tables::Migration),
            Box::new(m20250512_000002_create_catalog_tables::Migration),
            Box::new(m20250512_000003_create_stock_entries_table::Migration),
            Box::new(m20250512_000004_create_cart_tables::Migration),
            Box::new(m20250512_000005_create_coupon_tables::Migration),
            Box::new(m20250512_000006_create_delivery_zones_table::Migration),
            Box::new(m20250512_000007_create_order_tables::Migration),
            Box::new(m20250609_000008_add_storefront_indexes::Migration),
        ]
    }
}
