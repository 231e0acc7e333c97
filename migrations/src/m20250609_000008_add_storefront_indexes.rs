use sea_orm_migration::prelude::*;

use crate::m20250512_000002_create_catalog_tables::Products;
use crate::m20250512_000006_create_delivery_zones_table::DeliveryZones;
use crate::m20250512_000007_create_order_tables::Orders;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Storefront listing filters
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_products_active_featured")
                    .table(Products::Table)
                    .col(Products::IsActive)
                    .col(Products::IsFeatured)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_products_name")
                    .table(Products::Table)
                    .col(Products::Name)
                    .to_owned(),
            )
            .await?;

        // Zone lookup scans the pincode range columns
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_delivery_zones_pincode_range")
                    .table(DeliveryZones::Table)
                    .col(DeliveryZones::PincodeStart)
                    .col(DeliveryZones::PincodeEnd)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_orders_status")
                    .table(Orders::Table)
                    .col(Orders::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_orders_created_at")
                    .table(Orders::Table)
                    .col(Orders::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_orders_created_at")
                    .table(Orders::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_orders_status")
                    .table(Orders::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_delivery_zones_pincode_range")
                    .table(DeliveryZones::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_products_name")
                    .table(Products::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_products_active_featured")
                    .table(Products::Table)
                    .to_owned(),
            )
            .await
    }
}
