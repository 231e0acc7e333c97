use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DeliveryZones::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DeliveryZones::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(DeliveryZones::Name).string().not_null())
                    .col(
                        ColumnDef::new(DeliveryZones::PincodeStart)
                            .string_len(6)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DeliveryZones::PincodeEnd)
                            .string_len(6)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DeliveryZones::DeliveryCharge)
                            .decimal_len(10, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DeliveryZones::IsServiceable)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(DeliveryZones::EstimatedDays)
                            .integer()
                            .not_null()
                            .default(3),
                    )
                    .col(
                        ColumnDef::new(DeliveryZones::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DeliveryZones::UpdatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DeliveryZones::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum DeliveryZones {
    Table,
    Id,
    Name,
    PincodeStart,
    PincodeEnd,
    DeliveryCharge,
    IsServiceable,
    EstimatedDays,
    CreatedAt,
    UpdatedAt,
}
