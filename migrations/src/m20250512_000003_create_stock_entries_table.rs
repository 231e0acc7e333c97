use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(StockEntries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(StockEntries::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(StockEntries::ProductId).uuid().not_null())
                    .col(ColumnDef::new(StockEntries::Kind).string_len(20).not_null())
                    .col(ColumnDef::new(StockEntries::Quantity).integer().not_null())
                    .col(ColumnDef::new(StockEntries::Reference).string().null())
                    .col(ColumnDef::new(StockEntries::RecordedBy).uuid().null())
                    .col(
                        ColumnDef::new(StockEntries::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_stock_entries_product_id")
                    .table(StockEntries::Table)
                    .col(StockEntries::ProductId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(StockEntries::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum StockEntries {
    Table,
    Id,
    ProductId,
    Kind,
    Quantity,
    Reference,
    RecordedBy,
    CreatedAt,
}
