use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Orders::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Orders::Id).uuid().primary_key().not_null())
                    .col(
                        ColumnDef::new(Orders::OrderNumber)
                            .string_len(20)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Orders::UserId).uuid().not_null())
                    .col(ColumnDef::new(Orders::Status).string_len(20).not_null())
                    .col(
                        ColumnDef::new(Orders::PaymentStatus)
                            .string_len(30)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Orders::PaymentMethod)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Orders::Subtotal)
                            .decimal_len(10, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Orders::DeliveryCharge)
                            .decimal_len(10, 2)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Orders::TaxAmount)
                            .decimal_len(10, 2)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Orders::DiscountAmount)
                            .decimal_len(10, 2)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Orders::TotalAmount)
                            .decimal_len(10, 2)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Orders::DeliveryAddress).json().not_null())
                    .col(
                        ColumnDef::new(Orders::PrescriptionRequired)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Orders::PrescriptionImage).text().null())
                    .col(ColumnDef::new(Orders::Notes).text().null())
                    .col(ColumnDef::new(Orders::ProcessedBy).uuid().null())
                    .col(ColumnDef::new(Orders::ProcessedAt).timestamp().null())
                    .col(ColumnDef::new(Orders::EstimatedDelivery).timestamp().null())
                    .col(ColumnDef::new(Orders::ActualDelivery).timestamp().null())
                    .col(ColumnDef::new(Orders::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Orders::UpdatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(OrderItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OrderItems::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(OrderItems::OrderId).uuid().not_null())
                    .col(ColumnDef::new(OrderItems::ProductId).uuid().not_null())
                    .col(ColumnDef::new(OrderItems::ProductName).string().not_null())
                    .col(ColumnDef::new(OrderItems::Quantity).integer().not_null())
                    .col(
                        ColumnDef::new(OrderItems::UnitPrice)
                            .decimal_len(10, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OrderItems::TotalPrice)
                            .decimal_len(10, 2)
                            .not_null(),
                    )
                    .col(ColumnDef::new(OrderItems::CreatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(OrderStatusHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OrderStatusHistory::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OrderStatusHistory::OrderId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OrderStatusHistory::FromStatus)
                            .string_len(20)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(OrderStatusHistory::ToStatus)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(ColumnDef::new(OrderStatusHistory::Note).text().null())
                    .col(ColumnDef::new(OrderStatusHistory::ChangedBy).uuid().null())
                    .col(
                        ColumnDef::new(OrderStatusHistory::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(OrderRefunds::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OrderRefunds::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(OrderRefunds::OrderId).uuid().not_null())
                    .col(
                        ColumnDef::new(OrderRefunds::Status)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(ColumnDef::new(OrderRefunds::Kind).string_len(10).not_null())
                    .col(
                        ColumnDef::new(OrderRefunds::Amount)
                            .decimal_len(10, 2)
                            .not_null(),
                    )
                    .col(ColumnDef::new(OrderRefunds::Reason).text().not_null())
                    .col(ColumnDef::new(OrderRefunds::DecidedBy).uuid().null())
                    .col(ColumnDef::new(OrderRefunds::DecidedAt).timestamp().null())
                    .col(ColumnDef::new(OrderRefunds::DecisionNote).text().null())
                    .col(ColumnDef::new(OrderRefunds::Reference).string().null())
                    .col(
                        ColumnDef::new(OrderRefunds::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OrderRefunds::UpdatedAt)
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
                    .name("idx_orders_user_id")
                    .table(Orders::Table)
                    .col(Orders::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_order_items_order_product")
                    .table(OrderItems::Table)
                    .col(OrderItems::OrderId)
                    .col(OrderItems::ProductId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_order_status_history_order_id")
                    .table(OrderStatusHistory::Table)
                    .col(OrderStatusHistory::OrderId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_order_refunds_order_id")
                    .table(OrderRefunds::Table)
                    .col(OrderRefunds::OrderId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(OrderRefunds::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(OrderStatusHistory::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(OrderItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Orders::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Orders {
    Table,
    Id,
    OrderNumber,
    UserId,
    Status,
    PaymentStatus,
    PaymentMethod,
    Subtotal,
    DeliveryCharge,
    TaxAmount,
    DiscountAmount,
    TotalAmount,
    DeliveryAddress,
    PrescriptionRequired,
    PrescriptionImage,
    Notes,
    ProcessedBy,
    ProcessedAt,
    EstimatedDelivery,
    ActualDelivery,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum OrderItems {
    Table,
    Id,
    OrderId,
    ProductId,
    ProductName,
    Quantity,
    UnitPrice,
    TotalPrice,
    CreatedAt,
}

#[derive(DeriveIden)]
pub enum OrderStatusHistory {
    Table,
    Id,
    OrderId,
    FromStatus,
    ToStatus,
    Note,
    ChangedBy,
    CreatedAt,
}

#[derive(DeriveIden)]
pub enum OrderRefunds {
    Table,
    Id,
    OrderId,
    Status,
    Kind,
    Amount,
    Reason,
    DecidedBy,
    DecidedAt,
    DecisionNote,
    Reference,
    CreatedAt,
    UpdatedAt,
}
