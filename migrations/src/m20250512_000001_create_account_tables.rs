use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Users::Id).uuid().primary_key().not_null())
                    .col(
                        ColumnDef::new(Users::Email)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                    .col(ColumnDef::new(Users::FullName).string().not_null())
                    .col(ColumnDef::new(Users::Phone).string_len(15).not_null())
                    .col(ColumnDef::new(Users::Kind).string_len(20).not_null())
                    .col(
                        ColumnDef::new(Users::IsVerified)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Users::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Users::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Users::UpdatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PatientProfiles::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PatientProfiles::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PatientProfiles::UserId)
                            .uuid()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(PatientProfiles::DateOfBirth).date().null())
                    .col(
                        ColumnDef::new(PatientProfiles::Gender)
                            .string_len(10)
                            .null(),
                    )
                    .col(ColumnDef::new(PatientProfiles::Allergies).json().null())
                    .col(
                        ColumnDef::new(PatientProfiles::ChronicConditions)
                            .json()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PatientProfiles::CurrentMedications)
                            .json()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PatientProfiles::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PatientProfiles::UpdatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PharmacyProfiles::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PharmacyProfiles::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PharmacyProfiles::UserId)
                            .uuid()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(PharmacyProfiles::BusinessName)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PharmacyProfiles::LicenseNumber)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(PharmacyProfiles::GstNumber).string().null())
                    .col(
                        ColumnDef::new(PharmacyProfiles::BusinessAddress)
                            .text()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PharmacyProfiles::IsApproved)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(PharmacyProfiles::CreditLimit)
                            .decimal_len(10, 2)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(PharmacyProfiles::CreditUsed)
                            .decimal_len(10, 2)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(PharmacyProfiles::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PharmacyProfiles::UpdatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Addresses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Addresses::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Addresses::UserId).uuid().not_null())
                    .col(ColumnDef::new(Addresses::Label).string_len(10).not_null())
                    .col(ColumnDef::new(Addresses::RecipientName).string().not_null())
                    .col(ColumnDef::new(Addresses::Phone).string_len(15).not_null())
                    .col(ColumnDef::new(Addresses::Line1).string().not_null())
                    .col(ColumnDef::new(Addresses::Line2).string().null())
                    .col(ColumnDef::new(Addresses::City).string().not_null())
                    .col(ColumnDef::new(Addresses::State).string().not_null())
                    .col(ColumnDef::new(Addresses::Pincode).string_len(6).not_null())
                    .col(ColumnDef::new(Addresses::Landmark).string().null())
                    .col(
                        ColumnDef::new(Addresses::IsDefault)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Addresses::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Addresses::UpdatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_addresses_user_id")
                    .table(Addresses::Table)
                    .col(Addresses::UserId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Addresses::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PharmacyProfiles::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PatientProfiles::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Users {
    Table,
    Id,
    Email,
    PasswordHash,
    FullName,
    Phone,
    Kind,
    IsVerified,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum PatientProfiles {
    Table,
    Id,
    UserId,
    DateOfBirth,
    Gender,
    Allergies,
    ChronicConditions,
    CurrentMedications,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum PharmacyProfiles {
    Table,
    Id,
    UserId,
    BusinessName,
    LicenseNumber,
    GstNumber,
    BusinessAddress,
    IsApproved,
    CreditLimit,
    CreditUsed,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum Addresses {
    Table,
    Id,
    UserId,
    Label,
    RecipientName,
    Phone,
    Line1,
    Line2,
    City,
    State,
    Pincode,
    Landmark,
    IsDefault,
    CreatedAt,
    UpdatedAt,
}
