use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(UserProfiles::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(UserProfiles::Id).big_integer().not_null().primary_key())
                    .col(ColumnDef::new(UserProfiles::Username).text().null())
                    .col(ColumnDef::new(UserProfiles::FirstName).text().null())
                    .col(ColumnDef::new(UserProfiles::Language).string_len(8).null())
                    .col(ColumnDef::new(UserProfiles::CreatedAt).timestamp().not_null().default(Expr::cust("CURRENT_TIMESTAMP")))
                    .col(ColumnDef::new(UserProfiles::FreeUsesRemaining).unsigned().not_null().default(0))
                    .col(ColumnDef::new(UserProfiles::BonusUsesRemaining).unsigned().not_null().default(0))
                    .col(ColumnDef::new(UserProfiles::WalletBalance).big_unsigned().not_null().default(0))
                    .col(ColumnDef::new(UserProfiles::ReferralCode).string_len(32).not_null().unique_key())
                    .col(ColumnDef::new(UserProfiles::ReferredBy).string_len(32).null())
                    .col(ColumnDef::new(UserProfiles::Referrals).unsigned().not_null().default(0))
                    .col(ColumnDef::new(UserProfiles::Plan).string_len(16).not_null().default("free"))
                    .col(ColumnDef::new(UserProfiles::UpdatedAt).timestamp().null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserProfiles::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub(crate) enum UserProfiles {
    Table,
    Id,
    Username,
    FirstName,
    Language,
    CreatedAt,
    FreeUsesRemaining,
    BonusUsesRemaining,
    WalletBalance,
    ReferralCode,
    ReferredBy,
    Referrals,
    Plan,
    UpdatedAt,
}
