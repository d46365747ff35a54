use sea_orm_migration::prelude::*;

use crate::m20250101_000001_create_user_profiles::UserProfiles;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(UserMemories::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(UserMemories::UserId).big_integer().not_null().primary_key())
                    .col(ColumnDef::new(UserMemories::PendingAction).string_len(32).not_null().default("none"))
                    .col(ColumnDef::new(UserMemories::PendingCategory).string_len(16).null())
                    .col(ColumnDef::new(UserMemories::PendingSymbol).string_len(16).null())
                    .col(ColumnDef::new(UserMemories::LastCategory).string_len(16).null())
                    .col(ColumnDef::new(UserMemories::LastSymbol).string_len(16).null())
                    .col(ColumnDef::new(UserMemories::LastTimeframe).string_len(16).null())
                    .col(ColumnDef::new(UserMemories::LastStyle).string_len(32).null())
                    .col(ColumnDef::new(UserMemories::LastRisk).string_len(32).null())
                    .col(ColumnDef::new(UserMemories::RecentNotes).text().not_null())
                    .col(ColumnDef::new(UserMemories::UpdatedAt).timestamp().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_memories_user_id")
                            .from(UserMemories::Table, UserMemories::UserId)
                            .to(UserProfiles::Table, UserProfiles::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserMemories::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum UserMemories {
    Table,
    UserId,
    PendingAction,
    PendingCategory,
    PendingSymbol,
    LastCategory,
    LastSymbol,
    LastTimeframe,
    LastStyle,
    LastRisk,
    RecentNotes,
    UpdatedAt,
}
