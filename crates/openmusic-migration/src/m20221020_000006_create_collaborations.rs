use sea_orm_migration::prelude::*;

use super::m20221020_000001_create_users::Users;
use super::m20221020_000004_create_playlists::Playlists;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.create_table(table()).await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_collaborations_playlist_user")
                    .table(Collaborations::Table)
                    .col(Collaborations::PlaylistId)
                    .col(Collaborations::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Collaborations::Table).to_owned())
            .await
    }
}

/// Table created by this migration.
pub(crate) fn table() -> TableCreateStatement {
    Table::create()
        .table(Collaborations::Table)
        .if_not_exists()
        .col(
            ColumnDef::new(Collaborations::Id)
                .string_len(50)
                .not_null()
                .primary_key(),
        )
        .col(
            ColumnDef::new(Collaborations::PlaylistId)
                .string_len(50)
                .not_null(),
        )
        .col(
            ColumnDef::new(Collaborations::UserId)
                .string_len(50)
                .not_null(),
        )
        .foreign_key(
            ForeignKey::create()
                .name("fk_collaborations_playlist_id")
                .from(Collaborations::Table, Collaborations::PlaylistId)
                .to(Playlists::Table, Playlists::Id)
                .on_delete(ForeignKeyAction::Cascade),
        )
        .foreign_key(
            ForeignKey::create()
                .name("fk_collaborations_user_id")
                .from(Collaborations::Table, Collaborations::UserId)
                .to(Users::Table, Users::Id)
                .on_delete(ForeignKeyAction::Cascade),
        )
        .to_owned()
}

#[derive(DeriveIden)]
pub enum Collaborations {
    Table,
    Id,
    PlaylistId,
    UserId,
}
