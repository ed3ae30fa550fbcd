use sea_orm_migration::prelude::*;

use super::m20221020_000001_create_users::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.create_table(table()).await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_playlists_owner")
                    .table(Playlists::Table)
                    .col(Playlists::Owner)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Playlists::Table).to_owned())
            .await
    }
}

/// Table created by this migration.
pub(crate) fn table() -> TableCreateStatement {
    Table::create()
        .table(Playlists::Table)
        .if_not_exists()
        .col(
            ColumnDef::new(Playlists::Id)
                .string_len(50)
                .not_null()
                .primary_key(),
        )
        .col(ColumnDef::new(Playlists::Name).text().not_null())
        .col(ColumnDef::new(Playlists::Owner).string_len(50).not_null())
        .foreign_key(
            ForeignKey::create()
                .name("fk_playlists_owner")
                .from(Playlists::Table, Playlists::Owner)
                .to(Users::Table, Users::Id)
                .on_delete(ForeignKeyAction::Cascade),
        )
        .to_owned()
}

#[derive(DeriveIden)]
pub enum Playlists {
    Table,
    Id,
    Name,
    Owner,
}
