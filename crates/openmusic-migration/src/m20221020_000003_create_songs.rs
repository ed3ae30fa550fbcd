use sea_orm_migration::prelude::*;

use super::m20221020_000002_create_albums::Albums;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.create_table(table()).await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_songs_album_id")
                    .table(Songs::Table)
                    .col(Songs::AlbumId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Songs::Table).to_owned())
            .await
    }
}

/// Table created by this migration.
pub(crate) fn table() -> TableCreateStatement {
    Table::create()
        .table(Songs::Table)
        .if_not_exists()
        .col(
            ColumnDef::new(Songs::Id)
                .string_len(50)
                .not_null()
                .primary_key(),
        )
        .col(ColumnDef::new(Songs::Title).text().not_null())
        .col(ColumnDef::new(Songs::Year).integer().not_null())
        .col(ColumnDef::new(Songs::Genre).text().not_null())
        .col(ColumnDef::new(Songs::Performer).text().not_null())
        .col(ColumnDef::new(Songs::Duration).integer().null())
        .col(ColumnDef::new(Songs::AlbumId).string_len(50).null())
        .col(
            ColumnDef::new(Songs::CreatedAt)
                .timestamp_with_time_zone()
                .not_null()
                .default(Expr::current_timestamp()),
        )
        .col(
            ColumnDef::new(Songs::UpdatedAt)
                .timestamp_with_time_zone()
                .not_null()
                .default(Expr::current_timestamp()),
        )
        .foreign_key(
            ForeignKey::create()
                .name("fk_songs_album_id")
                .from(Songs::Table, Songs::AlbumId)
                .to(Albums::Table, Albums::Id)
                .on_delete(ForeignKeyAction::Cascade),
        )
        .to_owned()
}

#[derive(DeriveIden)]
pub enum Songs {
    Table,
    Id,
    Title,
    Year,
    Genre,
    Performer,
    Duration,
    AlbumId,
    CreatedAt,
    UpdatedAt,
}
