use sea_orm_migration::prelude::*;

use super::m20221020_000003_create_songs::Songs;
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
                    .name("idx_playlist_songs_playlist_song")
                    .table(PlaylistSongs::Table)
                    .col(PlaylistSongs::PlaylistId)
                    .col(PlaylistSongs::SongId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PlaylistSongs::Table).to_owned())
            .await
    }
}

/// Table created by this migration.
pub(crate) fn table() -> TableCreateStatement {
    Table::create()
        .table(PlaylistSongs::Table)
        .if_not_exists()
        .col(
            ColumnDef::new(PlaylistSongs::Id)
                .string_len(50)
                .not_null()
                .primary_key(),
        )
        .col(
            ColumnDef::new(PlaylistSongs::PlaylistId)
                .string_len(50)
                .not_null(),
        )
        .col(ColumnDef::new(PlaylistSongs::SongId).string_len(50).not_null())
        .foreign_key(
            ForeignKey::create()
                .name("fk_playlist_songs_playlist_id")
                .from(PlaylistSongs::Table, PlaylistSongs::PlaylistId)
                .to(Playlists::Table, Playlists::Id)
                .on_delete(ForeignKeyAction::Cascade),
        )
        .foreign_key(
            ForeignKey::create()
                .name("fk_playlist_songs_song_id")
                .from(PlaylistSongs::Table, PlaylistSongs::SongId)
                .to(Songs::Table, Songs::Id)
                .on_delete(ForeignKeyAction::Cascade),
        )
        .to_owned()
}

#[derive(DeriveIden)]
pub enum PlaylistSongs {
    Table,
    Id,
    PlaylistId,
    SongId,
}
