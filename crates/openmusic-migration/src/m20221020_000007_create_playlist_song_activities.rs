use sea_orm_migration::prelude::*;

use super::m20221020_000004_create_playlists::Playlists;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("CREATE TYPE activity_action AS ENUM ('add', 'delete')")
            .await?;

        // song_id and user_id are kept as plain columns: the log outlives
        // the songs and users it mentions.
        manager.create_table(table()).await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_playlist_song_activities_playlist_time")
                    .table(PlaylistSongActivities::Table)
                    .col(PlaylistSongActivities::PlaylistId)
                    .col(PlaylistSongActivities::Time)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(PlaylistSongActivities::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared("DROP TYPE IF EXISTS activity_action")
            .await?;

        Ok(())
    }
}

/// Table created by this migration.
pub(crate) fn table() -> TableCreateStatement {
    Table::create()
        .table(PlaylistSongActivities::Table)
        .if_not_exists()
        .col(
            ColumnDef::new(PlaylistSongActivities::Id)
                .string_len(50)
                .not_null()
                .primary_key(),
        )
        .col(
            ColumnDef::new(PlaylistSongActivities::PlaylistId)
                .string_len(50)
                .not_null(),
        )
        .col(
            ColumnDef::new(PlaylistSongActivities::SongId)
                .string_len(50)
                .not_null(),
        )
        .col(
            ColumnDef::new(PlaylistSongActivities::UserId)
                .string_len(50)
                .not_null(),
        )
        .col(
            ColumnDef::new(PlaylistSongActivities::Action)
                .custom(Alias::new("activity_action"))
                .not_null(),
        )
        .col(
            ColumnDef::new(PlaylistSongActivities::Time)
                .timestamp_with_time_zone()
                .not_null()
                .default(Expr::current_timestamp()),
        )
        .foreign_key(
            ForeignKey::create()
                .name("fk_playlist_song_activities_playlist_id")
                .from(
                    PlaylistSongActivities::Table,
                    PlaylistSongActivities::PlaylistId,
                )
                .to(Playlists::Table, Playlists::Id)
                .on_delete(ForeignKeyAction::Cascade),
        )
        .to_owned()
}

#[derive(DeriveIden)]
pub enum PlaylistSongActivities {
    Table,
    Id,
    PlaylistId,
    SongId,
    UserId,
    Action,
    Time,
}
