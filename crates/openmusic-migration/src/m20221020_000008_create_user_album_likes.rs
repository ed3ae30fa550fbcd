use sea_orm_migration::prelude::*;

use super::m20221020_000001_create_users::Users;
use super::m20221020_000002_create_albums::Albums;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.create_table(table()).await?;

        // The like toggle relies on this index to keep one row per pair.
        manager
            .create_index(
                Index::create()
                    .name("idx_user_album_likes_user_album")
                    .table(UserAlbumLikes::Table)
                    .col(UserAlbumLikes::UserId)
                    .col(UserAlbumLikes::AlbumId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserAlbumLikes::Table).to_owned())
            .await
    }
}

/// Table created by this migration.
pub(crate) fn table() -> TableCreateStatement {
    Table::create()
        .table(UserAlbumLikes::Table)
        .if_not_exists()
        .col(
            ColumnDef::new(UserAlbumLikes::Id)
                .string_len(50)
                .not_null()
                .primary_key(),
        )
        .col(
            ColumnDef::new(UserAlbumLikes::UserId)
                .string_len(50)
                .not_null(),
        )
        .col(
            ColumnDef::new(UserAlbumLikes::AlbumId)
                .string_len(50)
                .not_null(),
        )
        .foreign_key(
            ForeignKey::create()
                .name("fk_user_album_likes_user_id")
                .from(UserAlbumLikes::Table, UserAlbumLikes::UserId)
                .to(Users::Table, Users::Id)
                .on_delete(ForeignKeyAction::Cascade),
        )
        .foreign_key(
            ForeignKey::create()
                .name("fk_user_album_likes_album_id")
                .from(UserAlbumLikes::Table, UserAlbumLikes::AlbumId)
                .to(Albums::Table, Albums::Id)
                .on_delete(ForeignKeyAction::Cascade),
        )
        .to_owned()
}

#[derive(DeriveIden)]
pub enum UserAlbumLikes {
    Table,
    Id,
    UserId,
    AlbumId,
}
