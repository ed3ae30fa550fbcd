use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(unique)]
    pub username: String,
    /// Argon2id hash
    #[serde(skip_serializing)]
    pub password: String,
    pub fullname: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::playlist::Entity")]
    Playlist,
    #[sea_orm(has_many = "super::collaboration::Entity")]
    Collaboration,
    #[sea_orm(has_many = "super::user_album_like::Entity")]
    UserAlbumLike,
}

impl Related<super::playlist::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Playlist.def()
    }
}

impl Related<super::collaboration::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Collaboration.def()
    }
}

impl Related<super::user_album_like::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserAlbumLike.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
