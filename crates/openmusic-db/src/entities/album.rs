use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "albums")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub year: i32,
    /// Public URL of the uploaded cover image
    pub cover: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::song::Entity")]
    Song,
    #[sea_orm(has_many = "super::user_album_like::Entity")]
    UserAlbumLike,
}

impl Related<super::song::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Song.def()
    }
}

impl Related<super::user_album_like::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserAlbumLike.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
