use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "activity_action")]
#[serde(rename_all = "lowercase")]
pub enum ActivityAction {
    #[sea_orm(string_value = "add")]
    Add,
    #[sea_orm(string_value = "delete")]
    Delete,
}

impl ActivityAction {
    pub fn as_str(&self) -> &str {
        match self {
            ActivityAction::Add => "add",
            ActivityAction::Delete => "delete",
        }
    }
}

impl std::fmt::Display for ActivityAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only audit row; never updated after insert.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "playlist_song_activities")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub playlist_id: String,
    pub song_id: String,
    pub user_id: String,
    pub action: ActivityAction,
    pub time: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::playlist::Entity",
        from = "Column::PlaylistId",
        to = "super::playlist::Column::Id"
    )]
    Playlist,
    #[sea_orm(
        belongs_to = "super::song::Entity",
        from = "Column::SongId",
        to = "super::song::Column::Id"
    )]
    Song,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::playlist::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Playlist.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_as_str() {
        assert_eq!(ActivityAction::Add.as_str(), "add");
        assert_eq!(ActivityAction::Delete.as_str(), "delete");
    }

    #[test]
    fn test_action_display() {
        assert_eq!(format!("{}", ActivityAction::Delete), "delete");
    }

    #[test]
    fn test_action_serialization() {
        let json = serde_json::to_string(&ActivityAction::Add).unwrap();
        assert_eq!(json, r#""add""#);
        let action: ActivityAction = serde_json::from_str(r#""delete""#).unwrap();
        assert_eq!(action, ActivityAction::Delete);
    }
}
