pub use sea_orm_migration::prelude::*;

mod m20221020_000001_create_users;
mod m20221020_000002_create_albums;
mod m20221020_000003_create_songs;
mod m20221020_000004_create_playlists;
mod m20221020_000005_create_playlist_songs;
mod m20221020_000006_create_collaborations;
mod m20221020_000007_create_playlist_song_activities;
mod m20221020_000008_create_user_album_likes;
mod m20221020_000009_create_authentications;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20221020_000001_create_users::Migration),
            Box::new(m20221020_000002_create_albums::Migration),
            Box::new(m20221020_000003_create_songs::Migration),
            Box::new(m20221020_000004_create_playlists::Migration),
            Box::new(m20221020_000005_create_playlist_songs::Migration),
            Box::new(m20221020_000006_create_collaborations::Migration),
            Box::new(m20221020_000007_create_playlist_song_activities::Migration),
            Box::new(m20221020_000008_create_user_album_likes::Migration),
            Box::new(m20221020_000009_create_authentications::Migration),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_ordered_by_name() {
        let names: Vec<String> = Migrator::migrations()
            .iter()
            .map(|m| m.name().to_string())
            .collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        assert_eq!(names.len(), 9);
    }

    fn create_sql(table: TableCreateStatement) -> String {
        table.to_string(PostgresQueryBuilder)
    }

    fn cascades_to(sql: &str, column: &str, parent: &str) -> bool {
        sql.contains(&format!(
            r#"FOREIGN KEY ("{column}") REFERENCES "{parent}" ("id") ON DELETE CASCADE"#
        ))
    }

    #[test]
    fn test_songs_cascade_from_albums() {
        let sql = create_sql(m20221020_000003_create_songs::table());
        assert!(cascades_to(&sql, "album_id", "albums"), "{sql}");
    }

    #[test]
    fn test_playlists_cascade_from_users() {
        let sql = create_sql(m20221020_000004_create_playlists::table());
        assert!(cascades_to(&sql, "owner", "users"), "{sql}");
    }

    #[test]
    fn test_playlist_children_cascade_from_playlists() {
        let playlist_songs = create_sql(m20221020_000005_create_playlist_songs::table());
        assert!(cascades_to(&playlist_songs, "playlist_id", "playlists"), "{playlist_songs}");
        assert!(cascades_to(&playlist_songs, "song_id", "songs"), "{playlist_songs}");

        let collaborations = create_sql(m20221020_000006_create_collaborations::table());
        assert!(cascades_to(&collaborations, "playlist_id", "playlists"), "{collaborations}");
        assert!(cascades_to(&collaborations, "user_id", "users"), "{collaborations}");

        let activities = create_sql(m20221020_000007_create_playlist_song_activities::table());
        assert!(cascades_to(&activities, "playlist_id", "playlists"), "{activities}");
    }

    #[test]
    fn test_album_likes_cascade_from_users_and_albums() {
        let sql = create_sql(m20221020_000008_create_user_album_likes::table());
        assert!(cascades_to(&sql, "user_id", "users"), "{sql}");
        assert!(cascades_to(&sql, "album_id", "albums"), "{sql}");
    }
}
