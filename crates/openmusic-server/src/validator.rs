//! Request payload validation.
//!
//! Payload structs deserialize every field as optional so that a missing field
//! produces a readable message instead of a serde rejection. Each `validate`
//! returns the typed value the services consume.

use serde::Deserialize;
use thiserror::Error;

pub const MIN_YEAR: f64 = 1900.0;

pub const ALLOWED_IMAGE_TYPES: &[&str] = &[
    "image/apng",
    "image/avif",
    "image/gif",
    "image/jpeg",
    "image/png",
    "image/webp",
];

#[derive(Debug, Error, PartialEq)]
#[error("{0}")]
pub struct ValidationError(pub String);

fn required_string(field: &str, value: Option<String>) -> Result<String, ValidationError> {
    match value {
        None => Err(ValidationError(format!("\"{field}\" is required"))),
        Some(v) if v.trim().is_empty() => Err(ValidationError(format!(
            "\"{field}\" is not allowed to be empty"
        ))),
        Some(v) => Ok(v),
    }
}

/// A JSON number, or a string holding one (`"2008"` is accepted for a year).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Numeric {
    Number(f64),
    Text(String),
}

impl From<f64> for Numeric {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

fn number(field: &str, value: Numeric) -> Result<f64, ValidationError> {
    match value {
        Numeric::Number(n) => Ok(n),
        Numeric::Text(text) => text
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .ok_or_else(|| ValidationError(format!("\"{field}\" must be a number"))),
    }
}

fn integer(field: &str, value: f64) -> Result<i32, ValidationError> {
    if value.fract() != 0.0 || value < i32::MIN as f64 || value > i32::MAX as f64 {
        return Err(ValidationError(format!("\"{field}\" must be an integer")));
    }
    Ok(value as i32)
}

fn year(value: Option<Numeric>) -> Result<i32, ValidationError> {
    let value = value.ok_or_else(|| ValidationError("\"year\" is required".to_string()))?;
    let value = number("year", value)?;
    let year = integer("year", value)?;
    if value < MIN_YEAR {
        return Err(ValidationError(format!(
            "\"year\" must be greater than or equal to {MIN_YEAR}"
        )));
    }
    Ok(year)
}

// ─── Albums ────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AlbumPayload {
    pub name: Option<String>,
    pub year: Option<Numeric>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewAlbum {
    pub name: String,
    pub year: i32,
}

impl AlbumPayload {
    pub fn validate(self) -> Result<NewAlbum, ValidationError> {
        Ok(NewAlbum {
            name: required_string("name", self.name)?,
            year: year(self.year)?,
        })
    }
}

// ─── Songs ─────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SongPayload {
    pub title: Option<String>,
    pub year: Option<Numeric>,
    pub genre: Option<String>,
    pub performer: Option<String>,
    pub duration: Option<Numeric>,
    pub album_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewSong {
    pub title: String,
    pub year: i32,
    pub genre: String,
    pub performer: String,
    pub duration: Option<i32>,
    pub album_id: Option<String>,
}

impl SongPayload {
    pub fn validate(self) -> Result<NewSong, ValidationError> {
        let title = required_string("title", self.title)?;
        let year = year(self.year)?;
        let genre = required_string("genre", self.genre)?;
        let performer = required_string("performer", self.performer)?;

        let duration = match self.duration {
            Some(d) => {
                let d = integer("duration", number("duration", d)?)?;
                if d < 0 {
                    return Err(ValidationError(
                        "\"duration\" must be greater than or equal to 0".to_string(),
                    ));
                }
                Some(d)
            }
            None => None,
        };

        let album_id = match self.album_id {
            Some(id) if id.trim().is_empty() => {
                return Err(ValidationError(
                    "\"albumId\" is not allowed to be empty".to_string(),
                ))
            }
            other => other,
        };

        Ok(NewSong {
            title,
            year,
            genre,
            performer,
            duration,
            album_id,
        })
    }
}

// ─── Playlists ─────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlaylistPayload {
    pub name: Option<String>,
}

impl PlaylistPayload {
    /// Returns the playlist name.
    pub fn validate(self) -> Result<String, ValidationError> {
        required_string("name", self.name)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PlaylistSongPayload {
    pub song_id: Option<String>,
}

impl PlaylistSongPayload {
    /// Returns the song id.
    pub fn validate(self) -> Result<String, ValidationError> {
        required_string("songId", self.song_id)
    }
}

// ─── Users & authentication ────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserPayload {
    pub username: Option<String>,
    pub password: Option<String>,
    pub fullname: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub fullname: String,
}

impl UserPayload {
    pub fn validate(self) -> Result<NewUser, ValidationError> {
        Ok(NewUser {
            username: required_string("username", self.username)?,
            password: required_string("password", self.password)?,
            fullname: required_string("fullname", self.fullname)?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginPayload {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl LoginPayload {
    pub fn validate(self) -> Result<Credentials, ValidationError> {
        Ok(Credentials {
            username: required_string("username", self.username)?,
            password: required_string("password", self.password)?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RefreshTokenPayload {
    pub refresh_token: Option<String>,
}

impl RefreshTokenPayload {
    pub fn validate(self) -> Result<String, ValidationError> {
        required_string("refreshToken", self.refresh_token)
    }
}

// ─── Collaborations ────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CollaborationPayload {
    pub playlist_id: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollaborationRef {
    pub playlist_id: String,
    pub user_id: String,
}

impl CollaborationPayload {
    pub fn validate(self) -> Result<CollaborationRef, ValidationError> {
        Ok(CollaborationRef {
            playlist_id: required_string("playlistId", self.playlist_id)?,
            user_id: required_string("userId", self.user_id)?,
        })
    }
}

// ─── Exports ───────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ExportPayload {
    pub target_email: Option<String>,
}

impl ExportPayload {
    pub fn validate(self) -> Result<String, ValidationError> {
        let email = required_string("targetEmail", self.target_email)?;
        if !is_email(&email) {
            return Err(ValidationError(
                "\"targetEmail\" must be a valid email".to_string(),
            ));
        }
        Ok(email)
    }
}

fn is_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !value.chars().any(char::is_whitespace)
        && !domain.contains('@')
        && domain.contains('.')
        && domain.split('.').all(|label| !label.is_empty())
}

// ─── Uploads ───────────────────────────────────────────────────────

/// Check the content type of an uploaded cover image.
pub fn validate_image_headers(content_type: Option<&str>) -> Result<(), ValidationError> {
    let content_type = content_type
        .ok_or_else(|| ValidationError("\"content-type\" is required".to_string()))?;
    // Ignore parameters such as `; charset=...`
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    if ALLOWED_IMAGE_TYPES.contains(&essence.as_str()) {
        Ok(())
    } else {
        Err(ValidationError(format!(
            "\"content-type\" must be one of [{}]",
            ALLOWED_IMAGE_TYPES.join(", ")
        )))
    }
}
