use std::env;

pub const DEFAULT_ACCESS_TOKEN_KEY: &str = "dev-access-key-change-me-in-production";
pub const DEFAULT_REFRESH_TOKEN_KEY: &str = "dev-refresh-key-change-me-in-production";

/// Server settings read from the environment.
#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub access_token_key: String,
    pub refresh_token_key: String,
    /// Access token lifetime in seconds
    pub access_token_age: i64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("access_token_age", &self.access_token_age)
            .finish_non_exhaustive()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5000,
            access_token_key: DEFAULT_ACCESS_TOKEN_KEY.to_string(),
            refresh_token_key: DEFAULT_REFRESH_TOKEN_KEY.to_string(),
            access_token_age: 1800,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: env::var("HOST").unwrap_or(defaults.host),
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),
            access_token_key: env::var("ACCESS_TOKEN_KEY").unwrap_or(defaults.access_token_key),
            refresh_token_key: env::var("REFRESH_TOKEN_KEY")
                .unwrap_or(defaults.refresh_token_key),
            access_token_age: env::var("ACCESS_TOKEN_AGE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.access_token_age),
        }
    }

    /// True when either signing key is still one of the built-in defaults.
    pub fn uses_default_secrets(&self) -> bool {
        self.access_token_key == DEFAULT_ACCESS_TOKEN_KEY
            || self.refresh_token_key == DEFAULT_REFRESH_TOKEN_KEY
    }

    /// URL under which this server serves a locally stored cover.
    pub fn cover_url(&self, name: &str) -> String {
        format!("http://{}:{}/albums/images/{}", self.host, self.port, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 5000);
        assert_eq!(config.access_token_age, 1800);
        assert!(config.uses_default_secrets());
    }

    #[test]
    fn test_cover_url() {
        let config = AppConfig::default();
        assert_eq!(
            config.cover_url("1666400000000cover.png"),
            "http://localhost:5000/albums/images/1666400000000cover.png"
        );
    }

    #[test]
    fn test_custom_secrets_are_not_default() {
        let config = AppConfig {
            access_token_key: "a".repeat(32),
            refresh_token_key: "b".repeat(32),
            ..AppConfig::default()
        };
        assert!(!config.uses_default_secrets());
    }

    #[test]
    fn test_debug_hides_secrets() {
        let debug = format!("{:?}", AppConfig::default());
        assert!(!debug.contains(DEFAULT_ACCESS_TOKEN_KEY));
    }
}
