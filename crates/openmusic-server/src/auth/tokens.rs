use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    pub token_type: TokenType,
    /// Issued at
    pub iat: i64,
    /// Expiration. Refresh tokens have none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    /// Token id, unique per issued token
    #[serde(default)]
    pub jti: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    Access,
    Refresh,
}

/// Signs and verifies access and refresh tokens with separate HS256 secrets.
#[derive(Clone)]
pub struct TokenManager {
    access_key: String,
    refresh_key: String,
    access_token_age: i64,
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("access_token_age", &self.access_token_age)
            .finish_non_exhaustive()
    }
}

impl TokenManager {
    pub fn new(
        access_key: impl Into<String>,
        refresh_key: impl Into<String>,
        access_token_age: i64,
    ) -> Self {
        Self {
            access_key: access_key.into(),
            refresh_key: refresh_key.into(),
            access_token_age,
        }
    }

    pub fn access_token_age(&self) -> i64 {
        self.access_token_age
    }

    pub fn generate_access_token(&self, user_id: &str) -> Result<String, ApiError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            token_type: TokenType::Access,
            iat: now.timestamp(),
            exp: Some((now + Duration::seconds(self.access_token_age)).timestamp()),
            jti: Uuid::new_v4().to_string(),
        };
        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.access_key.as_bytes()),
        )?)
    }

    pub fn generate_refresh_token(&self, user_id: &str) -> Result<String, ApiError> {
        let claims = Claims {
            sub: user_id.to_string(),
            token_type: TokenType::Refresh,
            iat: Utc::now().timestamp(),
            exp: None,
            jti: Uuid::new_v4().to_string(),
        };
        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.refresh_key.as_bytes()),
        )?)
    }

    /// Validate an access token, rejecting expired and refresh tokens.
    pub fn verify_access_token(&self, token: &str) -> Result<Claims, ApiError> {
        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.access_key.as_bytes()),
            &validation,
        )
        .map_err(|_| ApiError::Authentication("Invalid or expired token".to_string()))?;

        if data.claims.token_type != TokenType::Access {
            return Err(ApiError::Authentication(
                "Invalid token type, access token required".to_string(),
            ));
        }
        Ok(data.claims)
    }

    /// Check a refresh token's signature and return its claims.
    pub fn verify_refresh_token(&self, token: &str) -> Result<Claims, ApiError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;

        let invalid = || ApiError::Invariant("invalid refresh token".to_string());
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.refresh_key.as_bytes()),
            &validation,
        )
        .map_err(|_| invalid())?;

        if data.claims.token_type != TokenType::Refresh {
            return Err(invalid());
        }
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> TokenManager {
        TokenManager::new("test-access-key", "test-refresh-key", 1800)
    }

    #[test]
    fn test_access_token_roundtrip() {
        let tokens = manager();
        let token = tokens.generate_access_token("user-abc").unwrap();
        let claims = tokens.verify_access_token(&token).unwrap();
        assert_eq!(claims.sub, "user-abc");
        assert_eq!(claims.token_type, TokenType::Access);
    }

    #[test]
    fn test_access_token_age() {
        let tokens = manager();
        let token = tokens.generate_access_token("user-abc").unwrap();
        let claims = tokens.verify_access_token(&token).unwrap();
        let diff = claims.exp.unwrap() - claims.iat;
        assert!((1799..=1801).contains(&diff));
    }

    #[test]
    fn test_refresh_token_has_no_expiry() {
        let tokens = manager();
        let token = tokens.generate_refresh_token("user-abc").unwrap();
        let claims = tokens.verify_refresh_token(&token).unwrap();
        assert_eq!(claims.sub, "user-abc");
        assert_eq!(claims.token_type, TokenType::Refresh);
        assert!(claims.exp.is_none());
    }

    #[test]
    fn test_refresh_tokens_issued_together_differ() {
        let tokens = manager();
        let first = tokens.generate_refresh_token("user-abc").unwrap();
        let second = tokens.generate_refresh_token("user-abc").unwrap();
        assert_ne!(first, second);

        let a = tokens.verify_refresh_token(&first).unwrap();
        let b = tokens.verify_refresh_token(&second).unwrap();
        assert_eq!(a.sub, b.sub);
        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn test_expired_access_token_rejected() {
        let tokens = TokenManager::new("test-access-key", "test-refresh-key", -3600);
        let token = tokens.generate_access_token("user-abc").unwrap();
        assert!(matches!(
            tokens.verify_access_token(&token),
            Err(ApiError::Authentication(_))
        ));
    }

    #[test]
    fn test_refresh_token_not_accepted_as_access() {
        let tokens = manager();
        let refresh = tokens.generate_refresh_token("user-abc").unwrap();
        assert!(tokens.verify_access_token(&refresh).is_err());
    }

    #[test]
    fn test_access_token_not_accepted_as_refresh() {
        let tokens = manager();
        let access = tokens.generate_access_token("user-abc").unwrap();
        let err = tokens.verify_refresh_token(&access).unwrap_err();
        assert!(matches!(err, ApiError::Invariant(ref m) if m == "invalid refresh token"));
    }

    #[test]
    fn test_refresh_token_signed_with_other_key_rejected() {
        let token = TokenManager::new("a", "other-refresh-key", 1800)
            .generate_refresh_token("user-abc")
            .unwrap();
        let err = manager().verify_refresh_token(&token).unwrap_err();
        assert!(matches!(err, ApiError::Invariant(_)));
    }

    #[test]
    fn test_garbage_tokens_rejected() {
        let tokens = manager();
        assert!(tokens.verify_access_token("not-a-valid-jwt").is_err());
        assert!(tokens.verify_access_token("").is_err());
        assert!(matches!(
            tokens.verify_refresh_token("not-a-valid-jwt"),
            Err(ApiError::Invariant(_))
        ));
    }

    #[test]
    fn test_token_type_serialization() {
        let json = serde_json::to_string(&TokenType::Access).unwrap();
        assert_eq!(json, "\"access\"");
        let json = serde_json::to_string(&TokenType::Refresh).unwrap();
        assert_eq!(json, "\"refresh\"");
    }

    #[test]
    fn test_debug_hides_keys() {
        let debug = format!("{:?}", manager());
        assert!(!debug.contains("test-access-key"));
    }
}
