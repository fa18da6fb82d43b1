//! Shared JWT module for Agora services
//!
//! Tokens are signed with HS256 using a secret shared by every service that
//! validates them. social-service issues tokens at register/login time;
//! catalog-service only validates.
//!
//! ## Usage
//!
//! ```rust
//! use crypto_core::jwt::JwtKeys;
//!
//! let keys = JwtKeys::from_secret("change-me");
//! let token = keys.generate_access_token(42, "alice").unwrap();
//! let claims = keys.validate_token(&token).unwrap().claims;
//! assert_eq!(claims.user_id().unwrap(), 42);
//! ```

use anyhow::{anyhow, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, Algorithm, DecodingKey, EncodingKey, Header, TokenData, Validation,
};
use serde::{Deserialize, Serialize};

const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;

const JWT_ALGORITHM: Algorithm = Algorithm::HS256;

/// JWT claims carried by every access token
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (numeric user id as a string)
    pub sub: String,
    /// Username at the time of issue
    pub username: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    pub fn user_id(&self) -> Result<i64> {
        self.sub
            .parse::<i64>()
            .map_err(|e| anyhow!("Invalid user id in token subject: {e}"))
    }
}

/// Signing and verification keys plus the lifetime of issued tokens.
///
/// Cheap to clone behind an `Arc`; services build it once at startup.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl std::fmt::Debug for JwtKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtKeys")
            .field("ttl_seconds", &self.ttl.num_seconds())
            .finish_non_exhaustive()
    }
}

impl JwtKeys {
    pub fn from_secret(secret: &str) -> Self {
        Self::with_ttl(secret, Duration::hours(DEFAULT_TOKEN_TTL_HOURS))
    }

    pub fn with_ttl(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    /// Generate an access token for a user
    pub fn generate_access_token(&self, user_id: i64, username: &str) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            username: username.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        encode(&Header::new(JWT_ALGORITHM), &claims, &self.encoding)
            .map_err(|e| anyhow!("Failed to generate access token: {e}"))
    }

    /// Validate and decode a token (without the scheme prefix)
    ///
    /// Fails when the signature does not match, the token is expired or the
    /// token is malformed. Only HS256 is accepted.
    pub fn validate_token(&self, token: &str) -> Result<TokenData<Claims>> {
        let mut validation = Validation::new(JWT_ALGORITHM);
        validation.validate_exp = true;

        decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|e| anyhow!("Token validation failed: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-for-unit-tests";

    #[test]
    fn test_generate_access_token() {
        let keys = JwtKeys::from_secret(SECRET);
        let token = keys.generate_access_token(7, "alice").expect("token");

        assert_eq!(token.matches('.').count(), 2); // JWT has 3 parts
    }

    #[test]
    fn test_validate_valid_token() {
        let keys = JwtKeys::from_secret(SECRET);
        let token = keys.generate_access_token(7, "alice").expect("token");

        let data = keys.validate_token(&token).expect("valid token");
        assert_eq!(data.claims.sub, "7");
        assert_eq!(data.claims.username, "alice");
        assert!(data.claims.exp > data.claims.iat);
    }

    #[test]
    fn test_validate_invalid_token() {
        let keys = JwtKeys::from_secret(SECRET);
        assert!(keys.validate_token("invalid.token.here").is_err());
    }

    #[test]
    fn test_token_signed_with_other_secret_rejected() {
        let issuer = JwtKeys::from_secret("some-other-secret");
        let verifier = JwtKeys::from_secret(SECRET);
        let token = issuer.generate_access_token(7, "alice").expect("token");

        assert!(verifier.validate_token(&token).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let keys = JwtKeys::with_ttl(SECRET, Duration::hours(-2));
        let token = keys.generate_access_token(7, "alice").expect("token");

        assert!(keys.validate_token(&token).is_err());
    }

    #[test]
    fn test_extract_user_id() {
        let keys = JwtKeys::from_secret(SECRET);
        let token = keys.generate_access_token(1234, "bob").expect("token");

        let claims = keys.validate_token(&token).unwrap().claims;
        assert_eq!(claims.user_id().unwrap(), 1234);
    }

    #[test]
    fn test_non_numeric_subject_rejected() {
        let claims = Claims {
            sub: "not-a-number".into(),
            username: "bob".into(),
            iat: 0,
            exp: 0,
        };
        assert!(claims.user_id().is_err());
    }
}
