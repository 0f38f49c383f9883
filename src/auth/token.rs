// Signed bearer tokens (HS256 JWT).

use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    pub sub: Uuid, // user id
    pub iat: i64,
    pub exp: i64, // expiry (unix timestamp)
    pub jti: Uuid,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Token has expired")]
    Expired,
    #[error("Invalid token: {0}")]
    Invalid(String),
    #[error("Failed to create token: {0}")]
    Encode(String),
}

/// Signing material plus the lifetime stamped into every new token.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenKeys {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        let mut validation = Validation::default();
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }

    pub fn issue(&self, user_id: Uuid) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
            jti: Uuid::new_v4(),
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| TokenError::Encode(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> TokenKeys {
        TokenKeys::new(b"test-secret", Duration::hours(1))
    }

    #[test]
    fn test_issue_and_verify() {
        let user_id = Uuid::new_v4();
        let token = keys().issue(user_id).unwrap();
        let claims = keys().verify(&token).unwrap();
        assert_eq!(claims.sub, user_id);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_tokens_for_same_user_differ() {
        let user_id = Uuid::new_v4();
        assert_ne!(keys().issue(user_id).unwrap(), keys().issue(user_id).unwrap());
    }

    #[test]
    fn test_expired_token() {
        let stale = TokenKeys::new(b"test-secret", Duration::hours(-1));
        let token = stale.issue(Uuid::new_v4()).unwrap();
        assert!(matches!(keys().verify(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn test_wrong_secret_and_garbage() {
        let other = TokenKeys::new(b"other-secret", Duration::hours(1));
        let token = other.issue(Uuid::new_v4()).unwrap();
        assert!(matches!(keys().verify(&token), Err(TokenError::Invalid(_))));
        assert!(matches!(
            keys().verify("invalid.token.here"),
            Err(TokenError::Invalid(_))
        ));
    }
}
