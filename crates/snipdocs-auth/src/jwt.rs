//! Session token handling

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Value of `token_type` for browser and API sessions
pub const SESSION_TOKEN_TYPE: &str = "session";

/// Claims carried by a session token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionClaims {
    /// Subject (identity ID)
    pub sub: String,
    pub email: String,
    /// Issued at (timestamp)
    pub iat: i64,
    /// Expiration time (timestamp)
    pub exp: i64,
    pub iss: String,
    pub token_type: String,
}

impl SessionClaims {
    pub fn new(user_id: Uuid, email: impl Into<String>, issuer: &str, validity: Duration) -> Self {
        let now = Utc::now();

        Self {
            sub: user_id.to_string(),
            email: email.into(),
            iat: now.timestamp(),
            exp: (now + validity).timestamp(),
            iss: issuer.to_string(),
            token_type: SESSION_TOKEN_TYPE.to_string(),
        }
    }

    pub fn user_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.sub).ok()
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }
}

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Failed to encode token: {0}")]
    EncodingError(#[from] jsonwebtoken::errors::Error),

    #[error("Token has expired")]
    TokenExpired,

    #[error("Invalid token: {0}")]
    InvalidToken(String),
}

/// HS256 signer/validator for session tokens
pub struct JwtValidator {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtValidator {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Only accept tokens minted by `issuer`
    pub fn with_issuer(mut self, issuer: &str) -> Self {
        self.validation.set_issuer(&[issuer]);
        self
    }

    pub fn encode(&self, claims: &SessionClaims) -> Result<String, JwtError> {
        Ok(encode(
            &Header::new(Algorithm::HS256),
            claims,
            &self.encoding_key,
        )?)
    }

    pub fn validate(&self, token: &str) -> Result<SessionClaims, JwtError> {
        let data = decode::<SessionClaims>(token, &self.decoding_key, &self.validation).map_err(
            |e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::TokenExpired,
                _ => JwtError::InvalidToken(e.to_string()),
            },
        )?;

        if data.claims.token_type != SESSION_TOKEN_TYPE {
            return Err(JwtError::InvalidToken(format!(
                "unexpected token type '{}'",
                data.claims.token_type
            )));
        }

        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-secret-key-for-sessions";

    #[test]
    fn test_encode_and_validate() {
        let user_id = Uuid::new_v4();
        let validator = JwtValidator::new(SECRET).with_issuer("snipdocs");
        let claims = SessionClaims::new(user_id, "dev@example.com", "snipdocs", Duration::hours(1));

        let token = validator.encode(&claims).unwrap();
        let decoded = validator.validate(&token).unwrap();

        assert_eq!(decoded, claims);
        assert_eq!(decoded.user_id(), Some(user_id));
        assert!(!decoded.is_expired());
    }

    #[test]
    fn test_expired_token_rejected() {
        let validator = JwtValidator::new(SECRET);
        let claims = SessionClaims::new(
            Uuid::new_v4(),
            "dev@example.com",
            "snipdocs",
            Duration::hours(-1),
        );
        assert!(claims.is_expired());

        let token = validator.encode(&claims).unwrap();
        assert!(matches!(
            validator.validate(&token),
            Err(JwtError::TokenExpired)
        ));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let claims = SessionClaims::new(Uuid::new_v4(), "dev@example.com", "snipdocs", Duration::hours(1));
        let token = JwtValidator::new(SECRET).encode(&claims).unwrap();

        let other = JwtValidator::new(b"another-secret");
        assert!(matches!(
            other.validate(&token),
            Err(JwtError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_wrong_issuer_rejected() {
        let claims = SessionClaims::new(Uuid::new_v4(), "dev@example.com", "elsewhere", Duration::hours(1));
        let token = JwtValidator::new(SECRET).encode(&claims).unwrap();

        let validator = JwtValidator::new(SECRET).with_issuer("snipdocs");
        assert!(validator.validate(&token).is_err());
    }

    #[test]
    fn test_non_session_token_rejected() {
        let validator = JwtValidator::new(SECRET);
        let mut claims = SessionClaims::new(Uuid::new_v4(), "dev@example.com", "snipdocs", Duration::hours(1));
        claims.token_type = "refresh".to_string();

        let token = validator.encode(&claims).unwrap();
        assert!(matches!(
            validator.validate(&token),
            Err(JwtError::InvalidToken(_))
        ));
    }
}
