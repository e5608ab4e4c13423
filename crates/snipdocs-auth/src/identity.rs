//! Identity provider boundary
//!
//! Sign-up, sign-in, email verification and password recovery are owned by an
//! identity service. This module describes what the rest of the system may ask
//! of it and what it gets back.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

/// Free-form provider metadata (`full_name`, `avatar_url`, `username`, ...)
pub type MetadataPatch = Map<String, Value>;

/// Account record issued by the identity provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: Uuid,
    pub email: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl UserIdentity {
    pub fn new(id: Uuid, email: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
            metadata: Map::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    /// Non-blank string metadata value
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// First non-blank string among `keys`, in order
    pub fn first_metadata_str(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|key| self.metadata_str(key))
    }

    /// Provider's email-verified flag (false unless explicitly `true`)
    pub fn email_verified(&self) -> bool {
        matches!(self.metadata.get("email_verified"), Some(Value::Bool(true)))
    }
}

/// Authenticated session handed back by sign-in style calls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserIdentity,
}

#[derive(Debug, Clone)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub metadata: MetadataPatch,
}

#[derive(Debug, Clone)]
pub struct SignUpOutcome {
    pub user: UserIdentity,
    /// Whether a confirmation email was dispatched
    pub confirmation_sent: bool,
}

/// Email one-time-password link types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OtpKind {
    Signup,
    Recovery,
    #[serde(rename = "magiclink")]
    MagicLink,
    EmailChange,
}

impl OtpKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OtpKind::Signup => "signup",
            OtpKind::Recovery => "recovery",
            OtpKind::MagicLink => "magiclink",
            OtpKind::EmailChange => "email_change",
        }
    }
}

impl FromStr for OtpKind {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "signup" => Ok(OtpKind::Signup),
            "recovery" => Ok(OtpKind::Recovery),
            "magiclink" => Ok(OtpKind::MagicLink),
            "email_change" => Ok(OtpKind::EmailChange),
            _ => Err(AuthError::InvalidToken),
        }
    }
}

impl fmt::Display for OtpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supported OAuth providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OAuthProvider {
    Github,
    Google,
}

impl FromStr for OAuthProvider {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "github" => Ok(OAuthProvider::Github),
            "google" => Ok(OAuthProvider::Google),
            other => Err(AuthError::UnknownProvider(other.to_string())),
        }
    }
}

impl fmt::Display for OAuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OAuthProvider::Github => f.write_str("github"),
            OAuthProvider::Google => f.write_str("google"),
        }
    }
}

/// Where to send the browser to start an OAuth flow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthRedirect {
    pub provider: OAuthProvider,
    pub url: String,
}

/// Identity provider errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Email address has not been confirmed")]
    EmailNotConfirmed,

    #[error("An account with this email already exists")]
    EmailTaken,

    #[error("Invalid email address")]
    InvalidEmail,

    #[error("{0}")]
    WeakPassword(String),

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("User not found")]
    UserNotFound,

    #[error("Unknown OAuth provider '{0}'")]
    UnknownProvider(String),

    #[error("Sign-in with {0} is not available on this server")]
    OAuthUnavailable(OAuthProvider),

    #[error("Identity provider unavailable: {0}")]
    Unavailable(String),

    #[error("Identity provider error: {0}")]
    Provider(String),
}

/// Operations delegated to the identity service
///
/// Implementations must be cheap to share (`Arc<dyn IdentityProvider>`).
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve a session access token to its identity, `None` if the token is
    /// invalid, expired or belongs to an unknown account
    async fn get_user(&self, access_token: &str) -> Result<Option<UserIdentity>, AuthError>;

    async fn sign_up(&self, request: SignUpRequest) -> Result<SignUpOutcome, AuthError>;

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError>;

    async fn sign_in_with_oauth(
        &self,
        provider: OAuthProvider,
        redirect_to: &str,
    ) -> Result<OAuthRedirect, AuthError>;

    /// Redeem the token carried by an email link (`token_hash` + `type`)
    async fn verify_email_token(&self, token_hash: &str, kind: OtpKind)
        -> Result<Session, AuthError>;

    /// Redeem a redirect `code` for a session
    async fn exchange_auth_code(&self, code: &str) -> Result<Session, AuthError>;

    /// Send a recovery link; unknown emails succeed silently
    async fn reset_password_request(&self, email: &str) -> Result<(), AuthError>;

    async fn set_password(&self, user_id: Uuid, new_password: &str) -> Result<(), AuthError>;

    /// Re-send the sign-up confirmation; unknown or confirmed emails succeed silently
    async fn resend_verification(&self, email: &str) -> Result<(), AuthError>;

    /// Merge `patch` into the identity's metadata
    async fn update_metadata(
        &self,
        user_id: Uuid,
        patch: MetadataPatch,
    ) -> Result<UserIdentity, AuthError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_lookup_skips_blank_values() {
        let identity = UserIdentity::new(Uuid::new_v4(), "dev@example.com")
            .with_metadata("username", "   ")
            .with_metadata("preferred_username", "octocat");

        assert_eq!(identity.metadata_str("username"), None);
        assert_eq!(
            identity.first_metadata_str(&["username", "preferred_username"]),
            Some("octocat")
        );
    }

    #[test]
    fn test_email_verified_defaults_to_false() {
        let identity = UserIdentity::new(Uuid::new_v4(), "dev@example.com");
        assert!(!identity.email_verified());

        let identity = identity.with_metadata("email_verified", "true");
        assert!(!identity.email_verified());

        let identity = identity.with_metadata("email_verified", true);
        assert!(identity.email_verified());
    }

    #[test]
    fn test_otp_kind_parsing() {
        assert_eq!("signup".parse::<OtpKind>().unwrap(), OtpKind::Signup);
        assert_eq!("magiclink".parse::<OtpKind>().unwrap(), OtpKind::MagicLink);
        assert!("bogus".parse::<OtpKind>().is_err());
    }

    #[test]
    fn test_oauth_provider_parsing_is_case_insensitive() {
        assert_eq!(
            "GitHub".parse::<OAuthProvider>().unwrap(),
            OAuthProvider::Github
        );
        assert!(matches!(
            "myspace".parse::<OAuthProvider>(),
            Err(AuthError::UnknownProvider(_))
        ));
    }
}
