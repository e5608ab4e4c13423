//! Authentication boundary for snipdocs
//!
//! The identity provider is treated as an external service: everything in the
//! rest of the system talks to it through [`IdentityProvider`] and only ever
//! sees a [`UserIdentity`].

pub mod identity;
pub mod jwt;
pub mod mail;
pub mod password;
pub mod token;

pub use identity::{
    AuthError, IdentityProvider, MetadataPatch, OAuthProvider, OAuthRedirect, OtpKind, Session,
    SignUpOutcome, SignUpRequest, UserIdentity,
};
pub use jwt::{JwtError, JwtValidator, SessionClaims};
pub use mail::{link_param, EmailMessage, EmailSender, LogEmailSender, MemoryEmailSender};
pub use password::{check_password_policy, hash_password, verify_password, PasswordError};
pub use token::{generate_token, hash_token};

// Re-export useful types
pub use async_trait::async_trait;
