//! Account flows that sit on top of the identity provider
//!
//! The provider owns credentials; these functions add form validation,
//! username availability and best-effort profile provisioning around it.

use sea_orm::DatabaseConnection;
use serde::Deserialize;
use serde_json::Value;
use snipdocs_auth::{IdentityProvider, MetadataPatch, OtpKind, Session, SignUpOutcome, SignUpRequest};
use tracing::{debug, info};
use validator::Validate;

use crate::error::{ServiceError, ServiceResult};
use crate::profiles::{ensure_profile_best_effort, username_taken};
use crate::validation::username_chars;

const DEFAULT_NEXT: &str = "/dashboard";

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct RegistrationForm {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,

    #[validate(length(min = 6, max = 72, message = "Password must be between 6 and 72 characters"))]
    pub password: String,

    #[validate(
        length(min = 3, max = 30, message = "Username must be between 3 and 30 characters"),
        custom(function = "username_chars")
    )]
    pub username: String,

    #[validate(length(min = 2, max = 100, message = "Full name must be between 2 and 100 characters"))]
    pub full_name: Option<String>,
}

/// Query parameters of an email link or OAuth redirect
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    pub token_hash: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub code: Option<String>,
    pub next: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CallbackOutcome {
    pub session: Session,
    /// Where the browser should go next
    pub redirect_to: String,
}

/// Validate the form, check the username, then create the account
///
/// The profile is provisioned later, once the email is confirmed.
pub async fn register(
    db: &DatabaseConnection,
    identity: &dyn IdentityProvider,
    form: RegistrationForm,
) -> ServiceResult<SignUpOutcome> {
    form.validate()?;

    if username_taken(db, &form.username).await? {
        return Err(ServiceError::conflict(
            "Username already taken",
            "Choose another username",
        ));
    }

    let mut metadata = MetadataPatch::new();
    metadata.insert("username".into(), Value::from(form.username));
    if let Some(full_name) = form.full_name.filter(|n| !n.trim().is_empty()) {
        metadata.insert("full_name".into(), Value::from(full_name.trim()));
    }

    let outcome = identity
        .sign_up(SignUpRequest {
            email: form.email,
            password: form.password,
            metadata,
        })
        .await?;
    info!(user_id = %outcome.user.id, "Account registered");
    Ok(outcome)
}

/// Password sign-in; also retries provisioning for accounts without a profile
pub async fn sign_in(
    db: &DatabaseConnection,
    identity: &dyn IdentityProvider,
    email: &str,
    password: &str,
) -> ServiceResult<Session> {
    let session = identity.sign_in_with_password(email, password).await?;
    ensure_profile_best_effort(db, &session.user).await;
    Ok(session)
}

/// Only same-site relative paths are honoured as `next`
///
/// Browsers read both `//host` and `/\host` as protocol-relative.
fn safe_next(next: Option<&str>) -> String {
    let same_site = |path: &str| {
        path.starts_with('/') && !matches!(path.as_bytes().get(1), Some(b'/' | b'\\'))
    };
    match next {
        Some(path) if same_site(path) => path.to_string(),
        _ => DEFAULT_NEXT.to_string(),
    }
}

/// Redeem an email link (`token_hash` + `type`) or a redirect `code`
pub async fn complete_callback(
    db: &DatabaseConnection,
    identity: &dyn IdentityProvider,
    params: CallbackParams,
) -> ServiceResult<CallbackOutcome> {
    let (session, redirect_to) = match (params.token_hash.as_deref(), params.kind.as_deref()) {
        (Some(token_hash), Some(kind)) => {
            let kind: OtpKind = kind.parse()?;
            let session = identity.verify_email_token(token_hash, kind).await?;
            let redirect_to = match kind {
                OtpKind::Signup => "/verify-email/verify-success".to_string(),
                OtpKind::Recovery => "/update-password".to_string(),
                _ => safe_next(params.next.as_deref()),
            };
            (session, redirect_to)
        }
        _ => {
            let code = params
                .code
                .as_deref()
                .ok_or(snipdocs_auth::AuthError::InvalidToken)?;
            let session = identity.exchange_auth_code(code).await?;
            (session, safe_next(params.next.as_deref()))
        }
    };

    ensure_profile_best_effort(db, &session.user).await;
    debug!(user_id = %session.user.id, redirect_to = %redirect_to, "Callback completed");
    Ok(CallbackOutcome {
        session,
        redirect_to,
    })
}
