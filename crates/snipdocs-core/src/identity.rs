//! Database-backed identity provider
//!
//! Accounts live in `identities` with Argon2id password hashes. Email links
//! carry a random token whose SHA-256 is stored in `one_time_tokens`; each
//! token is single use and expires after a day. Sessions are HS256 JWTs.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, IntoActiveModel,
    QueryFilter, Set,
};
use serde_json::{Map, Value};
use snipdocs_auth::{
    check_password_policy, generate_token, hash_password, hash_token,
    verify_password, AuthError, EmailMessage, EmailSender, IdentityProvider, JwtValidator,
    MetadataPatch, OAuthProvider, OAuthRedirect, OtpKind, Session, SessionClaims, SignUpOutcome,
    SignUpRequest, UserIdentity,
};
use snipdocs_db::entities::{identity, one_time_token, TokenKind};
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;
use validator::ValidateEmail;

#[derive(Debug, Clone)]
pub struct LocalIdentityConfig {
    /// `iss` claim of issued sessions
    pub issuer: String,
    pub session_ttl: Duration,
    pub token_ttl: Duration,
    /// Base URL used in email links
    pub public_url: String,
}

impl Default for LocalIdentityConfig {
    fn default() -> Self {
        Self {
            issuer: "snipdocs".to_string(),
            session_ttl: Duration::hours(24),
            token_ttl: Duration::hours(24),
            public_url: "http://localhost:3080".to_string(),
        }
    }
}

pub struct LocalIdentityProvider {
    db: DatabaseConnection,
    jwt: JwtValidator,
    mailer: Arc<dyn EmailSender>,
    config: LocalIdentityConfig,
}

fn db_err(err: DbErr) -> AuthError {
    match err {
        DbErr::Conn(_) | DbErr::ConnectionAcquire(_) => AuthError::Unavailable(err.to_string()),
        other => AuthError::Provider(other.to_string()),
    }
}

fn token_kind(kind: OtpKind) -> TokenKind {
    match kind {
        OtpKind::Signup => TokenKind::Signup,
        OtpKind::Recovery => TokenKind::Recovery,
        OtpKind::MagicLink => TokenKind::MagicLink,
        OtpKind::EmailChange => TokenKind::EmailChange,
    }
}

fn parse_metadata(raw: &str) -> Map<String, Value> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

fn to_user(model: &identity::Model) -> UserIdentity {
    UserIdentity {
        id: model.id,
        email: model.email.clone(),
        metadata: parse_metadata(&model.metadata),
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl LocalIdentityProvider {
    pub fn new(
        db: DatabaseConnection,
        jwt_secret: &[u8],
        mailer: Arc<dyn EmailSender>,
        config: LocalIdentityConfig,
    ) -> Self {
        Self {
            db,
            jwt: JwtValidator::new(jwt_secret).with_issuer(&config.issuer),
            mailer,
            config,
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<identity::Model>, AuthError> {
        identity::Entity::find()
            .filter(identity::Column::Email.eq(normalize_email(email)))
            .one(&self.db)
            .await
            .map_err(db_err)
    }

    fn issue_session(&self, model: &identity::Model) -> Result<Session, AuthError> {
        let claims = SessionClaims::new(
            model.id,
            model.email.clone(),
            &self.config.issuer,
            self.config.session_ttl,
        );
        let access_token = self
            .jwt
            .encode(&claims)
            .map_err(|e| AuthError::Provider(e.to_string()))?;
        let expires_at = DateTime::<Utc>::from_timestamp(claims.exp, 0)
            .unwrap_or_else(|| Utc::now() + self.config.session_ttl);

        Ok(Session {
            access_token,
            token_type: "bearer".to_string(),
            expires_at,
            user: to_user(model),
        })
    }

    /// Store a fresh one-time token and return the raw value for the link
    async fn issue_token(&self, identity_id: Uuid, kind: TokenKind) -> Result<String, AuthError> {
        let token = generate_token();
        let now = Utc::now();
        one_time_token::ActiveModel {
            id: Set(Uuid::new_v4()),
            identity_id: Set(identity_id),
            kind: Set(kind),
            token_hash: Set(hash_token(&token)),
            expires_at: Set(now + self.config.token_ttl),
            consumed_at: Set(None),
            created_at: Set(now),
        }
        .insert(&self.db)
        .await
        .map_err(db_err)?;
        Ok(token)
    }

    /// Mark a live token consumed and return its identity
    async fn redeem_token(
        &self,
        raw: &str,
        kind: TokenKind,
    ) -> Result<identity::Model, AuthError> {
        let now = Utc::now();
        let token = one_time_token::Entity::find()
            .filter(one_time_token::Column::TokenHash.eq(hash_token(raw)))
            .filter(one_time_token::Column::Kind.eq(kind))
            .filter(one_time_token::Column::ConsumedAt.is_null())
            .filter(one_time_token::Column::ExpiresAt.gt(now))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or(AuthError::InvalidToken)?;

        // Filtered on `consumed_at IS NULL` so only one redeemer wins
        let result = one_time_token::Entity::update_many()
            .col_expr(
                one_time_token::Column::ConsumedAt,
                sea_orm::sea_query::Expr::value(Some(now)),
            )
            .filter(one_time_token::Column::Id.eq(token.id))
            .filter(one_time_token::Column::ConsumedAt.is_null())
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        if result.rows_affected == 0 {
            return Err(AuthError::InvalidToken);
        }

        identity::Entity::find_by_id(token.identity_id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or(AuthError::UserNotFound)
    }

    /// Confirm the email (if not yet) and record the sign-in
    async fn complete_sign_in(
        &self,
        model: identity::Model,
        confirm_email: bool,
    ) -> Result<Session, AuthError> {
        let now = Utc::now();
        let mut metadata = parse_metadata(&model.metadata);
        let mut active = model.clone().into_active_model();

        if confirm_email && model.email_confirmed_at.is_none() {
            active.email_confirmed_at = Set(Some(now));
            metadata.insert("email_verified".into(), Value::Bool(true));
            active.metadata = Set(Value::Object(metadata).to_string());
            info!(user_id = %model.id, "Email confirmed");
        }
        active.last_sign_in_at = Set(Some(now));
        active.updated_at = Set(now);

        let updated = active.update(&self.db).await.map_err(db_err)?;
        self.issue_session(&updated)
    }

    /// Callback URL under `public_url` carrying `params`
    fn link(&self, params: &[(&str, &str)]) -> Result<String, url::ParseError> {
        let base = self.config.public_url.trim_end_matches('/');
        let mut url = Url::parse(&format!("{}/api/auth/callback", base))?;
        url.query_pairs_mut().extend_pairs(params);
        Ok(url.into())
    }

    fn send(&self, to: &str, subject: &str, body: &str, params: &[(&str, &str)]) -> bool {
        let link = match self.link(params) {
            Ok(link) => link,
            Err(err) => {
                warn!(
                    public_url = %self.config.public_url,
                    error = %err,
                    "Invalid public URL, email not sent"
                );
                return false;
            }
        };
        let message = EmailMessage {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
            link,
        };
        match self.mailer.send(message) {
            Ok(()) => true,
            Err(err) => {
                warn!(to = %to, error = %err, "Failed to send email");
                false
            }
        }
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    async fn get_user(&self, access_token: &str) -> Result<Option<UserIdentity>, AuthError> {
        let claims = match self.jwt.validate(access_token) {
            Ok(claims) => claims,
            Err(err) => {
                debug!("Rejected session token: {}", err);
                return Ok(None);
            }
        };
        let Some(user_id) = claims.user_id() else {
            return Ok(None);
        };

        let model = identity::Entity::find_by_id(user_id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.as_ref().map(to_user))
    }

    async fn sign_up(&self, request: SignUpRequest) -> Result<SignUpOutcome, AuthError> {
        let email = normalize_email(&request.email);
        if !email.validate_email() {
            return Err(AuthError::InvalidEmail);
        }
        check_password_policy(&request.password).map_err(AuthError::WeakPassword)?;

        if self.find_by_email(&email).await?.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let password_hash =
            hash_password(&request.password).map_err(|e| AuthError::Provider(e.to_string()))?;
        let mut metadata = request.metadata;
        metadata.insert("email_verified".into(), Value::Bool(false));

        let now = Utc::now();
        let created = identity::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(email.clone()),
            password_hash: Set(Some(password_hash)),
            metadata: Set(Value::Object(metadata).to_string()),
            email_confirmed_at: Set(None),
            last_sign_in_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await
        .map_err(|err| match err.sql_err() {
            Some(sea_orm::SqlErr::UniqueConstraintViolation(_)) => AuthError::EmailTaken,
            _ => db_err(err),
        })?;
        info!(user_id = %created.id, "Registered identity");

        let code = self.issue_token(created.id, TokenKind::AuthCode).await?;
        let confirmation_sent = self.send(
            &email,
            "Confirm your email",
            "Follow the link to confirm your email address.",
            &[("code", code.as_str()), ("next", "/verify-email/verify-success")],
        );

        Ok(SignUpOutcome {
            user: to_user(&created),
            confirmation_sent,
        })
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let model = self
            .find_by_email(email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        let hash = model
            .password_hash
            .as_deref()
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(password, hash).map_err(|e| AuthError::Provider(e.to_string()))? {
            return Err(AuthError::InvalidCredentials);
        }
        if model.email_confirmed_at.is_none() {
            return Err(AuthError::EmailNotConfirmed);
        }

        debug!(user_id = %model.id, "Password sign-in");
        self.complete_sign_in(model, false).await
    }

    async fn sign_in_with_oauth(
        &self,
        provider: OAuthProvider,
        _redirect_to: &str,
    ) -> Result<OAuthRedirect, AuthError> {
        Err(AuthError::OAuthUnavailable(provider))
    }

    async fn verify_email_token(
        &self,
        token_hash: &str,
        kind: OtpKind,
    ) -> Result<Session, AuthError> {
        let model = self.redeem_token(token_hash, token_kind(kind)).await?;
        debug!(user_id = %model.id, kind = %kind, "Redeemed email token");
        // Any email link proves control of the mailbox
        self.complete_sign_in(model, true).await
    }

    async fn exchange_auth_code(&self, code: &str) -> Result<Session, AuthError> {
        let model = self.redeem_token(code, TokenKind::AuthCode).await?;
        debug!(user_id = %model.id, "Exchanged auth code");
        self.complete_sign_in(model, true).await
    }

    async fn reset_password_request(&self, email: &str) -> Result<(), AuthError> {
        let Some(model) = self.find_by_email(email).await? else {
            debug!("Password reset requested for unknown email");
            return Ok(());
        };

        let token = self.issue_token(model.id, TokenKind::Recovery).await?;
        self.send(
            &model.email,
            "Reset your password",
            "Follow the link to choose a new password.",
            &[("token_hash", token.as_str()), ("type", "recovery")],
        );
        info!(user_id = %model.id, "Password reset requested");
        Ok(())
    }

    async fn set_password(&self, user_id: Uuid, new_password: &str) -> Result<(), AuthError> {
        check_password_policy(new_password).map_err(AuthError::WeakPassword)?;
        let model = identity::Entity::find_by_id(user_id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or(AuthError::UserNotFound)?;

        let hash = hash_password(new_password).map_err(|e| AuthError::Provider(e.to_string()))?;
        let mut active = model.into_active_model();
        active.password_hash = Set(Some(hash));
        active.updated_at = Set(Utc::now());
        active.update(&self.db).await.map_err(db_err)?;

        info!(user_id = %user_id, "Password updated");
        Ok(())
    }

    async fn resend_verification(&self, email: &str) -> Result<(), AuthError> {
        let Some(model) = self.find_by_email(email).await? else {
            return Ok(());
        };
        if model.email_confirmed_at.is_some() {
            debug!(user_id = %model.id, "Email already confirmed, not resending");
            return Ok(());
        }

        let token = self.issue_token(model.id, TokenKind::Signup).await?;
        self.send(
            &model.email,
            "Confirm your email",
            "Follow the link to confirm your email address.",
            &[("token_hash", token.as_str()), ("type", "signup")],
        );
        Ok(())
    }

    async fn update_metadata(
        &self,
        user_id: Uuid,
        patch: MetadataPatch,
    ) -> Result<UserIdentity, AuthError> {
        let model = identity::Entity::find_by_id(user_id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or(AuthError::UserNotFound)?;

        let mut metadata = parse_metadata(&model.metadata);
        for (key, value) in patch {
            if value.is_null() {
                metadata.remove(&key);
            } else {
                metadata.insert(key, value);
            }
        }

        let mut active = model.into_active_model();
        active.metadata = Set(Value::Object(metadata).to_string());
        active.updated_at = Set(Utc::now());
        let updated = active.update(&self.db).await.map_err(db_err)?;
        Ok(to_user(&updated))
    }
}
