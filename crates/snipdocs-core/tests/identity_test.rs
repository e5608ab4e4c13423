//! Account flows through the database-backed identity provider

mod common;

use std::sync::Arc;

use common::{category_form, create_user, identity_provider, make_admin, setup_test_db};
use sea_orm::{EntityTrait, PaginatorTrait};
use snipdocs_auth::{link_param, AuthError, IdentityProvider, MemoryEmailSender, OAuthProvider};
use snipdocs_core::{
    complete_callback, create_category, get_profile, list_categories, register,
    seed_default_categories, sign_in, CallbackParams, LocalIdentityConfig, LocalIdentityProvider,
    RegistrationForm, ServiceError,
};
use snipdocs_db::entities::profile;

fn registration(email: &str, username: &str) -> RegistrationForm {
    RegistrationForm {
        email: email.to_string(),
        password: "correct horse".to_string(),
        username: username.to_string(),
        full_name: Some("New Writer".to_string()),
    }
}

fn code_params(link: &str) -> CallbackParams {
    CallbackParams {
        code: link_param(link, "code"),
        next: link_param(link, "next"),
        ..Default::default()
    }
}

fn token_params(link: &str) -> CallbackParams {
    CallbackParams {
        token_hash: link_param(link, "token_hash"),
        kind: link_param(link, "type"),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_register_confirm_and_sign_in() {
    let db = setup_test_db().await;
    let (provider, mailer) = identity_provider(&db);

    let outcome = register(&db, &provider, registration("New@Example.com", "newbie"))
        .await
        .unwrap();
    assert!(outcome.confirmation_sent);
    assert_eq!(outcome.user.email, "new@example.com");
    assert!(!outcome.user.email_verified());
    // Provisioning waits for the confirmed email
    assert_eq!(profile::Entity::find().count(&db).await.unwrap(), 0);

    let err = sign_in(&db, &provider, "new@example.com", "correct horse")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Auth(AuthError::EmailNotConfirmed)));

    let mail = mailer.last_to("new@example.com").expect("confirmation email");
    assert!(mail.link.starts_with("http://snipdocs.test/api/auth/callback?"));

    let callback = complete_callback(&db, &provider, code_params(&mail.link))
        .await
        .unwrap();
    assert_eq!(callback.redirect_to, "/verify-email/verify-success");
    assert!(callback.session.user.email_verified());

    let profile = get_profile(&db, outcome.user.id).await.unwrap();
    assert_eq!(profile.username, "newbie");
    assert_eq!(profile.full_name.as_deref(), Some("New Writer"));
    assert!(profile.is_verified);

    let session = sign_in(&db, &provider, "NEW@example.com", "correct horse")
        .await
        .unwrap();
    let user = provider
        .get_user(&session.access_token)
        .await
        .unwrap()
        .expect("session resolves to a user");
    assert_eq!(user.id, outcome.user.id);
    assert_eq!(user.metadata_str("username"), Some("newbie"));
}

#[tokio::test]
async fn test_auth_code_is_single_use() {
    let db = setup_test_db().await;
    let (provider, mailer) = identity_provider(&db);
    register(&db, &provider, registration("once@example.com", "once"))
        .await
        .unwrap();
    let link = mailer.last_to("once@example.com").unwrap().link;

    complete_callback(&db, &provider, code_params(&link))
        .await
        .unwrap();
    let err = complete_callback(&db, &provider, code_params(&link))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Auth(AuthError::InvalidToken)));
}

#[tokio::test]
async fn test_callback_rejects_missing_or_mismatched_tokens() {
    let db = setup_test_db().await;
    let (provider, mailer) = identity_provider(&db);

    let err = complete_callback(&db, &provider, CallbackParams::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Auth(AuthError::InvalidToken)));

    register(&db, &provider, registration("kind@example.com", "kinds"))
        .await
        .unwrap();
    provider.resend_verification("kind@example.com").await.unwrap();
    let link = mailer.last_to("kind@example.com").unwrap().link;

    // A signup token presented as a recovery token is rejected
    let mut params = token_params(&link);
    params.kind = Some("recovery".into());
    let err = complete_callback(&db, &provider, params).await.unwrap_err();
    assert!(matches!(err, ServiceError::Auth(AuthError::InvalidToken)));

    let mut params = token_params(&link);
    params.kind = Some("telepathy".into());
    let err = complete_callback(&db, &provider, params).await.unwrap_err();
    assert!(matches!(err, ServiceError::Auth(AuthError::InvalidToken)));

    let confirmed = complete_callback(&db, &provider, token_params(&link))
        .await
        .unwrap();
    assert_eq!(confirmed.redirect_to, "/verify-email/verify-success");
}

#[tokio::test]
async fn test_register_rejects_duplicates() {
    let db = setup_test_db().await;
    let (provider, _) = identity_provider(&db);
    create_user(&db, "taken").await;

    let err = register(&db, &provider, registration("fresh@example.com", "taken"))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict { .. }));

    register(&db, &provider, registration("dup@example.com", "first"))
        .await
        .unwrap();
    let err = register(&db, &provider, registration("DUP@example.com", "second"))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Auth(AuthError::EmailTaken)));
}

#[tokio::test]
async fn test_register_validates_form() {
    let db = setup_test_db().await;
    let (provider, mailer) = identity_provider(&db);

    let mut form = registration("not-an-email", "ok_name");
    form.password = "123".into();
    let err = register(&db, &provider, form).await.unwrap_err();
    match err {
        ServiceError::Validation(fields) => {
            assert!(fields.contains_key("email"));
            assert!(fields.contains_key("password"));
        }
        other => panic!("expected validation error, got {other:?}"),
    }
    assert!(mailer.sent().is_empty());
}

#[tokio::test]
async fn test_password_reset_flow() {
    let db = setup_test_db().await;
    let (provider, mailer) = identity_provider(&db);
    register(&db, &provider, registration("reset@example.com", "resetter"))
        .await
        .unwrap();
    let confirm = mailer.last_to("reset@example.com").unwrap().link;
    complete_callback(&db, &provider, code_params(&confirm))
        .await
        .unwrap();

    provider.reset_password_request("reset@example.com").await.unwrap();
    let link = mailer.last_to("reset@example.com").unwrap().link;
    assert_eq!(link_param(&link, "type").as_deref(), Some("recovery"));

    let recovered = complete_callback(&db, &provider, token_params(&link))
        .await
        .unwrap();
    assert_eq!(recovered.redirect_to, "/update-password");

    let user_id = recovered.session.user.id;
    let err = provider.set_password(user_id, "short").await.unwrap_err();
    assert!(matches!(err, AuthError::WeakPassword(_)));
    provider.set_password(user_id, "battery staple").await.unwrap();

    let err = sign_in(&db, &provider, "reset@example.com", "correct horse")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Auth(AuthError::InvalidCredentials)));
    sign_in(&db, &provider, "reset@example.com", "battery staple")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_unknown_and_confirmed_emails_get_no_mail() {
    let db = setup_test_db().await;
    let (provider, mailer) = identity_provider(&db);

    provider.reset_password_request("nobody@example.com").await.unwrap();
    provider.resend_verification("nobody@example.com").await.unwrap();
    assert!(mailer.sent().is_empty());

    register(&db, &provider, registration("done@example.com", "done"))
        .await
        .unwrap();
    let link = mailer.last_to("done@example.com").unwrap().link;
    complete_callback(&db, &provider, code_params(&link))
        .await
        .unwrap();

    provider.resend_verification("done@example.com").await.unwrap();
    assert_eq!(mailer.sent().len(), 1);
}

#[tokio::test]
async fn test_unknown_credentials_and_tokens() {
    let db = setup_test_db().await;
    let (provider, _) = identity_provider(&db);

    let err = sign_in(&db, &provider, "ghost@example.com", "whatever")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Auth(AuthError::InvalidCredentials)));

    assert!(provider.get_user("not.a.jwt").await.unwrap().is_none());
}

#[tokio::test]
async fn test_oauth_is_reported_unavailable() {
    let db = setup_test_db().await;
    let (provider, _) = identity_provider(&db);

    let err = provider
        .sign_in_with_oauth(OAuthProvider::Github, "/dashboard")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::OAuthUnavailable(OAuthProvider::Github)));
}

#[tokio::test]
async fn test_categories_are_admin_only() {
    let db = setup_test_db().await;
    let member = create_user(&db, "member").await;
    let admin = create_user(&db, "admin").await;
    make_admin(&db, admin).await;

    let err = create_category(&db, member, category_form("rust"))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden));

    let created = create_category(&db, admin, category_form("rust")).await.unwrap();
    assert_eq!(created.slug, "rust");
    assert!(created.is_active);

    let err = create_category(&db, admin, category_form("rust"))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict { .. }));

    let err = create_category(&db, admin, category_form("Not A Slug"))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
}

#[tokio::test]
async fn test_seed_default_categories_is_idempotent() {
    let db = setup_test_db().await;

    assert_eq!(seed_default_categories(&db).await.unwrap(), 6);
    assert_eq!(seed_default_categories(&db).await.unwrap(), 0);

    let slugs: Vec<_> = list_categories(&db)
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.slug)
        .collect();
    assert_eq!(
        slugs,
        ["frontend", "backend", "database", "devops", "algorithms", "tooling"]
    );
}

#[tokio::test]
async fn test_links_follow_public_url() {
    let db = setup_test_db().await;
    let mailer = Arc::new(MemoryEmailSender::new());
    let provider = LocalIdentityProvider::new(
        db.clone(),
        common::JWT_SECRET,
        mailer.clone(),
        LocalIdentityConfig {
            public_url: "https://docs.example.com/".to_string(),
            ..Default::default()
        },
    );

    register(&db, &provider, registration("slash@example.com", "slash"))
        .await
        .unwrap();
    let link = mailer.last_to("slash@example.com").unwrap().link;
    assert!(link.starts_with("https://docs.example.com/api/auth/callback?code="));
    assert_eq!(
        link_param(&link, "next").as_deref(),
        Some("/verify-email/verify-success")
    );

    let broken = LocalIdentityProvider::new(
        db.clone(),
        common::JWT_SECRET,
        mailer.clone(),
        LocalIdentityConfig {
            public_url: "not a url".to_string(),
            ..Default::default()
        },
    );
    let outcome = register(&db, &broken, registration("broken@example.com", "broken"))
        .await
        .unwrap();
    assert!(!outcome.confirmation_sent);
    assert!(mailer.last_to("broken@example.com").is_none());
}
