//! Shared fixtures for snipdocs-core integration tests

#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use snipdocs_auth::{MemoryEmailSender, UserIdentity};
use snipdocs_core::{
    ensure_profile, CategoryForm, DocumentForm, LocalIdentityConfig, LocalIdentityProvider,
};
use snipdocs_db::entities::{identity, ProfileRole};
use snipdocs_db::{connect, migrate};
use uuid::Uuid;

pub const JWT_SECRET: &[u8] = b"integration-test-secret";

pub async fn setup_test_db() -> DatabaseConnection {
    let db = connect("sqlite::memory:")
        .await
        .expect("Failed to connect to in-memory database");
    migrate(&db).await.expect("Failed to run migrations");
    db
}

/// Identity row with the given metadata, without a profile
pub async fn insert_identity(
    db: &DatabaseConnection,
    email: &str,
    metadata: serde_json::Value,
) -> UserIdentity {
    let id = Uuid::new_v4();
    identity::ActiveModel {
        id: Set(id),
        email: Set(email.to_string()),
        password_hash: Set(None),
        metadata: Set(metadata.to_string()),
        email_confirmed_at: Set(Some(Utc::now())),
        last_sign_in_at: Set(None),
        created_at: Set(Utc::now()),
        updated_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .expect("Failed to insert identity");

    let mut user = UserIdentity::new(id, email);
    if let serde_json::Value::Object(map) = metadata {
        user.metadata = map;
    }
    user
}

/// Identity plus provisioned profile; returns the user id
pub async fn create_user(db: &DatabaseConnection, username: &str) -> Uuid {
    let email = format!("{}@example.com", username);
    let user = insert_identity(db, &email, serde_json::json!({ "username": username })).await;
    let profile = ensure_profile(db, &user).await.expect("Failed to provision profile");
    assert_eq!(profile.username, username);
    user.id
}

pub async fn make_admin(db: &DatabaseConnection, user_id: Uuid) {
    use sea_orm::{EntityTrait, IntoActiveModel};
    use snipdocs_db::entities::profile;

    let mut model = profile::Entity::find_by_id(user_id)
        .one(db)
        .await
        .unwrap()
        .unwrap()
        .into_active_model();
    model.role = Set(ProfileRole::Admin);
    model.update(db).await.unwrap();
}

pub async fn create_category(db: &DatabaseConnection, slug: &str) -> Uuid {
    use sea_orm::EntityTrait;
    use snipdocs_db::entities::category;

    let now = Utc::now();
    let id = Uuid::new_v4();
    category::Entity::insert(category::ActiveModel {
        id: Set(id),
        name: Set(slug.to_uppercase()),
        slug: Set(slug.to_string()),
        description: Set(None),
        icon: Set(None),
        color: Set(None),
        is_active: Set(true),
        sort_order: Set(0),
        docs_count: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
    })
    .exec_without_returning(db)
    .await
    .expect("Failed to insert category");
    id
}

pub fn unique_slug(title: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}", snipdocs_core::text::slugify(title), &suffix[..6])
}

/// Minimal valid form with an explicit unique slug
pub fn document_form(title: &str, category_id: Uuid) -> DocumentForm {
    DocumentForm {
        title: title.to_string(),
        content: "fn main() { println!(\"hello world\"); }".to_string(),
        category_id: Some(category_id),
        slug: Some(unique_slug(title)),
        ..Default::default()
    }
}

pub fn category_form(slug: &str) -> CategoryForm {
    CategoryForm {
        name: format!("Category {}", slug),
        slug: slug.to_string(),
        ..Default::default()
    }
}

pub fn identity_provider(
    db: &DatabaseConnection,
) -> (LocalIdentityProvider, Arc<MemoryEmailSender>) {
    let mailer = Arc::new(MemoryEmailSender::new());
    let provider = LocalIdentityProvider::new(
        db.clone(),
        JWT_SECRET,
        mailer.clone(),
        LocalIdentityConfig {
            public_url: "http://snipdocs.test".to_string(),
            ..Default::default()
        },
    );
    (provider, mailer)
}
