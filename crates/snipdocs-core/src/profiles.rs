//! Profile provisioning and maintenance

use chrono::Utc;
use rand::Rng;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, Set,
};
use serde::Deserialize;
use serde_json::Value;
use snipdocs_auth::{IdentityProvider, MetadataPatch, UserIdentity};
use snipdocs_db::entities::{profile, ProfileRole};
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::error::{ServiceError, ServiceResult};
use crate::text::non_blank;
use crate::validation::{url_or_empty, username_chars};

/// Random-suffix attempts before falling back to a UUID fragment
pub const USERNAME_ATTEMPTS: usize = 10;

const USERNAME_MIN: usize = 3;
/// Leaves room for a `_NNNN` suffix under the 30 character limit
const USERNAME_BASE_MAX: usize = 24;

const AVATAR_PLACEHOLDER: &str = "https://api.dicebear.com/9.x/initials/svg";

/// Preferred username for a new identity, before uniqueness is resolved
///
/// Metadata `username`, then `user_name`, then `preferred_username`, then the
/// email local part. Characters outside `[A-Za-z0-9_-]` are dropped; if fewer
/// than three remain the next source is tried, ending at `user_<id prefix>`.
pub fn username_candidate(identity: &UserIdentity) -> String {
    let local_part = identity.email.split('@').next();
    let sources = ["username", "user_name", "preferred_username"]
        .iter()
        .map(|key| identity.metadata_str(key))
        .chain(std::iter::once(local_part));

    for source in sources.flatten() {
        let cleaned: String = source
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
            .take(USERNAME_BASE_MAX)
            .collect();
        if cleaned.len() >= USERNAME_MIN {
            return cleaned;
        }
    }

    let id = identity.id.simple().to_string();
    format!("user_{}", &id[..8])
}

/// Provider avatar, or a placeholder keyed by the email address
pub fn avatar_for(identity: &UserIdentity) -> String {
    if let Some(url) = identity.first_metadata_str(&["avatar_url", "picture", "avatar"]) {
        return url.to_string();
    }
    let params = [
        ("seed", identity.email.as_str()),
        ("backgroundColor", "indigo,purple,blue"),
    ];
    Url::parse_with_params(AVATAR_PLACEHOLDER, &params)
        .map(String::from)
        .unwrap_or_else(|_| AVATAR_PLACEHOLDER.to_string())
}

fn random_suffix() -> u16 {
    rand::thread_rng().gen_range(0..10_000)
}

pub async fn username_taken(db: &DatabaseConnection, username: &str) -> ServiceResult<bool> {
    let count = profile::Entity::find()
        .filter(profile::Column::Username.eq(username))
        .count(db)
        .await?;
    Ok(count > 0)
}

/// First free username derived from `base`
///
/// Tries `base`, then up to [`USERNAME_ATTEMPTS`] `base_NNNN` variants, then
/// `base_<uuid fragment>` which is unique in practice.
pub async fn resolve_username(db: &DatabaseConnection, base: &str) -> ServiceResult<String> {
    resolve_username_with(db, base, random_suffix).await
}

async fn resolve_username_with(
    db: &DatabaseConnection,
    base: &str,
    mut suffix: impl FnMut() -> u16,
) -> ServiceResult<String> {
    if !username_taken(db, base).await? {
        return Ok(base.to_string());
    }

    for _ in 0..USERNAME_ATTEMPTS {
        let candidate = format!("{}_{}", base, suffix());
        if !username_taken(db, &candidate).await? {
            return Ok(candidate);
        }
    }

    let fragment = Uuid::new_v4().simple().to_string();
    let candidate = format!("{}_{}", base, &fragment[..8]);
    warn!(
        base = %base,
        candidate = %candidate,
        "Username suffixes exhausted, using UUID fragment"
    );
    Ok(candidate)
}

async fn insert_profile(
    db: &DatabaseConnection,
    identity: &UserIdentity,
    username: String,
) -> ServiceResult<profile::Model> {
    let now = Utc::now();
    let model = profile::ActiveModel {
        id: Set(identity.id),
        username: Set(username),
        full_name: Set(identity
            .first_metadata_str(&["full_name", "name"])
            .map(str::to_string)),
        avatar_url: Set(Some(avatar_for(identity))),
        bio: Set(None),
        website: Set(None),
        github_url: Set(None),
        twitter_url: Set(None),
        linkedin_url: Set(None),
        role: Set(ProfileRole::Creator),
        is_verified: Set(identity.email_verified()),
        docs_count: Set(0),
        snippets_count: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
    };

    Ok(model.insert(db).await?)
}

/// Make sure `identity` has exactly one profile
///
/// Returns the existing profile untouched when there is one. A unique
/// violation on insert (a concurrent sign-in, or a username grabbed between
/// check and insert) is retried once.
pub async fn ensure_profile(
    db: &DatabaseConnection,
    identity: &UserIdentity,
) -> ServiceResult<profile::Model> {
    if let Some(existing) = profile::Entity::find_by_id(identity.id).one(db).await? {
        debug!(user_id = %identity.id, "Profile already exists");
        return Ok(existing);
    }

    let base = username_candidate(identity);
    let username = resolve_username(db, &base).await?;

    match insert_profile(db, identity, username).await {
        Ok(created) => {
            info!(user_id = %created.id, username = %created.username, "Created profile");
            Ok(created)
        }
        Err(err) if err.is_unique_violation() => {
            if let Some(existing) = profile::Entity::find_by_id(identity.id).one(db).await? {
                return Ok(existing);
            }
            debug!(user_id = %identity.id, "Username raced, retrying once");
            let username = resolve_username(db, &base).await?;
            let created = insert_profile(db, identity, username).await?;
            info!(user_id = %created.id, username = %created.username, "Created profile");
            Ok(created)
        }
        Err(err) => Err(err),
    }
}

/// [`ensure_profile`] for authentication flows: failures are logged, never returned
pub async fn ensure_profile_best_effort(
    db: &DatabaseConnection,
    identity: &UserIdentity,
) -> Option<profile::Model> {
    match ensure_profile(db, identity).await {
        Ok(profile) => Some(profile),
        Err(err) => {
            warn!(user_id = %identity.id, error = %err, "Profile provisioning failed");
            None
        }
    }
}

pub async fn get_profile(db: &DatabaseConnection, user_id: Uuid) -> ServiceResult<profile::Model> {
    profile::Entity::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or(ServiceError::NotFound)
}

pub async fn get_profile_by_username(
    db: &DatabaseConnection,
    username: &str,
) -> ServiceResult<profile::Model> {
    profile::Entity::find()
        .filter(profile::Column::Username.eq(username))
        .one(db)
        .await?
        .ok_or(ServiceError::NotFound)
}

pub async fn is_admin(db: &DatabaseConnection, user_id: Uuid) -> ServiceResult<bool> {
    Ok(profile::Entity::find_by_id(user_id)
        .one(db)
        .await?
        .is_some_and(|p| p.role == ProfileRole::Admin))
}

fn full_name_or_empty(value: &str) -> Result<(), ValidationError> {
    let len = value.trim().chars().count();
    if value.is_empty() || (2..=100).contains(&len) {
        Ok(())
    } else {
        Err(ValidationError::new("length")
            .with_message("Full name must be between 2 and 100 characters".into()))
    }
}

/// Partial profile update; `Some("")` clears a field
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ProfilePatch {
    #[validate(
        length(min = 3, max = 30, message = "Username must be between 3 and 30 characters"),
        custom(function = "username_chars")
    )]
    pub username: Option<String>,

    #[validate(custom(function = "full_name_or_empty"))]
    pub full_name: Option<String>,

    #[validate(length(max = 500, message = "Bio must be less than 500 characters"))]
    pub bio: Option<String>,

    #[validate(custom(function = "url_or_empty"))]
    pub avatar_url: Option<String>,

    #[validate(custom(function = "url_or_empty"))]
    pub website: Option<String>,

    #[validate(custom(function = "crate::validation::github_url"))]
    pub github_url: Option<String>,

    #[validate(custom(function = "crate::validation::twitter_url"))]
    pub twitter_url: Option<String>,

    #[validate(custom(function = "crate::validation::linkedin_url"))]
    pub linkedin_url: Option<String>,
}

fn apply_optional(
    target: &mut sea_orm::ActiveValue<Option<String>>,
    value: Option<&String>,
) {
    if let Some(value) = value {
        *target = Set(non_blank(Some(value)));
    }
}

/// Update the caller's own profile and mirror display fields into identity metadata
pub async fn update_profile(
    db: &DatabaseConnection,
    identity: &dyn IdentityProvider,
    user_id: Uuid,
    patch: ProfilePatch,
) -> ServiceResult<profile::Model> {
    patch.validate()?;

    let current = get_profile(db, user_id).await?;

    if let Some(username) = patch.username.as_deref() {
        if username != current.username && username_taken(db, username).await? {
            return Err(ServiceError::conflict(
                "Username already taken",
                "Choose another username",
            ));
        }
    }

    let mut model = current.into_active_model();
    if let Some(username) = &patch.username {
        model.username = Set(username.clone());
    }
    apply_optional(&mut model.full_name, patch.full_name.as_ref());
    apply_optional(&mut model.bio, patch.bio.as_ref());
    apply_optional(&mut model.avatar_url, patch.avatar_url.as_ref());
    apply_optional(&mut model.website, patch.website.as_ref());
    apply_optional(&mut model.github_url, patch.github_url.as_ref());
    apply_optional(&mut model.twitter_url, patch.twitter_url.as_ref());
    apply_optional(&mut model.linkedin_url, patch.linkedin_url.as_ref());
    model.updated_at = Set(Utc::now());

    let updated = model.update(db).await.map_err(|err| {
        ServiceError::from_db_conflict(err, "Username already taken", "Choose another username")
    })?;
    info!(user_id = %user_id, "Updated profile");

    let mut mirror = MetadataPatch::new();
    mirror.insert("username".into(), Value::from(updated.username.clone()));
    mirror.insert("full_name".into(), updated.full_name.clone().into());
    mirror.insert("avatar_url".into(), updated.avatar_url.clone().into());
    if let Err(err) = identity.update_metadata(user_id, mirror).await {
        warn!(user_id = %user_id, error = %err, "Failed to mirror profile into identity metadata");
    }

    Ok(updated)
}
