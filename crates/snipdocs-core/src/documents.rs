//! Document publish pipeline
//!
//! Create and update derive the computed columns (slug, reading time,
//! publish timestamp, SEO fallbacks) and rewrite tag links in the same
//! transaction as the document row. Every write is filtered on
//! `author_id`, so a caller can never touch a document they do not own.

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, QueryFilter, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use snipdocs_db::entities::{
    bookmark, category, document, like, profile, tag, Difficulty, DocumentStatus,
    TargetType, Visibility,
};
use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

use crate::error::{merge_validation, FieldErrors, ServiceError, ServiceResult};
use crate::tags::{reconcile_tags_in, tags_for_document};
use crate::text::{document_slug, non_blank, reading_time, truncate_chars};
use crate::validation::{slug_format, url_or_empty};

const SLUG_TAKEN: &str = "A document with this slug already exists";
const SLUG_HINT: &str = "Change the title or choose a different slug";

/// Column widths of `meta_title` and `meta_description`
pub const META_TITLE_MAX: usize = 60;
pub const META_DESCRIPTION_MAX: usize = 160;

/// Submitted form for a new document
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct DocumentForm {
    #[validate(length(min = 3, max = 200, message = "Title must be between 3 and 200 characters"))]
    pub title: String,

    #[validate(length(min = 10, message = "Content must be at least 10 characters"))]
    pub content: String,

    pub excerpt: Option<String>,

    /// Required; kept optional so a missing value is a field error, not a parse error
    pub category_id: Option<Uuid>,

    #[validate(custom(function = "slug_format"))]
    pub slug: Option<String>,

    pub difficulty: Option<Difficulty>,

    pub status: Option<DocumentStatus>,

    pub visibility: Option<Visibility>,

    pub tags: Option<Vec<String>>,

    #[validate(length(max = 60, message = "Meta title must be at most 60 characters"))]
    pub meta_title: Option<String>,

    #[validate(length(max = 160, message = "Meta description must be at most 160 characters"))]
    pub meta_description: Option<String>,

    #[validate(length(max = 10, message = "At most 10 keywords"))]
    pub meta_keywords: Option<Vec<String>>,

    #[validate(custom(function = "url_or_empty"))]
    pub thumbnail_url: Option<String>,
}

/// Partial update; absent fields are left untouched
///
/// `tags: None` leaves links alone, `tags: Some(vec![])` removes them all.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct DocumentPatch {
    #[validate(length(min = 3, max = 200, message = "Title must be between 3 and 200 characters"))]
    pub title: Option<String>,

    #[validate(length(min = 10, message = "Content must be at least 10 characters"))]
    pub content: Option<String>,

    pub excerpt: Option<String>,

    pub category_id: Option<Uuid>,

    pub difficulty: Option<Difficulty>,

    pub status: Option<DocumentStatus>,

    pub visibility: Option<Visibility>,

    pub tags: Option<Vec<String>>,

    #[validate(length(max = 60, message = "Meta title must be at most 60 characters"))]
    pub meta_title: Option<String>,

    #[validate(length(max = 160, message = "Meta description must be at most 160 characters"))]
    pub meta_description: Option<String>,

    #[validate(length(max = 10, message = "At most 10 keywords"))]
    pub meta_keywords: Option<Vec<String>>,

    #[validate(custom(function = "url_or_empty"))]
    pub thumbnail_url: Option<String>,
}

/// A document together with its tags
#[derive(Debug, Clone, Serialize)]
pub struct DocumentDetail {
    pub document: document::Model,
    pub tags: Vec<tag::Model>,
}

/// Empty keyword lists are stored as NULL
fn encode_keywords(keywords: &[String]) -> Option<String> {
    if keywords.is_empty() {
        None
    } else {
        serde_json::to_string(keywords).ok()
    }
}

/// Publish timestamp after moving from `current` to `next`
///
/// Entering `published` stamps now, staying published keeps the original
/// stamp, anything else clears it.
fn next_published_at(
    current: Option<(DocumentStatus, Option<chrono::DateTime<Utc>>)>,
    next: DocumentStatus,
) -> Option<chrono::DateTime<Utc>> {
    match (current, next) {
        (Some((DocumentStatus::Published, Some(stamp))), DocumentStatus::Published) => Some(stamp),
        (_, DocumentStatus::Published) => Some(Utc::now()),
        _ => None,
    }
}

async fn check_category<C: ConnectionTrait>(
    conn: &C,
    category_id: Option<Uuid>,
    required: bool,
    errors: &mut FieldErrors,
) -> ServiceResult<()> {
    match category_id {
        None if required => {
            errors
                .entry("category_id".into())
                .or_default()
                .push("Category is required".into());
        }
        None => {}
        Some(id) => {
            if category::Entity::find_by_id(id).one(conn).await?.is_none() {
                errors
                    .entry("category_id".into())
                    .or_default()
                    .push("Category does not exist".into());
            }
        }
    }
    Ok(())
}

async fn bump_category<C: ConnectionTrait>(
    conn: &C,
    category_id: Option<Uuid>,
    delta: i32,
) -> ServiceResult<()> {
    if let Some(id) = category_id {
        category::Entity::update_many()
            .col_expr(
                category::Column::DocsCount,
                Expr::col(category::Column::DocsCount).add(delta),
            )
            .filter(category::Column::Id.eq(id))
            .exec(conn)
            .await?;
    }
    Ok(())
}

async fn bump_author<C: ConnectionTrait>(
    conn: &C,
    author_id: Uuid,
    delta: i32,
) -> ServiceResult<()> {
    profile::Entity::update_many()
        .col_expr(
            profile::Column::DocsCount,
            Expr::col(profile::Column::DocsCount).add(delta),
        )
        .filter(profile::Column::Id.eq(author_id))
        .exec(conn)
        .await?;
    Ok(())
}

/// Create a document owned by `author_id`
pub async fn create_document(
    db: &DatabaseConnection,
    author_id: Uuid,
    mut form: DocumentForm,
) -> ServiceResult<DocumentDetail> {
    form.title = form.title.trim().to_string();
    let mut extra = FieldErrors::new();
    check_category(db, form.category_id, true, &mut extra).await?;
    merge_validation(form.validate(), extra)?;

    let now = Utc::now();
    let status = form.status.unwrap_or(DocumentStatus::Draft);
    let excerpt = non_blank(form.excerpt.as_deref());
    let slug = match non_blank(form.slug.as_deref()) {
        Some(slug) => slug,
        None => document_slug(&form.title),
    };
    let meta_title = non_blank(form.meta_title.as_deref())
        .unwrap_or_else(|| truncate_chars(&form.title, META_TITLE_MAX));
    let meta_description = non_blank(form.meta_description.as_deref()).unwrap_or_else(|| {
        truncate_chars(excerpt.as_deref().unwrap_or(&form.title), META_DESCRIPTION_MAX)
    });

    let model = document::ActiveModel {
        id: Set(Uuid::new_v4()),
        author_id: Set(author_id),
        title: Set(form.title.clone()),
        slug: Set(slug),
        reading_time: Set(reading_time(&form.content)),
        content: Set(form.content),
        excerpt: Set(excerpt),
        category_id: Set(form.category_id),
        difficulty: Set(form.difficulty.unwrap_or(Difficulty::Beginner)),
        status: Set(status),
        visibility: Set(form.visibility.unwrap_or(Visibility::Private)),
        view_count: Set(0),
        like_count: Set(0),
        bookmark_count: Set(0),
        comment_count: Set(0),
        meta_title: Set(Some(meta_title)),
        meta_description: Set(Some(meta_description)),
        meta_keywords: Set(encode_keywords(form.meta_keywords.as_deref().unwrap_or_default())),
        thumbnail_url: Set(non_blank(form.thumbnail_url.as_deref())),
        published_at: Set(next_published_at(None, status)),
        created_at: Set(now),
        updated_at: Set(now),
    };

    let txn = db.begin().await?;
    let document = model
        .insert(&txn)
        .await
        .map_err(|err| ServiceError::from_db_conflict(err, SLUG_TAKEN, SLUG_HINT))?;

    let tags = match form.tags.as_deref() {
        Some(names) if !names.is_empty() => reconcile_tags_in(&txn, document.id, names).await?,
        _ => Vec::new(),
    };

    bump_author(&txn, author_id, 1).await?;
    bump_category(&txn, document.category_id, 1).await?;
    txn.commit().await?;

    info!(
        document_id = %document.id,
        author_id = %author_id,
        slug = %document.slug,
        tags = tags.len(),
        "Created document"
    );
    Ok(DocumentDetail { document, tags })
}

/// Apply `patch` to a document owned by `author_id`
///
/// A document that does not exist and one owned by someone else both
/// produce [`ServiceError::NotFound`].
pub async fn update_document(
    db: &DatabaseConnection,
    author_id: Uuid,
    document_id: Uuid,
    mut patch: DocumentPatch,
) -> ServiceResult<DocumentDetail> {
    patch.title = patch.title.map(|title| title.trim().to_string());
    let mut extra = FieldErrors::new();
    check_category(db, patch.category_id, false, &mut extra).await?;
    merge_validation(patch.validate(), extra)?;

    let txn = db.begin().await?;
    let current = document::Entity::find_by_id(document_id)
        .filter(document::Column::AuthorId.eq(author_id))
        .one(&txn)
        .await?
        .ok_or(ServiceError::NotFound)?;

    let mut changes = <document::ActiveModel as ActiveModelTrait>::default();
    changes.updated_at = Set(Utc::now());

    if let Some(title) = &patch.title {
        changes.title = Set(title.clone());
    }
    if let Some(content) = &patch.content {
        changes.reading_time = Set(reading_time(content));
        changes.content = Set(content.clone());
    }
    if let Some(excerpt) = &patch.excerpt {
        changes.excerpt = Set(non_blank(Some(excerpt)));
    }
    if let Some(category_id) = patch.category_id {
        changes.category_id = Set(Some(category_id));
    }
    if let Some(difficulty) = patch.difficulty {
        changes.difficulty = Set(difficulty);
    }
    if let Some(visibility) = patch.visibility {
        changes.visibility = Set(visibility);
    }
    if let Some(status) = patch.status {
        changes.status = Set(status);
        changes.published_at = Set(next_published_at(
            Some((current.status, current.published_at)),
            status,
        ));
    }
    if let Some(meta_title) = &patch.meta_title {
        changes.meta_title = Set(non_blank(Some(meta_title)));
    }
    if let Some(meta_description) = &patch.meta_description {
        changes.meta_description = Set(non_blank(Some(meta_description)));
    }
    if let Some(keywords) = &patch.meta_keywords {
        changes.meta_keywords = Set(encode_keywords(keywords));
    }
    if let Some(thumbnail_url) = &patch.thumbnail_url {
        changes.thumbnail_url = Set(non_blank(Some(thumbnail_url)));
    }

    let result = document::Entity::update_many()
        .set(changes)
        .filter(document::Column::Id.eq(document_id))
        .filter(document::Column::AuthorId.eq(author_id))
        .exec(&txn)
        .await?;
    if result.rows_affected == 0 {
        return Err(ServiceError::NotFound);
    }

    if let Some(names) = patch.tags.as_deref() {
        reconcile_tags_in(&txn, document_id, names).await?;
    }

    if let Some(new_category) = patch.category_id {
        if current.category_id != Some(new_category) {
            bump_category(&txn, current.category_id, -1).await?;
            bump_category(&txn, Some(new_category), 1).await?;
        }
    }

    let detail = load_detail(&txn, document_id).await?;
    txn.commit().await?;

    info!(document_id = %document_id, author_id = %author_id, "Updated document");
    Ok(detail)
}

/// Delete a document owned by `author_id`, with its tag links and engagement rows
pub async fn delete_document(
    db: &DatabaseConnection,
    author_id: Uuid,
    document_id: Uuid,
) -> ServiceResult<()> {
    let txn = db.begin().await?;
    let current = document::Entity::find_by_id(document_id)
        .filter(document::Column::AuthorId.eq(author_id))
        .one(&txn)
        .await?
        .ok_or(ServiceError::NotFound)?;

    // Release tag usage before the cascade drops the links
    reconcile_tags_in(&txn, document_id, &[]).await?;

    like::Entity::delete_many()
        .filter(like::Column::LikeableId.eq(document_id))
        .filter(like::Column::LikeableType.eq(TargetType::Document))
        .exec(&txn)
        .await?;
    bookmark::Entity::delete_many()
        .filter(bookmark::Column::BookmarkableId.eq(document_id))
        .filter(bookmark::Column::BookmarkableType.eq(TargetType::Document))
        .exec(&txn)
        .await?;

    let result = document::Entity::delete_many()
        .filter(document::Column::Id.eq(document_id))
        .filter(document::Column::AuthorId.eq(author_id))
        .exec(&txn)
        .await?;
    if result.rows_affected == 0 {
        return Err(ServiceError::NotFound);
    }

    bump_author(&txn, author_id, -1).await?;
    bump_category(&txn, current.category_id, -1).await?;
    txn.commit().await?;

    info!(document_id = %document_id, author_id = %author_id, "Deleted document");
    Ok(())
}

async fn load_detail<C: ConnectionTrait>(
    conn: &C,
    document_id: Uuid,
) -> ServiceResult<DocumentDetail> {
    let document = document::Entity::find_by_id(document_id)
        .one(conn)
        .await?
        .ok_or(ServiceError::NotFound)?;
    let tags = tags_for_document(conn, document_id).await?;
    Ok(DocumentDetail { document, tags })
}

/// Any document owned by the caller, whatever its status
pub async fn get_own_document(
    db: &DatabaseConnection,
    author_id: Uuid,
    document_id: Uuid,
) -> ServiceResult<DocumentDetail> {
    let document = document::Entity::find_by_id(document_id)
        .filter(document::Column::AuthorId.eq(author_id))
        .one(db)
        .await?
        .ok_or(ServiceError::NotFound)?;
    let tags = tags_for_document(db, document.id).await?;
    Ok(DocumentDetail { document, tags })
}

/// A published, public document by slug
pub async fn get_published_by_slug(
    db: &DatabaseConnection,
    slug: &str,
) -> ServiceResult<DocumentDetail> {
    let document = document::Entity::find()
        .filter(document::Column::Slug.eq(slug))
        .filter(document::Column::Status.eq(DocumentStatus::Published))
        .filter(document::Column::Visibility.eq(Visibility::Public))
        .one(db)
        .await?
        .ok_or(ServiceError::NotFound)?;
    let tags = tags_for_document(db, document.id).await?;
    Ok(DocumentDetail { document, tags })
}

/// Count one view of a document
pub async fn record_view(db: &DatabaseConnection, document_id: Uuid) -> ServiceResult<()> {
    document::Entity::update_many()
        .col_expr(
            document::Column::ViewCount,
            Expr::col(document::Column::ViewCount).add(1),
        )
        .filter(document::Column::Id.eq(document_id))
        .exec(db)
        .await?;
    debug!(document_id = %document_id, "Recorded view");
    Ok(())
}
