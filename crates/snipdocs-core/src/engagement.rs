//! Like and bookmark toggles
//!
//! Each toggle runs as one transaction: look up the caller's row, then either
//! delete it and decrement the document counter or insert it and increment.
//! The unique index on (user, target id, target type) backs this up, so a
//! racing duplicate insert fails and rolls back instead of double counting.

use std::collections::HashMap;

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use snipdocs_db::entities::{bookmark, document, like, TargetType};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{ServiceError, ServiceResult};
use crate::queries::is_visible_to;

pub const NOTES_MAX: usize = 500;

/// What an engagement points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum EngagementTarget {
    Document(Uuid),
    /// Accepted at the boundary; there is no comment store yet
    Comment(Uuid),
}

impl EngagementTarget {
    pub fn new(target_type: TargetType, id: Uuid) -> Self {
        match target_type {
            TargetType::Document => EngagementTarget::Document(id),
            TargetType::Comment => EngagementTarget::Comment(id),
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            EngagementTarget::Document(id) | EngagementTarget::Comment(id) => *id,
        }
    }

    pub fn target_type(&self) -> TargetType {
        match self {
            EngagementTarget::Document(_) => TargetType::Document,
            EngagementTarget::Comment(_) => TargetType::Comment,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EngagementState {
    pub liked: bool,
    pub bookmarked: bool,
}

#[derive(Clone, Copy)]
enum Counter {
    Likes,
    Bookmarks,
}

impl Counter {
    fn column(self) -> document::Column {
        match self {
            Counter::Likes => document::Column::LikeCount,
            Counter::Bookmarks => document::Column::BookmarkCount,
        }
    }
}

async fn bump<C: ConnectionTrait>(
    conn: &C,
    document_id: Uuid,
    counter: Counter,
    delta: i32,
) -> ServiceResult<()> {
    document::Entity::update_many()
        .col_expr(counter.column(), Expr::col(counter.column()).add(delta))
        .filter(document::Column::Id.eq(document_id))
        .exec(conn)
        .await?;
    Ok(())
}

/// Only documents the caller can see can be engaged with
///
/// Someone else's draft or private document is reported exactly like a
/// missing one.
async fn resolve_document<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    target: EngagementTarget,
) -> ServiceResult<Uuid> {
    match target {
        EngagementTarget::Document(id) if is_visible_to(conn, user_id, id).await? => Ok(id),
        _ => Err(ServiceError::NotFound),
    }
}

fn check_notes(notes: Option<&str>) -> ServiceResult<Option<String>> {
    match notes.map(str::trim).filter(|n| !n.is_empty()) {
        Some(n) if n.chars().count() > NOTES_MAX => Err(ServiceError::field(
            "notes",
            format!("Notes must be less than {} characters", NOTES_MAX),
        )),
        other => Ok(other.map(str::to_string)),
    }
}

/// Flip the caller's like on `target`; returns whether it is now liked
pub async fn toggle_like(
    db: &DatabaseConnection,
    user_id: Uuid,
    target: EngagementTarget,
) -> ServiceResult<bool> {
    let txn = db.begin().await?;
    let document_id = resolve_document(&txn, user_id, target).await?;

    let existing = like::Entity::find()
        .filter(like::Column::UserId.eq(user_id))
        .filter(like::Column::LikeableId.eq(document_id))
        .filter(like::Column::LikeableType.eq(TargetType::Document))
        .one(&txn)
        .await?;

    let liked = match existing {
        Some(row) => {
            like::Entity::delete_by_id(row.id).exec(&txn).await?;
            bump(&txn, document_id, Counter::Likes, -1).await?;
            false
        }
        None => {
            like::ActiveModel {
                id: Set(Uuid::new_v4()),
                user_id: Set(user_id),
                likeable_id: Set(document_id),
                likeable_type: Set(TargetType::Document),
                created_at: Set(Utc::now()),
            }
            .insert(&txn)
            .await?;
            bump(&txn, document_id, Counter::Likes, 1).await?;
            true
        }
    };

    txn.commit().await?;
    debug!(user_id = %user_id, document_id = %document_id, liked, "Toggled like");
    Ok(liked)
}

/// Flip the caller's bookmark on `target`; returns whether it is now bookmarked
///
/// `notes` are stored only when a bookmark is created.
pub async fn toggle_bookmark(
    db: &DatabaseConnection,
    user_id: Uuid,
    target: EngagementTarget,
    notes: Option<String>,
) -> ServiceResult<bool> {
    if let EngagementTarget::Comment(_) = target {
        return Err(ServiceError::field(
            "target_type",
            "Only documents can be bookmarked",
        ));
    }
    let notes = check_notes(notes.as_deref())?;

    let txn = db.begin().await?;
    let document_id = resolve_document(&txn, user_id, target).await?;

    let existing = bookmark::Entity::find()
        .filter(bookmark::Column::UserId.eq(user_id))
        .filter(bookmark::Column::BookmarkableId.eq(document_id))
        .filter(bookmark::Column::BookmarkableType.eq(TargetType::Document))
        .one(&txn)
        .await?;

    let bookmarked = match existing {
        Some(row) => {
            bookmark::Entity::delete_by_id(row.id).exec(&txn).await?;
            bump(&txn, document_id, Counter::Bookmarks, -1).await?;
            false
        }
        None => {
            bookmark::ActiveModel {
                id: Set(Uuid::new_v4()),
                user_id: Set(user_id),
                bookmarkable_id: Set(document_id),
                bookmarkable_type: Set(TargetType::Document),
                notes: Set(notes),
                created_at: Set(Utc::now()),
            }
            .insert(&txn)
            .await?;
            bump(&txn, document_id, Counter::Bookmarks, 1).await?;
            true
        }
    };

    txn.commit().await?;
    debug!(user_id = %user_id, document_id = %document_id, bookmarked, "Toggled bookmark");
    Ok(bookmarked)
}

/// Replace the notes on one of the caller's bookmarks
pub async fn update_bookmark_notes(
    db: &DatabaseConnection,
    user_id: Uuid,
    bookmark_id: Uuid,
    notes: Option<String>,
) -> ServiceResult<bookmark::Model> {
    let notes = check_notes(notes.as_deref())?;

    let result = bookmark::Entity::update_many()
        .col_expr(bookmark::Column::Notes, Expr::value(notes))
        .filter(bookmark::Column::Id.eq(bookmark_id))
        .filter(bookmark::Column::UserId.eq(user_id))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        return Err(ServiceError::NotFound);
    }

    bookmark::Entity::find_by_id(bookmark_id)
        .one(db)
        .await?
        .ok_or(ServiceError::NotFound)
}

/// The caller's like/bookmark state for one document they can see
pub async fn engagement_state(
    db: &DatabaseConnection,
    user_id: Uuid,
    document_id: Uuid,
) -> ServiceResult<EngagementState> {
    resolve_document(db, user_id, EngagementTarget::Document(document_id)).await?;

    let liked = like::Entity::find()
        .filter(like::Column::UserId.eq(user_id))
        .filter(like::Column::LikeableId.eq(document_id))
        .filter(like::Column::LikeableType.eq(TargetType::Document))
        .count(db)
        .await?
        > 0;
    let bookmarked = bookmark::Entity::find()
        .filter(bookmark::Column::UserId.eq(user_id))
        .filter(bookmark::Column::BookmarkableId.eq(document_id))
        .filter(bookmark::Column::BookmarkableType.eq(TargetType::Document))
        .count(db)
        .await?
        > 0;
    Ok(EngagementState { liked, bookmarked })
}

/// Recompute `like_count` and `bookmark_count` from the engagement rows
///
/// Offline safety net; returns how many documents were corrected.
pub async fn reconcile_counters(db: &DatabaseConnection) -> ServiceResult<u64> {
    let like_counts: HashMap<Uuid, i64> = like::Entity::find()
        .select_only()
        .column(like::Column::LikeableId)
        .column_as(Expr::col(like::Column::Id).count(), "total")
        .filter(like::Column::LikeableType.eq(TargetType::Document))
        .group_by(like::Column::LikeableId)
        .into_tuple::<(Uuid, i64)>()
        .all(db)
        .await?
        .into_iter()
        .collect();
    let bookmark_counts: HashMap<Uuid, i64> = bookmark::Entity::find()
        .select_only()
        .column(bookmark::Column::BookmarkableId)
        .column_as(Expr::col(bookmark::Column::Id).count(), "total")
        .filter(bookmark::Column::BookmarkableType.eq(TargetType::Document))
        .group_by(bookmark::Column::BookmarkableId)
        .into_tuple::<(Uuid, i64)>()
        .all(db)
        .await?
        .into_iter()
        .collect();

    let counters: Vec<(Uuid, i32, i32)> = document::Entity::find()
        .select_only()
        .column(document::Column::Id)
        .column(document::Column::LikeCount)
        .column(document::Column::BookmarkCount)
        .into_tuple()
        .all(db)
        .await?;

    let mut corrected = 0;
    for (id, likes, bookmarks) in counters {
        let expected_likes = like_counts.get(&id).copied().unwrap_or(0);
        let expected_bookmarks = bookmark_counts.get(&id).copied().unwrap_or(0);
        if i64::from(likes) == expected_likes && i64::from(bookmarks) == expected_bookmarks {
            continue;
        }

        warn!(
            document_id = %id,
            like_count = likes,
            expected_likes,
            bookmark_count = bookmarks,
            expected_bookmarks,
            "Engagement counters drifted"
        );
        document::Entity::update_many()
            .col_expr(document::Column::LikeCount, Expr::value(expected_likes as i32))
            .col_expr(
                document::Column::BookmarkCount,
                Expr::value(expected_bookmarks as i32),
            )
            .filter(document::Column::Id.eq(id))
            .exec(db)
            .await?;
        corrected += 1;
    }

    info!(corrected, "Reconciled engagement counters");
    Ok(corrected)
}
