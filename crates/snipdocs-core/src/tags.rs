//! Tag vocabulary and document tag reconciliation

use std::collections::HashMap;

use chrono::Utc;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use snipdocs_db::entities::{document_tag, tag};
use tracing::debug;
use uuid::Uuid;

use crate::error::ServiceResult;
use crate::text::tag_slug;

/// Distinct `(display name, slug)` pairs in first-seen order
pub fn normalize_tags(names: &[String]) -> Vec<(String, String)> {
    let mut seen = Vec::<(String, String)>::new();
    for name in names {
        let Some(slug) = tag_slug(name) else {
            continue;
        };
        if !seen.iter().any(|(_, s)| *s == slug) {
            seen.push((name.trim().to_string(), slug));
        }
    }
    seen
}

/// Existing tag for `slug`, creating it with `name` if absent
///
/// The insert is `ON CONFLICT DO NOTHING`, so a concurrent creator wins and
/// both callers end up with the same row.
async fn find_or_create<C: ConnectionTrait>(
    conn: &C,
    name: &str,
    slug: &str,
) -> ServiceResult<tag::Model> {
    if let Some(existing) = tag::Entity::find()
        .filter(tag::Column::Slug.eq(slug))
        .one(conn)
        .await?
    {
        return Ok(existing);
    }

    let model = tag::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        slug: Set(slug.to_string()),
        usage_count: Set(0),
        created_at: Set(Utc::now()),
    };
    tag::Entity::insert(model)
        .on_conflict(OnConflict::column(tag::Column::Slug).do_nothing().to_owned())
        .exec_without_returning(conn)
        .await?;

    tag::Entity::find()
        .filter(tag::Column::Slug.eq(slug))
        .one(conn)
        .await?
        .ok_or_else(|| sea_orm::DbErr::RecordNotFound(format!("tag '{}'", slug)).into())
}

async fn adjust_usage<C: ConnectionTrait>(
    conn: &C,
    tag_ids: Vec<Uuid>,
    delta: i32,
) -> ServiceResult<()> {
    if tag_ids.is_empty() {
        return Ok(());
    }
    tag::Entity::update_many()
        .col_expr(
            tag::Column::UsageCount,
            Expr::col(tag::Column::UsageCount).add(delta),
        )
        .filter(tag::Column::Id.is_in(tag_ids))
        .exec(conn)
        .await?;
    Ok(())
}

/// Replace the tag links of `document_id` with `names`, on an open connection
/// or transaction
///
/// Returns the resolved tags in first-seen order.
pub(crate) async fn reconcile_tags_in<C: ConnectionTrait>(
    conn: &C,
    document_id: Uuid,
    names: &[String],
) -> ServiceResult<Vec<tag::Model>> {
    let mut resolved = Vec::new();
    for (name, slug) in normalize_tags(names) {
        resolved.push(find_or_create(conn, &name, &slug).await?);
    }

    let previous: Vec<Uuid> = document_tag::Entity::find()
        .filter(document_tag::Column::DocumentId.eq(document_id))
        .all(conn)
        .await?
        .into_iter()
        .map(|link| link.tag_id)
        .collect();

    document_tag::Entity::delete_many()
        .filter(document_tag::Column::DocumentId.eq(document_id))
        .exec(conn)
        .await?;
    adjust_usage(conn, previous, -1).await?;

    if !resolved.is_empty() {
        let now = Utc::now();
        let links = resolved.iter().map(|t| document_tag::ActiveModel {
            document_id: Set(document_id),
            tag_id: Set(t.id),
            created_at: Set(now),
        });
        document_tag::Entity::insert_many(links)
            .exec_without_returning(conn)
            .await?;
        adjust_usage(conn, resolved.iter().map(|t| t.id).collect(), 1).await?;
    }

    debug!(document_id = %document_id, count = resolved.len(), "Reconciled document tags");

    let ids: Vec<Uuid> = resolved.iter().map(|t| t.id).collect();
    let mut fresh: HashMap<Uuid, tag::Model> = tag::Entity::find()
        .filter(tag::Column::Id.is_in(ids.clone()))
        .all(conn)
        .await?
        .into_iter()
        .map(|t| (t.id, t))
        .collect();
    Ok(ids.into_iter().filter_map(|id| fresh.remove(&id)).collect())
}

/// Make the tag set of `document_id` exactly `names`
///
/// An empty list clears every link. Tags created along the way are kept even
/// if a later step fails, since the vocabulary is shared and append-only.
pub async fn reconcile_tags(
    db: &DatabaseConnection,
    document_id: Uuid,
    names: &[String],
) -> ServiceResult<Vec<tag::Model>> {
    let txn = db.begin().await?;
    let tags = reconcile_tags_in(&txn, document_id, names).await?;
    txn.commit().await?;
    Ok(tags)
}

/// Tags of one document, by name
pub async fn tags_for_document<C: ConnectionTrait>(
    conn: &C,
    document_id: Uuid,
) -> ServiceResult<Vec<tag::Model>> {
    Ok(tag::Entity::find()
        .inner_join(document_tag::Entity)
        .filter(document_tag::Column::DocumentId.eq(document_id))
        .order_by_asc(tag::Column::Name)
        .all(conn)
        .await?)
}

/// Tags of many documents at once
pub async fn tags_for_documents<C: ConnectionTrait>(
    conn: &C,
    document_ids: &[Uuid],
) -> ServiceResult<HashMap<Uuid, Vec<tag::Model>>> {
    let mut by_document: HashMap<Uuid, Vec<tag::Model>> = HashMap::new();
    if document_ids.is_empty() {
        return Ok(by_document);
    }

    let links = document_tag::Entity::find()
        .filter(document_tag::Column::DocumentId.is_in(document_ids.to_vec()))
        .find_also_related(tag::Entity)
        .all(conn)
        .await?;

    for (link, tag) in links {
        if let Some(tag) = tag {
            by_document.entry(link.document_id).or_default().push(tag);
        }
    }
    for tags in by_document.values_mut() {
        tags.sort_by(|a, b| a.name.cmp(&b.name));
    }
    Ok(by_document)
}

/// Most used tags first
pub async fn list_popular_tags(
    db: &DatabaseConnection,
    limit: u64,
) -> ServiceResult<Vec<tag::Model>> {
    Ok(tag::Entity::find()
        .filter(tag::Column::UsageCount.gt(0))
        .order_by_desc(tag::Column::UsageCount)
        .order_by_asc(tag::Column::Name)
        .limit(limit)
        .all(db)
        .await?)
}
