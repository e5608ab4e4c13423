//! Read-side listings: explore feed, author dashboard, liked and saved documents

use std::collections::HashMap;

use sea_orm::sea_query::{Expr, Func, LikeExpr, Query};
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Select,
};
use serde::{Deserialize, Serialize};
use snipdocs_db::entities::{
    bookmark, category, document, document_tag, like, profile, tag, DocumentStatus, TargetType,
    Visibility,
};
use tracing::debug;
use uuid::Uuid;
use validator::Validate;

use crate::error::ServiceResult;
use crate::tags::tags_for_documents;

pub const DEFAULT_PAGE_SIZE: u64 = 20;
pub const MAX_PAGE_SIZE: u64 = 100;
const RECENT_DOCUMENTS: u64 = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Latest,
    Oldest,
    /// Likes, then bookmarks
    Popular,
    Views,
    Likes,
}

/// Filters for the public explore feed
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ExploreQuery {
    /// Case-insensitive match on title or excerpt
    pub q: Option<String>,
    pub category_id: Option<Uuid>,
    /// Author username
    pub author: Option<String>,
    /// Tag slug
    pub tag: Option<String>,
    pub sort: Option<SortOrder>,
    #[validate(range(min = 1, message = "Page must be at least 1"))]
    pub page: Option<u64>,
    #[validate(range(min = 1, max = 100, message = "Limit must be between 1 and 100"))]
    pub limit: Option<u64>,
}

/// Paging for listings that only take a search term
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct PageQuery {
    pub q: Option<String>,
    #[validate(range(min = 1, message = "Page must be at least 1"))]
    pub page: Option<u64>,
    #[validate(range(min = 1, max = 100, message = "Limit must be between 1 and 100"))]
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
}

impl<T> Page<T> {
    fn empty(page: u64, limit: u64) -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            page,
            limit,
        }
    }
}

/// A document with what a listing card shows next to it
#[derive(Debug, Clone, Serialize)]
pub struct DocumentCard {
    pub document: document::Model,
    pub author: Option<profile::Model>,
    pub category: Option<category::Model>,
    pub tags: Vec<tag::Model>,
}

/// A bookmarked document with the bookmark's notes
#[derive(Debug, Clone, Serialize)]
pub struct SavedDocument {
    pub bookmark: bookmark::Model,
    pub card: DocumentCard,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub documents: u64,
    pub published: u64,
    pub drafts: u64,
    pub views: i64,
    pub likes: i64,
    pub bookmarks: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthorDashboard {
    pub stats: DashboardStats,
    pub recent: Vec<DocumentCard>,
}

const LIKE_ESCAPE: char = '\\';

/// Case-insensitive substring pattern with `%`, `_` and the escape taken literally
fn contains_pattern(q: &str) -> String {
    let mut pattern = String::from("%");
    for c in q.trim().to_lowercase().chars() {
        if matches!(c, '%' | '_' | LIKE_ESCAPE) {
            pattern.push(LIKE_ESCAPE);
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn title_matches(q: &str) -> Condition {
    let pattern = contains_pattern(q);
    let like = || LikeExpr::new(pattern.clone()).escape(LIKE_ESCAPE);
    Condition::any()
        .add(Expr::expr(Func::lower(Expr::col(document::Column::Title))).like(like()))
        .add(Expr::expr(Func::lower(Expr::col(document::Column::Excerpt))).like(like()))
}

fn published_public() -> Select<document::Entity> {
    document::Entity::find()
        .filter(document::Column::Status.eq(DocumentStatus::Published))
        .filter(document::Column::Visibility.eq(Visibility::Public))
}

fn sorted(select: Select<document::Entity>, sort: SortOrder) -> Select<document::Entity> {
    match sort {
        SortOrder::Latest => select
            .order_by_desc(document::Column::PublishedAt)
            .order_by_desc(document::Column::CreatedAt),
        SortOrder::Oldest => select
            .order_by_asc(document::Column::PublishedAt)
            .order_by_asc(document::Column::CreatedAt),
        SortOrder::Popular => select
            .order_by_desc(document::Column::LikeCount)
            .order_by_desc(document::Column::BookmarkCount)
            .order_by_desc(document::Column::PublishedAt),
        SortOrder::Views => select
            .order_by_desc(document::Column::ViewCount)
            .order_by_desc(document::Column::PublishedAt),
        SortOrder::Likes => select
            .order_by_desc(document::Column::LikeCount)
            .order_by_desc(document::Column::PublishedAt),
    }
}

/// Attach authors, categories and tags to a batch of documents, keeping order
async fn to_cards(
    db: &DatabaseConnection,
    documents: Vec<document::Model>,
) -> ServiceResult<Vec<DocumentCard>> {
    if documents.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<Uuid> = documents.iter().map(|d| d.id).collect();
    let author_ids: Vec<Uuid> = documents.iter().map(|d| d.author_id).collect();
    let category_ids: Vec<Uuid> = documents.iter().filter_map(|d| d.category_id).collect();

    let authors: HashMap<Uuid, profile::Model> = profile::Entity::find()
        .filter(profile::Column::Id.is_in(author_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();
    let categories: HashMap<Uuid, category::Model> = if category_ids.is_empty() {
        HashMap::new()
    } else {
        category::Entity::find()
            .filter(category::Column::Id.is_in(category_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect()
    };
    let mut tags = tags_for_documents(db, &ids).await?;

    Ok(documents
        .into_iter()
        .map(|document| DocumentCard {
            author: authors.get(&document.author_id).cloned(),
            category: document
                .category_id
                .and_then(|id| categories.get(&id).cloned()),
            tags: tags.remove(&document.id).unwrap_or_default(),
            document,
        })
        .collect())
}

async fn fetch_page(
    db: &DatabaseConnection,
    select: Select<document::Entity>,
    page: u64,
    limit: u64,
) -> ServiceResult<Page<DocumentCard>> {
    let paginator = select.paginate(db, limit);
    let total = paginator.num_items().await?;
    let documents = paginator.fetch_page(page - 1).await?;
    let items = to_cards(db, documents).await?;
    Ok(Page {
        items,
        total,
        page,
        limit,
    })
}

/// Published, public documents matching `query`
pub async fn explore(
    db: &DatabaseConnection,
    query: ExploreQuery,
) -> ServiceResult<Page<DocumentCard>> {
    query.validate()?;
    let page = query.page.unwrap_or(1);
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE);

    let mut select = published_public();

    if let Some(q) = query.q.as_deref().filter(|q| !q.trim().is_empty()) {
        select = select.filter(title_matches(q));
    }
    if let Some(category_id) = query.category_id {
        select = select.filter(document::Column::CategoryId.eq(category_id));
    }
    if let Some(username) = query.author.as_deref() {
        let Some(author) = profile::Entity::find()
            .filter(profile::Column::Username.eq(username))
            .one(db)
            .await?
        else {
            return Ok(Page::empty(page, limit));
        };
        select = select.filter(document::Column::AuthorId.eq(author.id));
    }
    if let Some(slug) = query.tag.as_deref() {
        let Some(tag) = tag::Entity::find()
            .filter(tag::Column::Slug.eq(slug))
            .one(db)
            .await?
        else {
            return Ok(Page::empty(page, limit));
        };
        select = select.filter(
            document::Column::Id.in_subquery(
                Query::select()
                    .column(document_tag::Column::DocumentId)
                    .from(document_tag::Entity)
                    .and_where(document_tag::Column::TagId.eq(tag.id))
                    .to_owned(),
            ),
        );
    }

    let select = sorted(select, query.sort.unwrap_or_default());
    let result = fetch_page(db, select, page, limit).await?;
    debug!(total = result.total, page, limit, "Explore query");
    Ok(result)
}

/// The caller's own documents, any status, most recently edited first
pub async fn list_own_documents(
    db: &DatabaseConnection,
    author_id: Uuid,
    query: PageQuery,
) -> ServiceResult<Page<DocumentCard>> {
    query.validate()?;
    let page = query.page.unwrap_or(1);
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE);

    let mut select = document::Entity::find().filter(document::Column::AuthorId.eq(author_id));
    if let Some(q) = query.q.as_deref().filter(|q| !q.trim().is_empty()) {
        select = select.filter(title_matches(q));
    }
    let select = select.order_by_desc(document::Column::UpdatedAt);

    fetch_page(db, select, page, limit).await
}

/// Visible to `user_id`: published and either public or their own
pub(crate) fn visible_to(user_id: Uuid) -> Condition {
    Condition::all()
        .add(document::Column::Status.eq(DocumentStatus::Published))
        .add(
            Condition::any()
                .add(document::Column::Visibility.eq(Visibility::Public))
                .add(document::Column::AuthorId.eq(user_id)),
        )
}

/// Whether `user_id` may see (and so engage with) a document
pub(crate) async fn is_visible_to<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    document_id: Uuid,
) -> ServiceResult<bool> {
    Ok(document::Entity::find_by_id(document_id)
        .filter(visible_to(user_id))
        .count(conn)
        .await?
        > 0)
}

/// Documents in `ids` order, skipping ones the user can no longer see
async fn visible_in_order(
    db: &DatabaseConnection,
    user_id: Uuid,
    ids: &[Uuid],
) -> ServiceResult<Vec<document::Model>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut found: HashMap<Uuid, document::Model> = document::Entity::find()
        .filter(document::Column::Id.is_in(ids.to_vec()))
        .filter(visible_to(user_id))
        .all(db)
        .await?
        .into_iter()
        .map(|d| (d.id, d))
        .collect();
    Ok(ids.iter().filter_map(|id| found.remove(id)).collect())
}

/// Documents the user liked, most recent like first
pub async fn liked_documents(
    db: &DatabaseConnection,
    user_id: Uuid,
) -> ServiceResult<Vec<DocumentCard>> {
    let ids: Vec<Uuid> = like::Entity::find()
        .filter(like::Column::UserId.eq(user_id))
        .filter(like::Column::LikeableType.eq(TargetType::Document))
        .order_by_desc(like::Column::CreatedAt)
        .all(db)
        .await?
        .into_iter()
        .map(|l| l.likeable_id)
        .collect();

    let documents = visible_in_order(db, user_id, &ids).await?;
    to_cards(db, documents).await
}

/// Documents the user bookmarked, most recent first, with notes
pub async fn bookmarked_documents(
    db: &DatabaseConnection,
    user_id: Uuid,
) -> ServiceResult<Vec<SavedDocument>> {
    let bookmarks = bookmark::Entity::find()
        .filter(bookmark::Column::UserId.eq(user_id))
        .filter(bookmark::Column::BookmarkableType.eq(TargetType::Document))
        .order_by_desc(bookmark::Column::CreatedAt)
        .all(db)
        .await?;

    let ids: Vec<Uuid> = bookmarks.iter().map(|b| b.bookmarkable_id).collect();
    let documents = visible_in_order(db, user_id, &ids).await?;
    let mut cards: HashMap<Uuid, DocumentCard> = to_cards(db, documents)
        .await?
        .into_iter()
        .map(|c| (c.document.id, c))
        .collect();

    Ok(bookmarks
        .into_iter()
        .filter_map(|bookmark| {
            cards
                .remove(&bookmark.bookmarkable_id)
                .map(|card| SavedDocument { bookmark, card })
        })
        .collect())
}

/// Totals and recent activity for the caller's own documents
pub async fn author_dashboard(
    db: &DatabaseConnection,
    author_id: Uuid,
) -> ServiceResult<AuthorDashboard> {
    let rows: Vec<(DocumentStatus, i32, i32, i32)> = document::Entity::find()
        .select_only()
        .column(document::Column::Status)
        .column(document::Column::ViewCount)
        .column(document::Column::LikeCount)
        .column(document::Column::BookmarkCount)
        .filter(document::Column::AuthorId.eq(author_id))
        .into_tuple()
        .all(db)
        .await?;

    let mut stats = DashboardStats::default();
    for (status, views, likes, bookmarks) in rows {
        stats.documents += 1;
        match status {
            DocumentStatus::Published => stats.published += 1,
            DocumentStatus::Draft => stats.drafts += 1,
            DocumentStatus::Archived => {}
        }
        stats.views += i64::from(views);
        stats.likes += i64::from(likes);
        stats.bookmarks += i64::from(bookmarks);
    }

    let recent = document::Entity::find()
        .filter(document::Column::AuthorId.eq(author_id))
        .order_by_desc(document::Column::UpdatedAt)
        .limit(RECENT_DOCUMENTS)
        .all(db)
        .await?;

    Ok(AuthorDashboard {
        stats,
        recent: to_cards(db, recent).await?,
    })
}
