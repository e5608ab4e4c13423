//! Request and response bodies of the REST API
//!
//! Database rows are never serialized directly; each has a DTO here so the
//! OpenAPI document describes exactly what goes over the wire.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use snipdocs_auth::{Session, UserIdentity};
use snipdocs_core::{
    AuthorDashboard, CategoryForm, DocumentDetail, DocumentForm, DocumentPatch, EngagementState,
    ExploreQuery, Page, PageQuery, ProfilePatch, RegistrationForm, SortOrder,
};
use snipdocs_db::entities::{
    bookmark, category, document, profile, tag, Difficulty, DocumentStatus, ProfileRole,
    TargetType, Visibility,
};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
}

/// Error response
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Error code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// What the caller can do about it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Per-field validation messages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<BTreeMap<String, Vec<String>>>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: &str) -> Self {
        Self {
            error: error.into(),
            code: Some(code.to_string()),
            ..Default::default()
        }
    }
}

/// Plain acknowledgement
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

// ============================================================================
// Auth
// ============================================================================

/// Account registration
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    /// 6 to 72 characters
    pub password: String,
    /// 3 to 30 characters of `[A-Za-z0-9_-]`
    pub username: String,
    pub full_name: Option<String>,
}

impl From<RegisterRequest> for RegistrationForm {
    fn from(req: RegisterRequest) -> Self {
        RegistrationForm {
            email: req.email,
            password: req.password,
            username: req.username,
            full_name: req.full_name,
        }
    }
}

/// Identity as seen by the client
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub email_verified: bool,
}

impl From<&UserIdentity> for User {
    fn from(user: &UserIdentity) -> Self {
        User {
            id: user.id,
            email: user.email.clone(),
            email_verified: user.email_verified(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegisterResponse {
    pub user: User,
    /// Whether the confirmation email went out
    pub confirmation_sent: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Session issued on login; also set as the `session_token` cookie
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub user: User,
    pub access_token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
}

impl From<&Session> for LoginResponse {
    fn from(session: &Session) -> Self {
        LoginResponse {
            user: User::from(&session.user),
            access_token: session.access_token.clone(),
            token_type: session.token_type.clone(),
            expires_at: session.expires_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdatePasswordRequest {
    /// 6 to 72 characters
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OAuthQuery {
    /// Path to land on after the provider redirects back
    pub redirect_to: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CurrentUser {
    pub user: User,
    /// Absent until the account's profile has been provisioned
    pub profile: Option<Profile>,
}

// ============================================================================
// Profiles
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Profile {
    pub id: Uuid,
    pub username: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub website: Option<String>,
    pub github_url: Option<String>,
    pub twitter_url: Option<String>,
    pub linkedin_url: Option<String>,
    /// `creator`, `user` or `admin`
    #[schema(value_type = String)]
    pub role: ProfileRole,
    pub is_verified: bool,
    pub docs_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<profile::Model> for Profile {
    fn from(model: profile::Model) -> Self {
        Profile {
            id: model.id,
            username: model.username,
            full_name: model.full_name,
            avatar_url: model.avatar_url,
            bio: model.bio,
            website: model.website,
            github_url: model.github_url,
            twitter_url: model.twitter_url,
            linkedin_url: model.linkedin_url,
            role: model.role,
            is_verified: model.is_verified,
            docs_count: model.docs_count,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Author summary shown on document cards
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Author {
    pub id: Uuid,
    pub username: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
}

impl From<profile::Model> for Author {
    fn from(model: profile::Model) -> Self {
        Author {
            id: model.id,
            username: model.username,
            full_name: model.full_name,
            avatar_url: model.avatar_url,
        }
    }
}

/// Partial profile update; an empty string clears a field
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub website: Option<String>,
    pub github_url: Option<String>,
    pub twitter_url: Option<String>,
    pub linkedin_url: Option<String>,
}

impl From<UpdateProfileRequest> for ProfilePatch {
    fn from(req: UpdateProfileRequest) -> Self {
        ProfilePatch {
            username: req.username,
            full_name: req.full_name,
            bio: req.bio,
            avatar_url: req.avatar_url,
            website: req.website,
            github_url: req.github_url,
            twitter_url: req.twitter_url,
            linkedin_url: req.linkedin_url,
        }
    }
}

// ============================================================================
// Categories and tags
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub is_active: bool,
    pub sort_order: i32,
    pub docs_count: i32,
}

impl From<category::Model> for Category {
    fn from(model: category::Model) -> Self {
        Category {
            id: model.id,
            name: model.name,
            slug: model.slug,
            description: model.description,
            icon: model.icon,
            color: model.color,
            is_active: model.is_active,
            sort_order: model.sort_order,
            docs_count: model.docs_count,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CreateCategoryRequest {
    pub name: String,
    /// Lowercase words joined by single hyphens
    pub slug: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    /// `#rgb` or `#rrggbb`
    pub color: Option<String>,
    pub is_active: Option<bool>,
    pub sort_order: Option<u32>,
}

impl From<CreateCategoryRequest> for CategoryForm {
    fn from(req: CreateCategoryRequest) -> Self {
        CategoryForm {
            name: req.name,
            slug: req.slug,
            description: req.description,
            icon: req.icon,
            color: req.color,
            is_active: req.is_active,
            sort_order: req.sort_order,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub usage_count: i32,
}

impl From<tag::Model> for Tag {
    fn from(model: tag::Model) -> Self {
        Tag {
            id: model.id,
            name: model.name,
            slug: model.slug,
            usage_count: model.usage_count,
        }
    }
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TagQuery {
    /// Maximum number of tags (default: 20, max: 100)
    pub limit: Option<u64>,
}

// ============================================================================
// Documents
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Document {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub category_id: Option<Uuid>,
    /// `beginner`, `intermediate` or `advanced`
    #[schema(value_type = String)]
    pub difficulty: Difficulty,
    /// `draft`, `published` or `archived`
    #[schema(value_type = String)]
    pub status: DocumentStatus,
    /// `public` or `private`
    #[schema(value_type = String)]
    pub visibility: Visibility,
    pub reading_time: i32,
    pub view_count: i32,
    pub like_count: i32,
    pub bookmark_count: i32,
    pub comment_count: i32,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub meta_keywords: Vec<String>,
    pub thumbnail_url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<document::Model> for Document {
    fn from(model: document::Model) -> Self {
        let meta_keywords = model.keywords();
        Document {
            id: model.id,
            author_id: model.author_id,
            title: model.title,
            slug: model.slug,
            content: model.content,
            excerpt: model.excerpt,
            category_id: model.category_id,
            difficulty: model.difficulty,
            status: model.status,
            visibility: model.visibility,
            reading_time: model.reading_time,
            view_count: model.view_count,
            like_count: model.like_count,
            bookmark_count: model.bookmark_count,
            comment_count: model.comment_count,
            meta_title: model.meta_title,
            meta_description: model.meta_description,
            meta_keywords,
            thumbnail_url: model.thumbnail_url,
            published_at: model.published_at,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Document with its tags
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DocumentResponse {
    pub document: Document,
    pub tags: Vec<Tag>,
}

impl From<DocumentDetail> for DocumentResponse {
    fn from(detail: DocumentDetail) -> Self {
        DocumentResponse {
            document: detail.document.into(),
            tags: detail.tags.into_iter().map(Tag::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CreateDocumentRequest {
    /// 3 to 200 characters
    pub title: String,
    /// At least 10 characters
    pub content: String,
    pub excerpt: Option<String>,
    pub category_id: Option<Uuid>,
    /// Derived from the title when absent
    pub slug: Option<String>,
    #[schema(value_type = Option<String>)]
    pub difficulty: Option<Difficulty>,
    #[schema(value_type = Option<String>)]
    pub status: Option<DocumentStatus>,
    #[schema(value_type = Option<String>)]
    pub visibility: Option<Visibility>,
    pub tags: Option<Vec<String>>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub meta_keywords: Option<Vec<String>>,
    pub thumbnail_url: Option<String>,
}

impl From<CreateDocumentRequest> for DocumentForm {
    fn from(req: CreateDocumentRequest) -> Self {
        DocumentForm {
            title: req.title,
            content: req.content,
            excerpt: req.excerpt,
            category_id: req.category_id,
            slug: req.slug,
            difficulty: req.difficulty,
            status: req.status,
            visibility: req.visibility,
            tags: req.tags,
            meta_title: req.meta_title,
            meta_description: req.meta_description,
            meta_keywords: req.meta_keywords,
            thumbnail_url: req.thumbnail_url,
        }
    }
}

/// Partial document update
///
/// `tags` absent leaves the tag set alone; `tags: []` clears it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateDocumentRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub category_id: Option<Uuid>,
    #[schema(value_type = Option<String>)]
    pub difficulty: Option<Difficulty>,
    #[schema(value_type = Option<String>)]
    pub status: Option<DocumentStatus>,
    #[schema(value_type = Option<String>)]
    pub visibility: Option<Visibility>,
    pub tags: Option<Vec<String>>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub meta_keywords: Option<Vec<String>>,
    pub thumbnail_url: Option<String>,
}

impl From<UpdateDocumentRequest> for DocumentPatch {
    fn from(req: UpdateDocumentRequest) -> Self {
        DocumentPatch {
            title: req.title,
            content: req.content,
            excerpt: req.excerpt,
            category_id: req.category_id,
            difficulty: req.difficulty,
            status: req.status,
            visibility: req.visibility,
            tags: req.tags,
            meta_title: req.meta_title,
            meta_description: req.meta_description,
            meta_keywords: req.meta_keywords,
            thumbnail_url: req.thumbnail_url,
        }
    }
}

/// Listing card: document plus author, category and tags
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DocumentCard {
    pub document: Document,
    pub author: Option<Author>,
    pub category: Option<Category>,
    pub tags: Vec<Tag>,
}

impl From<snipdocs_core::DocumentCard> for DocumentCard {
    fn from(card: snipdocs_core::DocumentCard) -> Self {
        DocumentCard {
            document: card.document.into(),
            author: card.author.map(Author::from),
            category: card.category.map(Category::from),
            tags: card.tags.into_iter().map(Tag::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DocumentPage {
    pub items: Vec<DocumentCard>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
}

impl From<Page<snipdocs_core::DocumentCard>> for DocumentPage {
    fn from(page: Page<snipdocs_core::DocumentCard>) -> Self {
        DocumentPage {
            items: page.items.into_iter().map(DocumentCard::from).collect(),
            total: page.total,
            page: page.page,
            limit: page.limit,
        }
    }
}

/// Explore feed filters
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ExploreParams {
    /// Case-insensitive match on title or excerpt
    pub q: Option<String>,
    pub category_id: Option<Uuid>,
    /// Author username
    pub author: Option<String>,
    /// Tag slug
    pub tag: Option<String>,
    /// `latest` (default), `oldest`, `popular`, `views` or `likes`
    #[param(value_type = Option<String>)]
    pub sort: Option<SortOrder>,
    /// Page number, from 1
    pub page: Option<u64>,
    /// Page size (default: 20, max: 100)
    pub limit: Option<u64>,
}

impl From<ExploreParams> for ExploreQuery {
    fn from(params: ExploreParams) -> Self {
        ExploreQuery {
            q: params.q,
            category_id: params.category_id,
            author: params.author,
            tag: params.tag,
            sort: params.sort,
            page: params.page,
            limit: params.limit,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListParams {
    /// Case-insensitive match on title or excerpt
    pub q: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

impl From<ListParams> for PageQuery {
    fn from(params: ListParams) -> Self {
        PageQuery {
            q: params.q,
            page: params.page,
            limit: params.limit,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DashboardResponse {
    pub documents: u64,
    pub published: u64,
    pub drafts: u64,
    pub views: i64,
    pub likes: i64,
    pub bookmarks: i64,
    /// Most recently edited documents
    pub recent: Vec<DocumentCard>,
}

impl From<AuthorDashboard> for DashboardResponse {
    fn from(dashboard: AuthorDashboard) -> Self {
        let stats = dashboard.stats;
        DashboardResponse {
            documents: stats.documents,
            published: stats.published,
            drafts: stats.drafts,
            views: stats.views,
            likes: stats.likes,
            bookmarks: stats.bookmarks,
            recent: dashboard.recent.into_iter().map(DocumentCard::from).collect(),
        }
    }
}

// ============================================================================
// Engagement
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ToggleRequest {
    /// `document` or `comment`
    #[schema(value_type = String)]
    pub target_type: TargetType,
    pub target_id: Uuid,
    /// Bookmarks only; kept when the bookmark is created
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ToggleResponse {
    /// State after the toggle
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EngagementResponse {
    pub liked: bool,
    pub bookmarked: bool,
}

impl From<EngagementState> for EngagementResponse {
    fn from(state: EngagementState) -> Self {
        EngagementResponse {
            liked: state.liked,
            bookmarked: state.bookmarked,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Bookmark {
    pub id: Uuid,
    pub document_id: Uuid,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<bookmark::Model> for Bookmark {
    fn from(model: bookmark::Model) -> Self {
        Bookmark {
            id: model.id,
            document_id: model.bookmarkable_id,
            notes: model.notes,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateBookmarkRequest {
    /// At most 500 characters; empty clears
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SavedDocument {
    pub bookmark: Bookmark,
    pub card: DocumentCard,
}

impl From<snipdocs_core::SavedDocument> for SavedDocument {
    fn from(saved: snipdocs_core::SavedDocument) -> Self {
        SavedDocument {
            bookmark: saved.bookmark.into(),
            card: saved.card.into(),
        }
    }
}
