//! Public browsing: explore feed, categories and tags

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use std::sync::Arc;
use tracing::debug;

use crate::error::{service_error, ApiResult};
use crate::middleware::AuthUser;
use crate::models::*;
use crate::AppState;

const DEFAULT_TAG_LIMIT: u64 = 20;
const MAX_TAG_LIMIT: u64 = 100;

/// Browse published, public documents
#[utoipa::path(
    get,
    path = "/api/explore",
    params(ExploreParams),
    responses(
        (status = 200, description = "Page of documents", body = DocumentPage),
        (status = 422, description = "Invalid paging", body = ErrorResponse)
    ),
    tag = "explore"
)]
pub async fn explore(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ExploreParams>,
) -> ApiResult<Json<DocumentPage>> {
    let page = snipdocs_core::explore(&state.db, params.into())
        .await
        .map_err(service_error)?;
    Ok(Json(page.into()))
}

/// List active categories
#[utoipa::path(
    get,
    path = "/api/categories",
    responses(
        (status = 200, description = "Active categories in display order", body = Vec<Category>)
    ),
    tag = "explore"
)]
pub async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<Category>>> {
    let categories = snipdocs_core::list_categories(&state.db)
        .await
        .map_err(service_error)?;
    debug!("Listing {} categories", categories.len());
    Ok(Json(categories.into_iter().map(Category::from).collect()))
}

/// Create a category (admins only)
#[utoipa::path(
    post,
    path = "/api/categories",
    request_body = CreateCategoryRequest,
    responses(
        (status = 201, description = "Category created", body = Category),
        (status = 403, description = "Caller is not an admin", body = ErrorResponse),
        (status = 409, description = "Slug already in use", body = ErrorResponse),
        (status = 422, description = "Invalid input", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "explore"
)]
pub async fn create_category(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<CreateCategoryRequest>,
) -> ApiResult<(StatusCode, Json<Category>)> {
    let category = snipdocs_core::create_category(&state.db, user.user_id, req.into())
        .await
        .map_err(service_error)?;
    Ok((StatusCode::CREATED, Json(category.into())))
}

/// Most used tags
#[utoipa::path(
    get,
    path = "/api/tags",
    params(TagQuery),
    responses(
        (status = 200, description = "Tags by usage", body = Vec<Tag>)
    ),
    tag = "explore"
)]
pub async fn list_tags(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TagQuery>,
) -> ApiResult<Json<Vec<Tag>>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_TAG_LIMIT)
        .clamp(1, MAX_TAG_LIMIT);
    let tags = snipdocs_core::list_popular_tags(&state.db, limit)
        .await
        .map_err(service_error)?;
    Ok(Json(tags.into_iter().map(Tag::from).collect()))
}
