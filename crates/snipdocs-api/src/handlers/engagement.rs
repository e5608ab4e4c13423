//! Likes and bookmarks

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use snipdocs_core::EngagementTarget;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{service_error, ApiResult};
use crate::middleware::AuthUser;
use crate::models::*;
use crate::AppState;

/// Like, or remove the like from, a target
#[utoipa::path(
    post,
    path = "/api/likes/toggle",
    request_body = ToggleRequest,
    responses(
        (status = 200, description = "Like state after the toggle", body = ToggleResponse),
        (status = 404, description = "Target not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "engagement"
)]
pub async fn toggle_like(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<ToggleRequest>,
) -> ApiResult<Json<ToggleResponse>> {
    let target = EngagementTarget::new(req.target_type, req.target_id);
    let active = snipdocs_core::toggle_like(&state.db, user.user_id, target)
        .await
        .map_err(service_error)?;
    Ok(Json(ToggleResponse { active }))
}

/// Bookmark, or remove the bookmark from, a document
#[utoipa::path(
    post,
    path = "/api/bookmarks/toggle",
    request_body = ToggleRequest,
    responses(
        (status = 200, description = "Bookmark state after the toggle", body = ToggleResponse),
        (status = 404, description = "Document not found", body = ErrorResponse),
        (status = 422, description = "Invalid target or notes", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "engagement"
)]
pub async fn toggle_bookmark(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<ToggleRequest>,
) -> ApiResult<Json<ToggleResponse>> {
    let target = EngagementTarget::new(req.target_type, req.target_id);
    let active = snipdocs_core::toggle_bookmark(&state.db, user.user_id, target, req.notes)
        .await
        .map_err(service_error)?;
    Ok(Json(ToggleResponse { active }))
}

/// Edit the notes of one of the caller's bookmarks
#[utoipa::path(
    patch,
    path = "/api/bookmarks/{id}",
    params(
        ("id" = Uuid, Path, description = "Bookmark ID")
    ),
    request_body = UpdateBookmarkRequest,
    responses(
        (status = 200, description = "Updated bookmark", body = Bookmark),
        (status = 404, description = "Bookmark not found", body = ErrorResponse),
        (status = 422, description = "Notes too long", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "engagement"
)]
pub async fn update_bookmark(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateBookmarkRequest>,
) -> ApiResult<Json<Bookmark>> {
    let bookmark = snipdocs_core::update_bookmark_notes(&state.db, user.user_id, id, req.notes)
        .await
        .map_err(service_error)?;
    Ok(Json(bookmark.into()))
}

/// Documents the caller liked
#[utoipa::path(
    get,
    path = "/api/me/likes",
    responses(
        (status = 200, description = "Liked documents, most recent first", body = Vec<DocumentCard>)
    ),
    security(("bearer_auth" = [])),
    tag = "engagement"
)]
pub async fn my_likes(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<Vec<DocumentCard>>> {
    let cards = snipdocs_core::liked_documents(&state.db, user.user_id)
        .await
        .map_err(service_error)?;
    Ok(Json(cards.into_iter().map(DocumentCard::from).collect()))
}

/// Documents the caller bookmarked, with notes
#[utoipa::path(
    get,
    path = "/api/me/bookmarks",
    responses(
        (status = 200, description = "Bookmarked documents, most recent first", body = Vec<SavedDocument>)
    ),
    security(("bearer_auth" = [])),
    tag = "engagement"
)]
pub async fn my_bookmarks(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<Vec<SavedDocument>>> {
    let saved = snipdocs_core::bookmarked_documents(&state.db, user.user_id)
        .await
        .map_err(service_error)?;
    Ok(Json(saved.into_iter().map(SavedDocument::from).collect()))
}
