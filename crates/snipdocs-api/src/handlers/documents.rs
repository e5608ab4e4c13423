//! Document CRUD for authors, and the public document page

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::error::{service_error, ApiResult};
use crate::middleware::AuthUser;
use crate::models::*;
use crate::AppState;

/// List the caller's documents, any status
#[utoipa::path(
    get,
    path = "/api/documents",
    params(ListParams),
    responses(
        (status = 200, description = "Page of the caller's documents", body = DocumentPage),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "documents"
)]
pub async fn list_documents(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<DocumentPage>> {
    let page = snipdocs_core::list_own_documents(&state.db, user.user_id, params.into())
        .await
        .map_err(service_error)?;
    Ok(Json(page.into()))
}

/// Create a document
#[utoipa::path(
    post,
    path = "/api/documents",
    request_body = CreateDocumentRequest,
    responses(
        (status = 201, description = "Document created", body = DocumentResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 409, description = "Slug already in use", body = ErrorResponse),
        (status = 422, description = "Invalid input", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "documents"
)]
pub async fn create_document(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<CreateDocumentRequest>,
) -> ApiResult<(StatusCode, Json<DocumentResponse>)> {
    let detail = snipdocs_core::create_document(&state.db, user.user_id, req.into())
        .await
        .map_err(service_error)?;
    Ok((StatusCode::CREATED, Json(detail.into())))
}

/// Get one of the caller's documents
#[utoipa::path(
    get,
    path = "/api/documents/{id}",
    params(
        ("id" = Uuid, Path, description = "Document ID")
    ),
    responses(
        (status = 200, description = "Document", body = DocumentResponse),
        (status = 404, description = "Document not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "documents"
)]
pub async fn get_document(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DocumentResponse>> {
    let detail = snipdocs_core::get_own_document(&state.db, user.user_id, id)
        .await
        .map_err(service_error)?;
    Ok(Json(detail.into()))
}

/// Update one of the caller's documents
#[utoipa::path(
    patch,
    path = "/api/documents/{id}",
    params(
        ("id" = Uuid, Path, description = "Document ID")
    ),
    request_body = UpdateDocumentRequest,
    responses(
        (status = 200, description = "Updated document", body = DocumentResponse),
        (status = 404, description = "Document not found", body = ErrorResponse),
        (status = 422, description = "Invalid input", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "documents"
)]
pub async fn update_document(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateDocumentRequest>,
) -> ApiResult<Json<DocumentResponse>> {
    let detail = snipdocs_core::update_document(&state.db, user.user_id, id, req.into())
        .await
        .map_err(service_error)?;
    Ok(Json(detail.into()))
}

/// Delete one of the caller's documents
#[utoipa::path(
    delete,
    path = "/api/documents/{id}",
    params(
        ("id" = Uuid, Path, description = "Document ID")
    ),
    responses(
        (status = 204, description = "Document deleted"),
        (status = 404, description = "Document not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "documents"
)]
pub async fn delete_document(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    snipdocs_core::delete_document(&state.db, user.user_id, id)
        .await
        .map_err(service_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Whether the caller liked or bookmarked a document
#[utoipa::path(
    get,
    path = "/api/documents/{id}/engagement",
    params(
        ("id" = Uuid, Path, description = "Document ID")
    ),
    responses(
        (status = 200, description = "Engagement state", body = EngagementResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Document not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "engagement"
)]
pub async fn get_engagement(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<EngagementResponse>> {
    let engagement = snipdocs_core::engagement_state(&state.db, user.user_id, id)
        .await
        .map_err(service_error)?;
    Ok(Json(engagement.into()))
}

/// Public page of a published document; counts a view
#[utoipa::path(
    get,
    path = "/api/documents/slug/{slug}",
    params(
        ("slug" = String, Path, description = "Document slug")
    ),
    responses(
        (status = 200, description = "Published document", body = DocumentResponse),
        (status = 404, description = "No published, public document with this slug", body = ErrorResponse)
    ),
    tag = "documents"
)]
pub async fn get_document_by_slug(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> ApiResult<Json<DocumentResponse>> {
    let detail = snipdocs_core::get_published_by_slug(&state.db, &slug)
        .await
        .map_err(service_error)?;

    if let Err(e) = snipdocs_core::record_view(&state.db, detail.document.id).await {
        warn!(document_id = %detail.document.id, "Failed to record view: {}", e);
    }

    Ok(Json(detail.into()))
}
