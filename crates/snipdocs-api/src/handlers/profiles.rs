//! Public profiles, profile editing and the author dashboard

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use std::sync::Arc;

use crate::error::{service_error, ApiResult};
use crate::middleware::AuthUser;
use crate::models::*;
use crate::AppState;

/// Public profile by username
#[utoipa::path(
    get,
    path = "/api/users/{username}",
    params(
        ("username" = String, Path, description = "Username")
    ),
    responses(
        (status = 200, description = "Profile", body = Profile),
        (status = 404, description = "No such user", body = ErrorResponse)
    ),
    tag = "profiles"
)]
pub async fn get_user_profile(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> ApiResult<Json<Profile>> {
    let profile = snipdocs_core::get_profile_by_username(&state.db, &username)
        .await
        .map_err(service_error)?;
    Ok(Json(profile.into()))
}

/// Update the caller's profile
#[utoipa::path(
    patch,
    path = "/api/profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated profile", body = Profile),
        (status = 404, description = "Profile not provisioned yet", body = ErrorResponse),
        (status = 409, description = "Username already taken", body = ErrorResponse),
        (status = 422, description = "Invalid input", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "profiles"
)]
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<Json<Profile>> {
    let profile = snipdocs_core::update_profile(
        &state.db,
        state.identity.as_ref(),
        user.user_id,
        req.into(),
    )
    .await
    .map_err(service_error)?;
    Ok(Json(profile.into()))
}

/// Totals and recent documents for the caller
#[utoipa::path(
    get,
    path = "/api/dashboard",
    responses(
        (status = 200, description = "Dashboard", body = DashboardResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "profiles"
)]
pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<DashboardResponse>> {
    let dashboard = snipdocs_core::author_dashboard(&state.db, user.user_id)
        .await
        .map_err(service_error)?;
    Ok(Json(dashboard.into()))
}
