//! Registration, sign-in and email-link callbacks

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Extension, Json,
};
use chrono::Utc;
use snipdocs_auth::{OAuthProvider, Session};
use snipdocs_core::{get_profile, CallbackParams, ServiceError};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{auth_error, service_error, ApiResult};
use crate::middleware::{AuthUser, SESSION_COOKIE};
use crate::models::*;
use crate::AppState;

const DEFAULT_REDIRECT: &str = "/dashboard";

fn session_cookie(state: &AppState, session: &Session) -> String {
    let max_age = (session.expires_at - Utc::now()).num_seconds().max(0);
    let secure = if state.secure_cookies { "; Secure" } else { "" };
    format!(
        "{}={}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}{}",
        SESSION_COOKIE, session.access_token, max_age, secure
    )
}

fn cleared_cookie(state: &AppState) -> String {
    let secure = if state.secure_cookies { "; Secure" } else { "" };
    format!(
        "{}=; HttpOnly; Path=/; SameSite=Lax; Max-Age=0{}",
        SESSION_COOKIE, secure
    )
}

/// Create an account and send the confirmation email
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created, confirmation pending", body = RegisterResponse),
        (status = 409, description = "Email or username already taken", body = ErrorResponse),
        (status = 422, description = "Invalid input", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    let outcome = snipdocs_core::register(&state.db, state.identity.as_ref(), req.into())
        .await
        .map_err(service_error)?;

    let message = if outcome.confirmation_sent {
        "Check your email to confirm your account"
    } else {
        "Account created, but the confirmation email could not be sent"
    };

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user: User::from(&outcome.user),
            confirmation_sent: outcome.confirmation_sent,
            message: message.to_string(),
        }),
    ))
}

/// Sign in with email and password
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in; session cookie set", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 403, description = "Email not confirmed", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let session = snipdocs_core::sign_in(
        &state.db,
        state.identity.as_ref(),
        &req.email,
        &req.password,
    )
    .await
    .map_err(service_error)?;

    info!(user_id = %session.user.id, "User signed in");
    let cookie = session_cookie(&state, &session);
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(LoginResponse::from(&session)),
    ))
}

/// Clear the session cookie
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 204, description = "Signed out")
    ),
    tag = "auth"
)]
pub async fn logout(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, cleared_cookie(&state))],
    )
}

/// Send a password reset link
///
/// Always answers 202 so the endpoint cannot be used to discover accounts.
#[utoipa::path(
    post,
    path = "/api/auth/forgot-password",
    request_body = EmailRequest,
    responses(
        (status = 202, description = "Reset link sent if the account exists", body = MessageResponse),
        (status = 503, description = "Identity service unavailable", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EmailRequest>,
) -> ApiResult<(StatusCode, Json<MessageResponse>)> {
    state
        .identity
        .reset_password_request(&req.email)
        .await
        .map_err(auth_error)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(MessageResponse {
            message: "If an account exists for this email, a reset link is on its way".to_string(),
        }),
    ))
}

/// Send a new confirmation link
#[utoipa::path(
    post,
    path = "/api/auth/resend-verification",
    request_body = EmailRequest,
    responses(
        (status = 202, description = "Confirmation link sent if the account is unconfirmed", body = MessageResponse),
        (status = 503, description = "Identity service unavailable", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn resend_verification(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EmailRequest>,
) -> ApiResult<(StatusCode, Json<MessageResponse>)> {
    state
        .identity
        .resend_verification(&req.email)
        .await
        .map_err(auth_error)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(MessageResponse {
            message: "If this email is awaiting confirmation, a new link is on its way".to_string(),
        }),
    ))
}

/// Redeem an email link or redirect code, set the session and redirect
#[utoipa::path(
    get,
    path = "/api/auth/callback",
    params(
        ("token_hash" = Option<String>, Query, description = "Email link token"),
        ("type" = Option<String>, Query, description = "Token kind: signup, recovery, magiclink or email_change"),
        ("code" = Option<String>, Query, description = "Redirect code"),
        ("next" = Option<String>, Query, description = "Relative path to continue to")
    ),
    responses(
        (status = 303, description = "Session cookie set; redirect to the next page"),
        (status = 400, description = "Invalid or expired token", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> ApiResult<Response> {
    let outcome = snipdocs_core::complete_callback(&state.db, state.identity.as_ref(), params)
        .await
        .map_err(service_error)?;

    debug!(user_id = %outcome.session.user.id, "Callback redeemed");
    let cookie = session_cookie(&state, &outcome.session);
    Ok((
        [(header::SET_COOKIE, cookie)],
        Redirect::to(&outcome.redirect_to),
    )
        .into_response())
}

/// Start an OAuth sign-in
#[utoipa::path(
    get,
    path = "/api/auth/oauth/{provider}",
    params(
        ("provider" = String, Path, description = "github or google"),
        OAuthQuery
    ),
    responses(
        (status = 303, description = "Redirect to the provider"),
        (status = 400, description = "Unknown provider", body = ErrorResponse),
        (status = 501, description = "Provider not configured", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn oauth(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
    Query(query): Query<OAuthQuery>,
) -> ApiResult<Redirect> {
    let provider: OAuthProvider = provider.parse().map_err(auth_error)?;
    let redirect_to = query.redirect_to.as_deref().unwrap_or(DEFAULT_REDIRECT);

    let redirect = state
        .identity
        .sign_in_with_oauth(provider, redirect_to)
        .await
        .map_err(auth_error)?;

    Ok(Redirect::to(&redirect.url))
}

/// Get the current user and their profile
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user", body = CurrentUser),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn get_current_user(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<CurrentUser>> {
    let profile = match get_profile(&state.db, user.user_id).await {
        Ok(profile) => Some(Profile::from(profile)),
        Err(ServiceError::NotFound) => None,
        Err(e) => return Err(service_error(e)),
    };

    Ok(Json(CurrentUser {
        user: User {
            id: user.user_id,
            email: user.email,
            email_verified: user.email_verified,
        },
        profile,
    }))
}

/// Set a new password for the signed-in user
#[utoipa::path(
    post,
    path = "/api/auth/update-password",
    request_body = UpdatePasswordRequest,
    responses(
        (status = 204, description = "Password updated"),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 422, description = "Password does not meet the policy", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn update_password(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<UpdatePasswordRequest>,
) -> ApiResult<StatusCode> {
    state
        .identity
        .set_password(user.user_id, &req.password)
        .await
        .map_err(auth_error)?;

    info!(user_id = %user.user_id, "Password changed");
    Ok(StatusCode::NO_CONTENT)
}
