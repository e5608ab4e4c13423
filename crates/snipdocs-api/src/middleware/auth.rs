//! Session Authentication Middleware
//!
//! Resolves the session token through the identity provider and makes the
//! caller available to handlers via Axum's Extension.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{auth_error, ApiError};
use crate::models::ErrorResponse;
use crate::AppState;

/// Name of the HTTP-only cookie carrying the session token
pub const SESSION_COOKIE: &str = "session_token";

/// Authenticated caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
    pub email_verified: bool,
}

fn unauthorized(error: &str, code: &str) -> ApiError {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse::new(error, code)),
    )
}

fn cookie_token(headers: &HeaderMap) -> Option<String> {
    let prefix = format!("{}=", SESSION_COOKIE);
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .map(str::trim)
        .find_map(|cookie| cookie.strip_prefix(prefix.as_str()))
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// Session token from the cookie, or from `Authorization: Bearer <token>`
pub(crate) fn session_token(headers: &HeaderMap) -> Result<String, ApiError> {
    if let Some(token) = cookie_token(headers) {
        return Ok(token);
    }

    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            unauthorized(
                "Missing authentication token (cookie or Authorization header)",
                "MISSING_AUTH",
            )
        })?;

    auth_header
        .strip_prefix("Bearer ")
        .map(str::to_string)
        .ok_or_else(|| {
            unauthorized(
                "Invalid Authorization header format. Expected 'Bearer <token>'",
                "INVALID_AUTH_FORMAT",
            )
        })
}

/// Authentication middleware for protected routes
///
/// The token is taken from the `session_token` cookie first (web app), then
/// from the Authorization header (API clients), and resolved to an identity
/// by the identity provider.
///
/// # Errors
/// Returns 401 Unauthorized if no token is present or it does not resolve to
/// a user, and 503 if the identity provider cannot be reached.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = session_token(request.headers())?;

    let user = state
        .identity
        .get_user(&token)
        .await
        .map_err(auth_error)?
        .ok_or_else(|| unauthorized("Invalid or expired session", "INVALID_TOKEN"))?;

    request.extensions_mut().insert(AuthUser {
        user_id: user.id,
        email: user.email.clone(),
        email_verified: user.email_verified(),
    });

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, middleware, routing::get, Router};
    use chrono::{Duration, Utc};
    use sea_orm::{ActiveModelTrait, Set};
    use snipdocs_auth::{JwtValidator, MemoryEmailSender, SessionClaims};
    use snipdocs_core::{LocalIdentityConfig, LocalIdentityProvider};
    use snipdocs_db::entities::identity;
    use tower::ServiceExt; // For oneshot()

    const JWT_SECRET: &[u8] = b"test-secret-key";

    async fn protected_handler(axum::Extension(user): axum::Extension<AuthUser>) -> Json<AuthUser> {
        Json(user)
    }

    async fn create_test_app() -> (Router, Uuid) {
        let db = snipdocs_db::connect("sqlite::memory:").await.unwrap();
        snipdocs_db::migrate(&db).await.unwrap();

        let user_id = Uuid::new_v4();
        identity::ActiveModel {
            id: Set(user_id),
            email: Set("dev@example.com".to_string()),
            password_hash: Set(None),
            metadata: Set(r#"{"email_verified":true}"#.to_string()),
            email_confirmed_at: Set(Some(Utc::now())),
            last_sign_in_at: Set(None),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        }
        .insert(&db)
        .await
        .unwrap();

        let provider = LocalIdentityProvider::new(
            db.clone(),
            JWT_SECRET,
            Arc::new(MemoryEmailSender::new()),
            LocalIdentityConfig::default(),
        );
        let state = Arc::new(AppState {
            db,
            identity: Arc::new(provider),
            secure_cookies: false,
        });

        let app = Router::new()
            .route("/protected", get(protected_handler))
            .layer(middleware::from_fn_with_state(state.clone(), require_auth))
            .with_state(state);
        (app, user_id)
    }

    fn session_for(user_id: Uuid, secret: &[u8], validity: Duration) -> String {
        let claims = SessionClaims::new(user_id, "dev@example.com", "snipdocs", validity);
        JwtValidator::new(secret)
            .with_issuer("snipdocs")
            .encode(&claims)
            .unwrap()
    }

    async fn error_body(response: Response) -> ErrorResponse {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_auth_middleware_valid_bearer_token() {
        let (app, user_id) = create_test_app().await;
        let token = session_for(user_id, JWT_SECRET, Duration::hours(1));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/protected")
                    .header("Authorization", format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let auth_user: AuthUser = serde_json::from_slice(&body).unwrap();

        assert_eq!(auth_user.user_id, user_id);
        assert_eq!(auth_user.email, "dev@example.com");
        assert!(auth_user.email_verified);
    }

    #[tokio::test]
    async fn test_auth_middleware_valid_cookie() {
        let (app, user_id) = create_test_app().await;
        let token = session_for(user_id, JWT_SECRET, Duration::hours(1));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/protected")
                    .header("Cookie", format!("theme=dark; session_token={}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_auth_middleware_missing_authorization_header() {
        let (app, _) = create_test_app().await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/protected")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let error = error_body(response).await;
        assert!(error
            .error
            .contains("Missing authentication token (cookie or Authorization header)"));
    }

    #[tokio::test]
    async fn test_auth_middleware_invalid_bearer_format() {
        let (app, _) = create_test_app().await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/protected")
                    .header("Authorization", "InvalidFormat token123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let error = error_body(response).await;
        assert!(error.error.contains("Invalid Authorization header format"));
    }

    #[tokio::test]
    async fn test_auth_middleware_expired_token() {
        let (app, user_id) = create_test_app().await;
        let token = session_for(user_id, JWT_SECRET, Duration::seconds(-10));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/protected")
                    .header("Authorization", format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let error = error_body(response).await;
        assert_eq!(error.code.as_deref(), Some("INVALID_TOKEN"));
    }

    #[tokio::test]
    async fn test_auth_middleware_wrong_secret() {
        let (app, user_id) = create_test_app().await;
        let token = session_for(user_id, b"wrong-secret-key", Duration::hours(1));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/protected")
                    .header("Authorization", format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_auth_middleware_unknown_user() {
        let (app, _) = create_test_app().await;
        let token = session_for(Uuid::new_v4(), JWT_SECRET, Duration::hours(1));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/protected")
                    .header("Authorization", format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_cleared_cookie_falls_back_to_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, "session_token=".parse().unwrap());
        headers.insert(header::AUTHORIZATION, "Bearer abc".parse().unwrap());
        assert_eq!(session_token(&headers).unwrap(), "abc");
    }
}
