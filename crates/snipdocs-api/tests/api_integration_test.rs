//! Integration tests for the REST API

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use sea_orm::DatabaseConnection;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use snipdocs_api::{models::*, ApiServer, ApiServerConfig};
use snipdocs_auth::MemoryEmailSender;
use snipdocs_core::{LocalIdentityConfig, LocalIdentityProvider};
use std::sync::Arc;
use tower::ServiceExt; // For `oneshot` method

const PUBLIC_URL: &str = "http://snipdocs.test";
const PASSWORD: &str = "correct horse";

/// Helper to create an in-memory database with migrations applied
async fn create_test_db() -> DatabaseConnection {
    let db = snipdocs_db::connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");
    snipdocs_db::migrate(&db)
        .await
        .expect("Failed to run migrations");
    snipdocs_core::seed_default_categories(&db)
        .await
        .expect("Failed to seed categories");
    db
}

/// Helper to create a test router and the mailbox it sends to
async fn create_test_app() -> (Router, Arc<MemoryEmailSender>) {
    let db = create_test_db().await;
    let mailer = Arc::new(MemoryEmailSender::new());
    let identity = LocalIdentityProvider::new(
        db.clone(),
        b"api-test-secret",
        mailer.clone(),
        LocalIdentityConfig {
            public_url: PUBLIC_URL.to_string(),
            ..Default::default()
        },
    );
    let config = ApiServerConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(), // Random port
        enable_cors: true,
        secure_cookies: false,
    };

    let server = ApiServer::new(config, db, Arc::new(identity));
    (server.build_router(), mailer)
}

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

fn json_request(method: &str, uri: &str, cookie: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .uri(uri)
        .method(method)
        .header("content-type", "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn get_request(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri).method("GET");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

async fn read_json<T: DeserializeOwned>(response: Response) -> T {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body)
        .unwrap_or_else(|e| panic!("Unexpected body {}: {}", String::from_utf8_lossy(&body), e))
}

/// `session_token=...` pair from a Set-Cookie header
fn session_cookie(response: &Response) -> String {
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("Set-Cookie header")
        .to_str()
        .unwrap();
    assert!(set_cookie.contains("HttpOnly"));
    set_cookie.split(';').next().unwrap().to_string()
}

/// Register, follow the confirmation link and return the session cookie
async fn signed_in_user(app: &Router, mailer: &MemoryEmailSender, username: &str) -> String {
    let email = format!("{}@example.com", username);
    let response = send(
        app,
        json_request(
            "POST",
            "/api/auth/register",
            None,
            json!({ "email": email, "password": PASSWORD, "username": username }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let mail = mailer.last_to(&email).expect("confirmation email");
    let path = mail.link.strip_prefix(PUBLIC_URL).unwrap();
    let response = send(app, get_request(path, None)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    session_cookie(&response)
}

async fn first_category(app: &Router) -> Category {
    let response = send(app, get_request("/api/categories", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let categories: Vec<Category> = read_json(response).await;
    categories.into_iter().next().expect("seeded category")
}

async fn publish(app: &Router, cookie: &str, title: &str, tags: &[&str]) -> DocumentResponse {
    let category = first_category(app).await;
    let response = send(
        app,
        json_request(
            "POST",
            "/api/documents",
            Some(cookie),
            json!({
                "title": title,
                "content": "A short walkthrough of the idea, with code.",
                "category_id": category.id,
                "status": "published",
                "visibility": "public",
                "tags": tags,
            }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    read_json(response).await
}

#[tokio::test]
async fn test_health_check() {
    let (app, _) = create_test_app().await;

    let response = send(&app, get_request("/api/health", None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let health: HealthResponse = read_json(response).await;
    assert_eq!(health.status, "healthy");
}

#[tokio::test]
async fn test_registration_confirmation_and_login() {
    let (app, mailer) = create_test_app().await;

    let response = send(
        &app,
        json_request(
            "POST",
            "/api/auth/register",
            None,
            json!({
                "email": "writer@example.com",
                "password": PASSWORD,
                "username": "writer",
                "full_name": "Test Writer"
            }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let registered: RegisterResponse = read_json(response).await;
    assert!(registered.confirmation_sent);
    assert!(!registered.user.email_verified);

    // Login waits for the confirmation link
    let login = json!({ "email": "writer@example.com", "password": PASSWORD });
    let response = send(&app, json_request("POST", "/api/auth/login", None, login.clone())).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let error: ErrorResponse = read_json(response).await;
    assert_eq!(error.code.as_deref(), Some("EMAIL_NOT_CONFIRMED"));

    let mail = mailer.last_to("writer@example.com").unwrap();
    let path = mail.link.strip_prefix(PUBLIC_URL).unwrap();
    let response = send(&app, get_request(path, None)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "/verify-email/verify-success"
    );
    let cookie = session_cookie(&response);

    let response = send(&app, get_request("/api/auth/me", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let me: CurrentUser = read_json(response).await;
    assert!(me.user.email_verified);
    let profile = me.profile.expect("profile provisioned at confirmation");
    assert_eq!(profile.username, "writer");
    assert_eq!(profile.full_name.as_deref(), Some("Test Writer"));

    let response = send(&app, json_request("POST", "/api/auth/login", None, login)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = session_cookie(&response);
    let session: LoginResponse = read_json(response).await;
    assert_eq!(session.token_type, "bearer");
    assert_eq!(cookie, format!("session_token={}", session.access_token));

    // The bearer header works as well as the cookie
    let request = Request::builder()
        .uri("/api/auth/me")
        .header(header::AUTHORIZATION, format!("Bearer {}", session.access_token))
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, request).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_registration_errors() {
    let (app, mailer) = create_test_app().await;
    signed_in_user(&app, &mailer, "taken").await;

    let response = send(
        &app,
        json_request(
            "POST",
            "/api/auth/register",
            None,
            json!({ "email": "other@example.com", "password": PASSWORD, "username": "taken" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let error: ErrorResponse = read_json(response).await;
    assert_eq!(error.error, "Username already taken");
    assert!(error.hint.is_some());

    let response = send(
        &app,
        json_request(
            "POST",
            "/api/auth/register",
            None,
            json!({ "email": "taken@example.com", "password": PASSWORD, "username": "fresh" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let error: ErrorResponse = read_json(response).await;
    assert_eq!(error.code.as_deref(), Some("EMAIL_TAKEN"));

    let response = send(
        &app,
        json_request(
            "POST",
            "/api/auth/register",
            None,
            json!({ "email": "not-an-email", "password": "123", "username": "x" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let error: ErrorResponse = read_json(response).await;
    let fields = error.fields.expect("field errors");
    assert!(fields.contains_key("email"));
    assert!(fields.contains_key("password"));
    assert!(fields.contains_key("username"));
}

#[tokio::test]
async fn test_callback_rejects_bad_token() {
    let (app, _) = create_test_app().await;

    let response = send(
        &app,
        get_request("/api/auth/callback?token_hash=bogus&type=signup", None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error: ErrorResponse = read_json(response).await;
    assert_eq!(error.code.as_deref(), Some("INVALID_TOKEN"));
}

#[tokio::test]
async fn test_forgot_password_does_not_reveal_accounts() {
    let (app, mailer) = create_test_app().await;

    let response = send(
        &app,
        json_request(
            "POST",
            "/api/auth/forgot-password",
            None,
            json!({ "email": "nobody@example.com" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert!(mailer.last_to("nobody@example.com").is_none());
}

#[tokio::test]
async fn test_oauth_and_logout() {
    let (app, _) = create_test_app().await;

    let response = send(&app, get_request("/api/auth/oauth/github", None)).await;
    assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);

    let response = send(&app, get_request("/api/auth/oauth/myspace", None)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(&app, json_request("POST", "/api/auth/logout", None, json!({}))).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let set_cookie = response.headers().get(header::SET_COOKIE).unwrap();
    assert!(set_cookie.to_str().unwrap().contains("Max-Age=0"));
}

#[tokio::test]
async fn test_protected_routes_require_session() {
    let (app, _) = create_test_app().await;

    for uri in ["/api/auth/me", "/api/documents", "/api/dashboard", "/api/me/likes"] {
        let response = send(&app, get_request(uri, None)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", uri);
        let error: ErrorResponse = read_json(response).await;
        assert_eq!(error.code.as_deref(), Some("MISSING_AUTH"));
    }

    let response = send(
        &app,
        get_request("/api/auth/me", Some("session_token=not-a-jwt")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Listing categories stays public even though creating one is protected
    let response = send(&app, get_request("/api/categories", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = send(
        &app,
        json_request("POST", "/api/categories", None, json!({ "name": "X", "slug": "x" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_document_lifecycle() {
    let (app, mailer) = create_test_app().await;
    let cookie = signed_in_user(&app, &mailer, "author").await;

    let created = publish(&app, &cookie, "Axum Extractors", &["Rust", "axum", "rust "]).await;
    let slug = created.document.slug.clone();
    assert!(slug.starts_with("axum-extractors"));
    assert!(created.document.published_at.is_some());
    assert_eq!(created.tags.len(), 2);

    let response = send(&app, get_request("/api/explore?tag=rust", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let page: DocumentPage = read_json(response).await;
    assert_eq!(page.total, 1);
    assert_eq!(
        page.items[0].author.as_ref().map(|a| a.username.as_str()),
        Some("author")
    );

    // Each public fetch counts one view
    let uri = format!("/api/documents/slug/{}", slug);
    let response = send(&app, get_request(&uri, None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = send(&app, get_request(&uri, None)).await;
    let fetched: DocumentResponse = read_json(response).await;
    assert_eq!(fetched.document.view_count, 1);

    let id = created.document.id;
    let response = send(
        &app,
        json_request(
            "PATCH",
            &format!("/api/documents/{}", id),
            Some(&cookie),
            json!({ "status": "draft", "tags": [] }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated: DocumentResponse = read_json(response).await;
    assert!(updated.document.published_at.is_none());
    assert!(updated.tags.is_empty());
    assert_eq!(updated.document.slug, slug);

    // Drafts leave the public surface
    let response = send(&app, get_request(&uri, None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(&app, get_request("/api/documents", Some(&cookie))).await;
    let own: DocumentPage = read_json(response).await;
    assert_eq!(own.total, 1);

    let request = Request::builder()
        .uri(format!("/api/documents/{}", id))
        .method("DELETE")
        .header(header::COOKIE, &cookie)
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, request).await.status(), StatusCode::NO_CONTENT);

    let response = send(
        &app,
        get_request(&format!("/api/documents/{}", id), Some(&cookie)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_document_validation_and_ownership() {
    let (app, mailer) = create_test_app().await;
    let author = signed_in_user(&app, &mailer, "owner").await;
    let stranger = signed_in_user(&app, &mailer, "stranger").await;

    let response = send(
        &app,
        json_request(
            "POST",
            "/api/documents",
            Some(&author),
            json!({ "title": "ab", "content": "short" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let error: ErrorResponse = read_json(response).await;
    let fields = error.fields.expect("field errors");
    assert!(fields.contains_key("title"));
    assert!(fields.contains_key("content"));

    let created = publish(&app, &author, "Owned Snippet", &[]).await;
    let response = send(
        &app,
        json_request(
            "PATCH",
            &format!("/api/documents/{}", created.document.id),
            Some(&stranger),
            json!({ "title": "Hijacked" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Explicit slug collisions surface as conflicts
    let category = first_category(&app).await;
    let response = send(
        &app,
        json_request(
            "POST",
            "/api/documents",
            Some(&stranger),
            json!({
                "title": "Copycat",
                "content": "Different content, same slug.",
                "category_id": category.id,
                "slug": created.document.slug,
            }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_likes_and_bookmarks() {
    let (app, mailer) = create_test_app().await;
    let author = signed_in_user(&app, &mailer, "poster").await;
    let reader = signed_in_user(&app, &mailer, "reader").await;
    let doc = publish(&app, &author, "Worth Saving", &["tips"]).await;
    let id = doc.document.id;

    let toggle = json!({ "target_type": "document", "target_id": id });
    let response = send(
        &app,
        json_request("POST", "/api/likes/toggle", Some(&reader), toggle.clone()),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let liked: ToggleResponse = read_json(response).await;
    assert!(liked.active);

    let response = send(
        &app,
        json_request(
            "POST",
            "/api/bookmarks/toggle",
            Some(&reader),
            json!({ "target_type": "document", "target_id": id, "notes": "  read later " }),
        ),
    )
    .await;
    let bookmarked: ToggleResponse = read_json(response).await;
    assert!(bookmarked.active);

    let response = send(
        &app,
        get_request(&format!("/api/documents/{}/engagement", id), Some(&reader)),
    )
    .await;
    let state: EngagementResponse = read_json(response).await;
    assert!(state.liked && state.bookmarked);

    let response = send(&app, get_request("/api/me/likes", Some(&reader))).await;
    let likes: Vec<DocumentCard> = read_json(response).await;
    assert_eq!(likes.len(), 1);
    assert_eq!(likes[0].document.like_count, 1);

    let response = send(&app, get_request("/api/me/bookmarks", Some(&reader))).await;
    let saved: Vec<SavedDocument> = read_json(response).await;
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].bookmark.notes.as_deref(), Some("read later"));

    // Only the owner may edit notes
    let bookmark_uri = format!("/api/bookmarks/{}", saved[0].bookmark.id);
    let response = send(
        &app,
        json_request("PATCH", &bookmark_uri, Some(&author), json!({ "notes": "mine now" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let response = send(
        &app,
        json_request("PATCH", &bookmark_uri, Some(&reader), json!({ "notes": "revisit" })),
    )
    .await;
    let bookmark: Bookmark = read_json(response).await;
    assert_eq!(bookmark.notes.as_deref(), Some("revisit"));

    // Second toggle removes the like
    let response = send(
        &app,
        json_request("POST", "/api/likes/toggle", Some(&reader), toggle),
    )
    .await;
    let unliked: ToggleResponse = read_json(response).await;
    assert!(!unliked.active);

    let response = send(
        &app,
        json_request(
            "POST",
            "/api/bookmarks/toggle",
            Some(&reader),
            json!({ "target_type": "comment", "target_id": id }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_drafts_hidden_from_other_users_engagement() {
    let (app, mailer) = create_test_app().await;
    let author = signed_in_user(&app, &mailer, "drafter").await;
    let stranger = signed_in_user(&app, &mailer, "snooper").await;
    let category = first_category(&app).await;

    let response = send(
        &app,
        json_request(
            "POST",
            "/api/documents",
            Some(&author),
            json!({
                "title": "Unfinished thoughts",
                "content": "Not ready for anyone else yet.",
                "category_id": category.id,
            }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let draft: DocumentResponse = read_json(response).await;
    let id = draft.document.id;

    let toggle = json!({ "target_type": "document", "target_id": id });
    let response = send(
        &app,
        json_request("POST", "/api/likes/toggle", Some(&stranger), toggle.clone()),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let response = send(
        &app,
        json_request("POST", "/api/bookmarks/toggle", Some(&stranger), toggle),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let response = send(
        &app,
        get_request(&format!("/api/documents/{}/engagement", id), Some(&stranger)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(
        &app,
        get_request(&format!("/api/documents/{}", id), Some(&author)),
    )
    .await;
    let unchanged: DocumentResponse = read_json(response).await;
    assert_eq!(unchanged.document.like_count, 0);
    assert_eq!(unchanged.document.bookmark_count, 0);
}

#[tokio::test]
async fn test_profiles_and_dashboard() {
    let (app, mailer) = create_test_app().await;
    let cookie = signed_in_user(&app, &mailer, "dashy").await;
    signed_in_user(&app, &mailer, "occupied").await;
    publish(&app, &cookie, "Dashboard Entry", &[]).await;

    let response = send(&app, get_request("/api/users/dashy", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let profile: Profile = read_json(response).await;
    assert_eq!(profile.docs_count, 1);

    let response = send(&app, get_request("/api/users/ghost", None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(
        &app,
        json_request(
            "PATCH",
            "/api/profile",
            Some(&cookie),
            json!({ "username": "occupied" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = send(
        &app,
        json_request(
            "PATCH",
            "/api/profile",
            Some(&cookie),
            json!({ "bio": "Writes about Rust" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let profile: Profile = read_json(response).await;
    assert_eq!(profile.bio.as_deref(), Some("Writes about Rust"));

    let response = send(&app, get_request("/api/dashboard", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let dashboard: DashboardResponse = read_json(response).await;
    assert_eq!(dashboard.documents, 1);
    assert_eq!(dashboard.published, 1);
    assert_eq!(dashboard.recent.len(), 1);
}

#[tokio::test]
async fn test_tags_and_explore_paging() {
    let (app, mailer) = create_test_app().await;
    let cookie = signed_in_user(&app, &mailer, "tagger").await;
    publish(&app, &cookie, "First Post", &["rust", "web"]).await;
    publish(&app, &cookie, "Second Post", &["rust"]).await;

    let response = send(&app, get_request("/api/tags?limit=1", None)).await;
    let tags: Vec<Tag> = read_json(response).await;
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].slug, "rust");
    assert_eq!(tags[0].usage_count, 2);

    let response = send(&app, get_request("/api/explore?limit=1&page=2", None)).await;
    let page: DocumentPage = read_json(response).await;
    assert_eq!(page.total, 2);
    assert_eq!(page.items.len(), 1);

    let response = send(&app, get_request("/api/explore?page=0", None)).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_openapi_spec_is_served() {
    let (app, _) = create_test_app().await;

    let response = send(&app, get_request("/api/openapi.json", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let openapi: Value = read_json(response).await;
    assert!(openapi["paths"]["/api/documents/{id}"].is_object());
}
