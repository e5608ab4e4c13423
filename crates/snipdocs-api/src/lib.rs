//! REST API for snipdocs
//!
//! Public routes (health, auth entry points, explore, public documents and
//! profiles) are merged with protected routes that run behind
//! [`middleware::require_auth`]. The OpenAPI document is served at
//! `/api/openapi.json` with Swagger UI at `/swagger-ui`.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::{get, patch, post},
    Router,
};
use sea_orm::DatabaseConnection;
use snipdocs_auth::IdentityProvider;
use std::{net::SocketAddr, sync::Arc};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

/// Application state shared across handlers
pub struct AppState {
    pub db: DatabaseConnection,
    pub identity: Arc<dyn IdentityProvider>,
    /// Mark session cookies `Secure` (serve over HTTPS only)
    pub secure_cookies: bool,
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Snipdocs API",
        version = "0.1.0",
        description = "Publish, discover and bookmark developer snippets and articles",
        contact(
            name = "Snipdocs Team",
            email = "team@snipdocs.dev"
        )
    ),
    paths(
        handlers::health_check,
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::logout,
        handlers::auth::forgot_password,
        handlers::auth::resend_verification,
        handlers::auth::callback,
        handlers::auth::oauth,
        handlers::auth::get_current_user,
        handlers::auth::update_password,
        handlers::catalog::explore,
        handlers::catalog::list_categories,
        handlers::catalog::create_category,
        handlers::catalog::list_tags,
        handlers::documents::list_documents,
        handlers::documents::create_document,
        handlers::documents::get_document,
        handlers::documents::update_document,
        handlers::documents::delete_document,
        handlers::documents::get_engagement,
        handlers::documents::get_document_by_slug,
        handlers::engagement::toggle_like,
        handlers::engagement::toggle_bookmark,
        handlers::engagement::update_bookmark,
        handlers::engagement::my_likes,
        handlers::engagement::my_bookmarks,
        handlers::profiles::get_user_profile,
        handlers::profiles::update_profile,
        handlers::profiles::dashboard,
    ),
    components(
        schemas(
            models::HealthResponse,
            models::ErrorResponse,
            models::MessageResponse,
            models::RegisterRequest,
            models::User,
            models::RegisterResponse,
            models::LoginRequest,
            models::LoginResponse,
            models::EmailRequest,
            models::UpdatePasswordRequest,
            models::CurrentUser,
            models::Profile,
            models::Author,
            models::UpdateProfileRequest,
            models::Category,
            models::CreateCategoryRequest,
            models::Tag,
            models::Document,
            models::DocumentResponse,
            models::CreateDocumentRequest,
            models::UpdateDocumentRequest,
            models::DocumentCard,
            models::DocumentPage,
            models::DashboardResponse,
            models::ToggleRequest,
            models::ToggleResponse,
            models::EngagementResponse,
            models::Bookmark,
            models::UpdateBookmarkRequest,
            models::SavedDocument,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Registration, sign-in and account endpoints"),
        (name = "documents", description = "Document authoring endpoints"),
        (name = "explore", description = "Public browsing, categories and tags"),
        (name = "engagement", description = "Likes and bookmarks"),
        (name = "profiles", description = "Profiles and the author dashboard"),
        (name = "system", description = "System health endpoints")
    )
)]
pub struct ApiDoc;

/// API server configuration
pub struct ApiServerConfig {
    /// Address to bind the API server
    pub bind_addr: SocketAddr,
    /// Enable CORS for local frontends
    pub enable_cors: bool,
    /// Mark session cookies `Secure`
    pub secure_cookies: bool,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3080)),
            enable_cors: true,
            secure_cookies: false,
        }
    }
}

/// API Server
pub struct ApiServer {
    config: ApiServerConfig,
    state: Arc<AppState>,
}

impl ApiServer {
    pub fn new(
        config: ApiServerConfig,
        db: DatabaseConnection,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        let state = Arc::new(AppState {
            db,
            identity,
            secure_cookies: config.secure_cookies,
        });

        Self { config, state }
    }

    /// Build the router with all routes
    pub fn build_router(&self) -> Router {
        let public_router = Router::new()
            .route("/api/health", get(handlers::health_check))
            .route("/api/auth/register", post(handlers::auth::register))
            .route("/api/auth/login", post(handlers::auth::login))
            .route("/api/auth/logout", post(handlers::auth::logout))
            .route(
                "/api/auth/forgot-password",
                post(handlers::auth::forgot_password),
            )
            .route(
                "/api/auth/resend-verification",
                post(handlers::auth::resend_verification),
            )
            .route("/api/auth/callback", get(handlers::auth::callback))
            .route("/api/auth/oauth/{provider}", get(handlers::auth::oauth))
            .route("/api/explore", get(handlers::catalog::explore))
            .route(
                "/api/documents/slug/{slug}",
                get(handlers::documents::get_document_by_slug),
            )
            .route(
                "/api/users/{username}",
                get(handlers::profiles::get_user_profile),
            )
            .route("/api/tags", get(handlers::catalog::list_tags))
            // POST on the same path is merged in from the protected router
            .route("/api/categories", get(handlers::catalog::list_categories))
            .with_state(self.state.clone());

        let protected_router = Router::new()
            .route("/api/auth/me", get(handlers::auth::get_current_user))
            .route(
                "/api/auth/update-password",
                post(handlers::auth::update_password),
            )
            .route("/api/profile", patch(handlers::profiles::update_profile))
            .route("/api/dashboard", get(handlers::profiles::dashboard))
            .route(
                "/api/documents",
                get(handlers::documents::list_documents).post(handlers::documents::create_document),
            )
            .route(
                "/api/documents/{id}",
                get(handlers::documents::get_document)
                    .patch(handlers::documents::update_document)
                    .delete(handlers::documents::delete_document),
            )
            .route(
                "/api/documents/{id}/engagement",
                get(handlers::documents::get_engagement),
            )
            .route("/api/likes/toggle", post(handlers::engagement::toggle_like))
            .route(
                "/api/bookmarks/toggle",
                post(handlers::engagement::toggle_bookmark),
            )
            .route(
                "/api/bookmarks/{id}",
                patch(handlers::engagement::update_bookmark),
            )
            .route("/api/me/likes", get(handlers::engagement::my_likes))
            .route("/api/me/bookmarks", get(handlers::engagement::my_bookmarks))
            .route("/api/categories", post(handlers::catalog::create_category))
            .with_state(self.state.clone())
            .layer(axum_middleware::from_fn_with_state(
                self.state.clone(),
                middleware::require_auth,
            ));

        let api_router = public_router.merge(protected_router);

        let router = Router::new()
            .merge(SwaggerUi::new("/swagger-ui").url("/api/openapi.json", ApiDoc::openapi()))
            .merge(api_router);

        let mut router = router.layer(TraceLayer::new_for_http());

        if self.config.enable_cors {
            // Credentials (the session cookie) rule out a wildcard origin
            let cors = CorsLayer::new()
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::PATCH,
                ])
                .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
                .allow_credentials(true)
                .allow_origin(AllowOrigin::predicate(|origin: &HeaderValue, _| {
                    let origin = origin.to_str().unwrap_or("");
                    origin.starts_with("http://localhost:")
                        || origin.starts_with("http://127.0.0.1:")
                        || origin.starts_with("https://localhost:")
                        || origin.starts_with("https://127.0.0.1:")
                }));
            router = router.layer(cors);
        }

        router
    }

    /// Start the API server
    pub async fn start(self) -> Result<(), anyhow::Error> {
        let router = self.build_router();

        info!("Starting API server on {}", self.config.bind_addr);
        info!(
            "OpenAPI spec: http://{}/api/openapi.json",
            self.config.bind_addr
        );
        info!("Swagger UI: http://{}/swagger-ui", self.config.bind_addr);

        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;

        axum::serve(listener, router)
            .await
            .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

        Ok(())
    }
}
