use axum::{Router, extract::FromRef, http::HeaderName, middleware};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Route classification and the access decision applied to every request.
pub mod access;

// Core application services and components.
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod models;
pub mod repository;
pub mod storage;

// API routers grouped by access class (public, authenticated, admin).
pub mod routes;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::ApiError;
pub use identity::{GoTrueClient, IdentityState, MockIdentityProvider};
pub use repository::{PostgresRepository, RepositoryState};
pub use storage::{MockStorageService, S3StorageClient, StorageState};

/// ApiDoc
///
/// OpenAPI document for every JSON endpoint, served at `/api-docs/openapi.json`
/// and browsable at `/swagger-ui`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health_check, handlers::register_user, handlers::login, handlers::logout,
        handlers::get_me, handlers::update_me, handlers::delete_me,
        handlers::request_avatar_upload, handlers::list_categories, handlers::get_category,
        handlers::list_forums, handlers::create_forum, handlers::get_forum,
        handlers::update_forum, handlers::delete_forum, handlers::get_admin_stats,
        handlers::list_users, handlers::get_user, handlers::update_user_role,
        handlers::delete_user, handlers::create_category, handlers::update_category,
        handlers::delete_category
    ),
    components(
        schemas(
            models::User, models::Role, models::Category, models::Forum,
            models::RegisterRequest, models::LoginRequest, models::SessionResponse,
            models::UpdateProfileRequest, models::UpdateRoleRequest,
            models::AvatarUploadRequest, models::PresignedUrlResponse,
            models::CategoryRequest, models::CreateForumRequest, models::UpdateForumRequest,
            models::AdminDashboardStats, models::HealthResponse, error::ErrorBody,
        )
    ),
    tags(
        (name = "cfa-prep", description = "CFA exam-preparation platform API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, immutable container of shared services, cloned into every request.
#[derive(Clone)]
pub struct AppState {
    /// Persistence (Postgres in production, mocks in tests).
    pub repo: RepositoryState,
    /// Avatar object storage.
    pub storage: StorageState,
    /// External identity provider (sign-up and password checks).
    pub identity: IdentityState,
    /// The loaded configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for IdentityState {
    fn from_ref(app_state: &AppState) -> IdentityState {
        app_state.identity.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// The `/api` subtree. Unmatched API paths answer with a JSON 404 instead of
/// falling through to the UI bundle.
fn api_router() -> Router<AppState> {
    Router::new()
        .merge(public::public_routes())
        .merge(authenticated::authenticated_routes())
        .nest("/admin", admin::admin_routes())
        .fallback(handlers::api_not_found)
}

/// create_router
///
/// Assembles the whole application:
///
/// 1. `/api/*` JSON routes (public, authenticated, admin).
/// 2. Swagger UI and the OpenAPI document.
/// 3. Every other path is a page served from the UI bundle, with `index.html`
///    as the client-side routing fallback.
/// 4. The access middleware wraps all of the above, fallbacks included, so an
///    unknown path is still classified (and therefore protected).
/// 5. Request id, tracing and CORS layers outermost.
pub fn create_router(state: AppState) -> Router {
    let x_request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    let ui_dir = state.config.ui_dir.clone();
    let ui_bundle = ServeDir::new(&ui_dir).fallback(ServeFile::new(ui_dir.join("index.html")));

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest("/api", api_router())
        .fallback_service(ui_bundle)
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            state,
            access::access_middleware,
        ))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(request_span)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(
            CorsLayer::new()
                .allow_methods(Any)
                .allow_origin(Any)
                .allow_headers(Any),
        )
}

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Span for every request. Access decisions and handler logs are recorded
/// inside it, so one `req_id` ties them together.
fn request_span(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = %request.method(),
        path = %request.uri().path(),
        req_id = %request_id,
    )
}
