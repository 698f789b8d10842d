use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public API Router
///
/// Mounted under `/api`. Every path here is classified `PublicApi`, so the
/// access layer lets anonymous callers through.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /api/health
        // Liveness and database reachability for load balancers.
        .route("/health", get(handlers::health_check))
        // POST /api/register
        // Account creation at the identity provider plus the local profile row.
        .route("/register", post(handlers::register_user))
        // POST /api/auth/login, POST /api/auth/logout
        // Session issuance and cookie clearing.
        .route("/auth/login", post(handlers::login))
        .route("/auth/logout", post(handlers::logout))
}
