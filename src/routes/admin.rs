use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, patch, post, put},
};

/// Admin API Router
///
/// Nested under `/api/admin`. The access layer already rejects non admin-like
/// tokens with 403; each handler re-checks the stored role, and user management
/// additionally requires SUPER_ADMIN.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /api/admin/stats
        .route("/stats", get(handlers::get_admin_stats))
        // --- User management ---
        .route("/users", get(handlers::list_users))
        .route(
            "/users/{id}",
            get(handlers::get_user).delete(handlers::delete_user),
        )
        // PATCH /api/admin/users/{id}/role (SUPER_ADMIN only)
        .route("/users/{id}/role", patch(handlers::update_user_role))
        // --- Category management ---
        .route("/categories", post(handlers::create_category))
        .route(
            "/categories/{id}",
            put(handlers::update_category).delete(handlers::delete_category),
        )
}
