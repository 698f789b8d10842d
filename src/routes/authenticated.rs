use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Authenticated API Router
///
/// Mounted under `/api`. Classified `Protected`: anonymous API callers get 401
/// from the access layer. Every handler takes `AuthUser`, which re-loads the
/// profile and is the basis for ownership checks on forums.
pub fn authenticated_routes() -> Router<AppState> {
    Router::new()
        // --- Profile ---
        // GET/PATCH/DELETE /api/user
        .route(
            "/user",
            get(handlers::get_me)
                .patch(handlers::update_me)
                .delete(handlers::delete_me),
        )
        // POST /api/user/avatar
        // Presigned upload URL for a new avatar image.
        .route("/user/avatar", post(handlers::request_avatar_upload))
        // --- Categories (read-only here; writes are admin routes) ---
        .route("/categories", get(handlers::list_categories))
        .route("/categories/{id}", get(handlers::get_category))
        // --- Forums ---
        .route(
            "/forums",
            get(handlers::list_forums).post(handlers::create_forum),
        )
        // PUT/DELETE are owner-or-admin, enforced in the repository query.
        .route(
            "/forums/{id}",
            get(handlers::get_forum)
                .put(handlers::update_forum)
                .delete(handlers::delete_forum),
        )
}
