use crate::{
    AppState,
    auth::{AuthUser, SESSION_COOKIE, issue_token},
    config::Env,
    error::{ApiError, ErrorBody},
    identity::ProviderError,
    models::{
        AdminDashboardStats, AvatarUploadRequest, Category, CategoryRequest, CreateForumRequest,
        Forum, HealthResponse, LoginRequest, NewUser, PresignedUrlResponse, RegisterRequest, Role,
        SessionResponse, UpdateForumRequest, UpdateProfileRequest, UpdateRoleRequest, User,
        slugify,
    },
    repository::{ForumFilter, RepoError},
    storage::avatar_object_key,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use uuid::Uuid;

// --- Helpers ---

/// Ownership scope for forum writes: admins act on any row, everyone else only
/// on their own.
fn owner_scope(user: &AuthUser) -> Option<Uuid> {
    if user.role.is_admin_like() {
        None
    } else {
        Some(user.id)
    }
}

fn session_cookie(token: &str, max_age: u64, env: Env) -> String {
    let secure = if env == Env::Production { "; Secure" } else { "" };
    format!("{SESSION_COOKIE}={token}; HttpOnly; Path=/; SameSite=Lax; Max-Age={max_age}{secure}")
}

fn expired_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; HttpOnly; Path=/; SameSite=Lax; Max-Age=0")
}

// --- Public Handlers ---

/// health_check
///
/// [Public Route] Liveness plus a database round-trip. 503 when the database
/// does not answer, so load balancers take the instance out of rotation.
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Healthy", body = HealthResponse),
        (status = 503, description = "Database unreachable", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    match state.repo.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok".to_string(),
                database: "up".to_string(),
            }),
        ),
        Err(e) => {
            tracing::error!(error = %e, "health check: database ping failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "degraded".to_string(),
                    database: "down".to_string(),
                }),
            )
        }
    }
}

/// register_user
///
/// [Public Route] Creates the account at the identity provider, then mirrors it
/// into `profiles` with role USER under the provider's subject id.
#[utoipa::path(
    post,
    path = "/api/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registered", body = User),
        (status = 400, description = "Invalid payload or rejected by provider", body = ErrorBody),
        (status = 409, description = "Email already registered", body = ErrorBody),
        (status = 502, description = "Identity provider unavailable", body = ErrorBody)
    )
)]
pub async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    payload.validate().map_err(ApiError::bad_request)?;

    let email = payload.email.trim().to_lowercase();
    let id = state.identity.sign_up(&email, &payload.password).await?;

    let user = state
        .repo
        .create_user(NewUser {
            id,
            email,
            display_name: payload.display_name.trim().to_string(),
            role: Role::User,
        })
        .await
        .map_err(|e| match e {
            RepoError::Conflict => ApiError::Conflict("Email already registered".to_string()),
            other => other.into(),
        })?;

    tracing::info!(user_id = %user.id, "user registered");
    Ok((StatusCode::CREATED, Json(user)))
}

/// login
///
/// [Public Route] Verifies the password with the identity provider and issues a
/// session token carrying the stored role. The token is returned in the body and
/// set as an `HttpOnly` cookie.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = SessionResponse),
        (status = 401, description = "Invalid credentials", body = ErrorBody),
        (status = 502, description = "Identity provider unavailable", body = ErrorBody)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate().map_err(ApiError::bad_request)?;

    let email = payload.email.trim().to_lowercase();
    let user_id = state
        .identity
        .sign_in(&email, &payload.password)
        .await
        .map_err(|e| match e {
            ProviderError::Rejected(_) => ApiError::InvalidCredentials,
            other => other.into(),
        })?;

    // Provider account without a profile row: treat as unknown.
    let user = state
        .repo
        .get_user(user_id)
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    let ttl = state.config.session_ttl_secs;
    let token = issue_token(user.id, user.role, &state.config.jwt_secret, ttl).map_err(|e| {
        tracing::error!(error = %e, "failed to sign session token");
        ApiError::Internal
    })?;

    let cookie = session_cookie(&token, ttl, state.config.env);
    tracing::info!(user_id = %user.id, "user signed in");

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(SessionResponse {
            access_token: token,
            token_type: "Bearer".to_string(),
            expires_in: ttl,
        }),
    ))
}

/// logout
///
/// [Public Route] Clears the session cookie. Tokens are stateless, so a bearer
/// token held elsewhere stays valid until it expires.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses((status = 204, description = "Signed out"))
)]
pub async fn logout() -> impl IntoResponse {
    (
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, expired_session_cookie())],
    )
}

/// Fallback for unmatched `/api/*` paths, so they never reach the UI bundle.
pub async fn api_not_found() -> ApiError {
    ApiError::NotFound("Route")
}

// --- Authenticated Handlers: Profile ---

/// get_me
///
/// [Authenticated Route] The caller's own profile.
#[utoipa::path(
    get,
    path = "/api/user",
    responses((status = 200, description = "Profile", body = User))
)]
pub async fn get_me(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<User>, ApiError> {
    let user = state
        .repo
        .get_user(id)
        .await?
        .ok_or(ApiError::NotFound("User"))?;
    Ok(Json(user))
}

/// update_me
///
/// [Authenticated Route] Partial profile update. An `avatar_key` must live under
/// the caller's own avatar prefix; the avatar it replaces is removed from storage.
#[utoipa::path(
    patch,
    path = "/api/user",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated", body = User),
        (status = 400, description = "Invalid payload", body = ErrorBody)
    )
)]
pub async fn update_me(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<User>, ApiError> {
    payload.validate(id).map_err(ApiError::bad_request)?;

    let previous_avatar = match payload.avatar_key {
        Some(_) => state.repo.get_user(id).await?.and_then(|u| u.avatar_key),
        None => None,
    };

    let user = state
        .repo
        .update_profile(id, payload)
        .await?
        .ok_or(ApiError::NotFound("User"))?;

    if let Some(old) = previous_avatar
        && user.avatar_key.as_deref() != Some(old.as_str())
    {
        remove_avatar(&state, &old).await;
    }

    Ok(Json(user))
}

/// Storage cleanup never fails the request; an orphaned object is only logged.
async fn remove_avatar(state: &AppState, key: &str) {
    if let Err(e) = state.storage.delete_object(key).await {
        tracing::warn!(key, error = %e, "failed to delete avatar object");
    }
}

/// delete_me
///
/// [Authenticated Route] Deletes the caller's profile and avatar and clears the
/// session cookie. The account at the identity provider is left alone.
#[utoipa::path(
    delete,
    path = "/api/user",
    responses((status = 204, description = "Deleted"))
)]
pub async fn delete_me(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let avatar = state.repo.get_user(id).await?.and_then(|u| u.avatar_key);

    if !state.repo.delete_user(id).await? {
        return Err(ApiError::NotFound("User"));
    }
    if let Some(key) = avatar {
        remove_avatar(&state, &key).await;
    }
    tracing::info!(user_id = %id, "profile deleted by owner");
    Ok((
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, expired_session_cookie())],
    ))
}

/// request_avatar_upload
///
/// [Authenticated Route] Hands out a 10-minute presigned PUT URL for a new
/// avatar under `avatars/<user id>/`. The client uploads directly to storage and
/// then sends the returned key as `avatar_key` to `PATCH /api/user`.
#[utoipa::path(
    post,
    path = "/api/user/avatar",
    request_body = AvatarUploadRequest,
    responses(
        (status = 200, description = "URL", body = PresignedUrlResponse),
        (status = 400, description = "Not an image", body = ErrorBody)
    )
)]
pub async fn request_avatar_upload(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<AvatarUploadRequest>,
) -> Result<Json<PresignedUrlResponse>, ApiError> {
    payload.validate().map_err(ApiError::bad_request)?;

    let object_key = avatar_object_key(id, &payload.filename);
    let upload_url = state
        .storage
        .presign_put(&object_key, &payload.file_type)
        .await?;

    Ok(Json(PresignedUrlResponse {
        upload_url,
        resource_key: object_key,
    }))
}

// --- Authenticated Handlers: Categories & Forums ---

#[utoipa::path(
    get,
    path = "/api/categories",
    responses((status = 200, description = "All categories", body = [Category]))
)]
pub async fn list_categories(
    _user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Category>>, ApiError> {
    Ok(Json(state.repo.list_categories().await?))
}

#[utoipa::path(
    get,
    path = "/api/categories/{id}",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Found", body = Category),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn get_category(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Category>, ApiError> {
    let category = state
        .repo
        .get_category(id)
        .await?
        .ok_or(ApiError::NotFound("Category"))?;
    Ok(Json(category))
}

/// list_forums
///
/// [Authenticated Route] Forums, newest first, optionally filtered by category
/// and a case-insensitive search over title and description.
#[utoipa::path(
    get,
    path = "/api/forums",
    params(ForumFilter),
    responses((status = 200, description = "Forums", body = [Forum]))
)]
pub async fn list_forums(
    _user: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<ForumFilter>,
) -> Result<Json<Vec<Forum>>, ApiError> {
    Ok(Json(state.repo.list_forums(filter).await?))
}

/// create_forum
///
/// [Authenticated Route] Any signed-in user may open a forum in an existing
/// category; they become its owner.
#[utoipa::path(
    post,
    path = "/api/forums",
    request_body = CreateForumRequest,
    responses(
        (status = 201, description = "Created", body = Forum),
        (status = 404, description = "Category not found", body = ErrorBody)
    )
)]
pub async fn create_forum(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateForumRequest>,
) -> Result<(StatusCode, Json<Forum>), ApiError> {
    payload.validate().map_err(ApiError::bad_request)?;

    if state.repo.get_category(payload.category_id).await?.is_none() {
        return Err(ApiError::NotFound("Category"));
    }

    let forum = state.repo.create_forum(payload, id).await?;
    Ok((StatusCode::CREATED, Json(forum)))
}

#[utoipa::path(
    get,
    path = "/api/forums/{id}",
    params(("id" = Uuid, Path, description = "Forum ID")),
    responses(
        (status = 200, description = "Found", body = Forum),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn get_forum(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Forum>, ApiError> {
    let forum = state
        .repo
        .get_forum(id)
        .await?
        .ok_or(ApiError::NotFound("Forum"))?;
    Ok(Json(forum))
}

/// update_forum
///
/// [Authenticated Route] Owner or admin only. A forum the caller may not edit
/// answers 404, the same as a missing one.
#[utoipa::path(
    put,
    path = "/api/forums/{id}",
    params(("id" = Uuid, Path, description = "Forum ID")),
    request_body = UpdateForumRequest,
    responses(
        (status = 200, description = "Updated", body = Forum),
        (status = 404, description = "Not Found or Not Yours", body = ErrorBody)
    )
)]
pub async fn update_forum(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateForumRequest>,
) -> Result<Json<Forum>, ApiError> {
    payload.validate().map_err(ApiError::bad_request)?;

    if let Some(category_id) = payload.category_id
        && state.repo.get_category(category_id).await?.is_none()
    {
        return Err(ApiError::NotFound("Category"));
    }

    let forum = state
        .repo
        .update_forum(id, owner_scope(&user), payload)
        .await?
        .ok_or(ApiError::NotFound("Forum"))?;
    Ok(Json(forum))
}

#[utoipa::path(
    delete,
    path = "/api/forums/{id}",
    params(("id" = Uuid, Path, description = "Forum ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found or Not Yours", body = ErrorBody)
    )
)]
pub async fn delete_forum(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.repo.delete_forum(id, owner_scope(&user)).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Forum"))
    }
}

// --- Admin Handlers ---

/// get_admin_stats
///
/// [Admin Route] Dashboard counters. The role is re-checked against the stored
/// profile even though the access layer already gated the route.
#[utoipa::path(
    get,
    path = "/api/admin/stats",
    responses(
        (status = 200, description = "Stats", body = AdminDashboardStats),
        (status = 403, description = "Not an admin", body = ErrorBody)
    )
)]
pub async fn get_admin_stats(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<AdminDashboardStats>, ApiError> {
    user.require_admin()?;
    Ok(Json(state.repo.get_stats().await?))
}

#[utoipa::path(
    get,
    path = "/api/admin/users",
    responses((status = 200, description = "All users", body = [User]))
)]
pub async fn list_users(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<User>>, ApiError> {
    user.require_admin()?;
    Ok(Json(state.repo.list_users().await?))
}

#[utoipa::path(
    get,
    path = "/api/admin/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Found", body = User),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn get_user(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<User>, ApiError> {
    user.require_admin()?;
    let found = state
        .repo
        .get_user(id)
        .await?
        .ok_or(ApiError::NotFound("User"))?;
    Ok(Json(found))
}

/// update_user_role
///
/// [Admin Route] SUPER_ADMIN only. Nobody can change their own role, which also
/// keeps the last super admin from demoting themselves by accident.
#[utoipa::path(
    patch,
    path = "/api/admin/users/{id}/role",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateRoleRequest,
    responses(
        (status = 200, description = "Updated", body = User),
        (status = 400, description = "Own role", body = ErrorBody),
        (status = 403, description = "Not a super admin", body = ErrorBody),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn update_user_role(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateRoleRequest>,
) -> Result<Json<User>, ApiError> {
    user.require_super_admin()?;
    if id == user.id {
        return Err(ApiError::bad_request("cannot change your own role"));
    }

    let updated = state
        .repo
        .set_user_role(id, payload.role)
        .await?
        .ok_or(ApiError::NotFound("User"))?;

    tracing::info!(actor = %user.id, target = %id, role = %payload.role, "role changed");
    Ok(Json(updated))
}

/// delete_user
///
/// [Admin Route] SUPER_ADMIN only; self-deletion goes through `DELETE /api/user`.
#[utoipa::path(
    delete,
    path = "/api/admin/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 400, description = "Own account", body = ErrorBody),
        (status = 403, description = "Not a super admin", body = ErrorBody),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn delete_user(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    user.require_super_admin()?;
    if id == user.id {
        return Err(ApiError::bad_request("cannot delete your own account here"));
    }

    let avatar = state.repo.get_user(id).await?.and_then(|u| u.avatar_key);

    if !state.repo.delete_user(id).await? {
        return Err(ApiError::NotFound("User"));
    }
    if let Some(key) = avatar {
        remove_avatar(&state, &key).await;
    }
    tracing::info!(actor = %user.id, target = %id, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}

fn category_conflict(e: RepoError) -> ApiError {
    match e {
        RepoError::Conflict => ApiError::Conflict("Category already exists".to_string()),
        other => other.into(),
    }
}

/// create_category
///
/// [Admin Route] The slug is derived from the name; a duplicate slug is a 409.
#[utoipa::path(
    post,
    path = "/api/admin/categories",
    request_body = CategoryRequest,
    responses(
        (status = 201, description = "Created", body = Category),
        (status = 409, description = "Duplicate", body = ErrorBody)
    )
)]
pub async fn create_category(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CategoryRequest>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    user.require_admin()?;
    payload.validate().map_err(ApiError::bad_request)?;

    let category = state
        .repo
        .create_category(
            &payload.name,
            &slugify(&payload.name),
            payload.description.as_deref(),
        )
        .await
        .map_err(category_conflict)?;
    Ok((StatusCode::CREATED, Json(category)))
}

#[utoipa::path(
    put,
    path = "/api/admin/categories/{id}",
    params(("id" = Uuid, Path, description = "Category ID")),
    request_body = CategoryRequest,
    responses(
        (status = 200, description = "Updated", body = Category),
        (status = 404, description = "Not Found", body = ErrorBody),
        (status = 409, description = "Duplicate", body = ErrorBody)
    )
)]
pub async fn update_category(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CategoryRequest>,
) -> Result<Json<Category>, ApiError> {
    user.require_admin()?;
    payload.validate().map_err(ApiError::bad_request)?;

    let category = state
        .repo
        .update_category(
            id,
            &payload.name,
            &slugify(&payload.name),
            payload.description.as_deref(),
        )
        .await
        .map_err(category_conflict)?
        .ok_or(ApiError::NotFound("Category"))?;
    Ok(Json(category))
}

/// delete_category
///
/// [Admin Route] Removes the category together with its forums.
#[utoipa::path(
    delete,
    path = "/api/admin/categories/{id}",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn delete_category(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    user.require_admin()?;
    if state.repo.delete_category(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Category"))
    }
}
