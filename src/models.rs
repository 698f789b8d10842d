use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

pub use crate::access::Role;

const MAX_DESCRIPTION: usize = 2000;
const MIN_PASSWORD: usize = 8;

/// Length and presence rule for a free-text field.
struct TextRule {
    max: usize,
    missing: &'static str,
    too_long: &'static str,
}

const DISPLAY_NAME: TextRule = TextRule {
    max: 80,
    missing: "display_name is required",
    too_long: "display_name must be <= 80 chars",
};
const CATEGORY_NAME: TextRule = TextRule {
    max: 80,
    missing: "name is required",
    too_long: "name must be <= 80 chars",
};
const FORUM_TITLE: TextRule = TextRule {
    max: 200,
    missing: "title is required",
    too_long: "title must be <= 200 chars",
};

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// A candidate's profile, stored in the `profiles` table. The primary key is the
/// subject id issued by the external identity provider.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    // S3 key of the uploaded avatar, if any.
    pub avatar_key: Option<String>,
    #[sqlx(try_from = "String")]
    pub role: Role,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Category
///
/// A study area grouping forums, e.g. "Ethics" or "Fixed Income".
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    // URL-safe, unique identifier derived from the name.
    pub slug: String,
    pub description: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Forum
///
/// A discussion board inside a category. `created_by` owns it.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Forum {
    pub id: Uuid,
    pub category_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub created_by: Uuid,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Insert payload for a new profile, built by the registration handler.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: Role,
}

// --- Request Payloads (Input Schemas) ---

/// RegisterRequest
///
/// Input for `POST /api/register`. The password is forwarded to the identity
/// provider and never stored or logged here.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub display_name: String,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<(), &'static str> {
        validate_email(&self.email)?;
        if self.password.chars().count() < MIN_PASSWORD {
            return Err("password must be at least 8 characters");
        }
        validate_text(&self.display_name, &DISPLAY_NAME)
    }
}

/// LoginRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(&self) -> Result<(), &'static str> {
        validate_email(&self.email)?;
        if self.password.is_empty() {
            return Err("password is required");
        }
        Ok(())
    }
}

/// SessionResponse
///
/// Returned by `POST /api/auth/login`. The same token is also set as the
/// `session_token` cookie for page navigation.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SessionResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

/// UpdateProfileRequest
///
/// Partial update for `PATCH /api/user`. Missing fields are left untouched.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateProfileRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    // Must be a key previously handed out by `POST /api/user/avatar`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_key: Option<String>,
}

impl UpdateProfileRequest {
    pub fn validate(&self, user_id: Uuid) -> Result<(), &'static str> {
        if let Some(name) = &self.display_name {
            validate_text(name, &DISPLAY_NAME)?;
        }
        if let Some(key) = &self.avatar_key
            && !key.starts_with(&avatar_prefix(user_id))
        {
            return Err("avatar_key does not belong to this user");
        }
        Ok(())
    }
}

/// UpdateRoleRequest
///
/// Input for `PATCH /api/admin/users/{id}/role`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UpdateRoleRequest {
    pub role: Role,
}

/// AvatarUploadRequest
///
/// Input for requesting a short-lived avatar upload URL.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, TS, Default)]
#[ts(export)]
pub struct AvatarUploadRequest {
    /// The original filename, used to derive the file extension.
    #[schema(example = "me.png")]
    pub filename: String,
    /// The MIME type the upload is constrained to. Must be an image type.
    #[schema(example = "image/png")]
    pub file_type: String,
}

impl AvatarUploadRequest {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.filename.trim().is_empty() {
            return Err("filename is required");
        }
        if !self.file_type.starts_with("image/") {
            return Err("file_type must be an image type");
        }
        Ok(())
    }
}

/// PresignedUrlResponse
///
/// Secure, temporary URL for a direct client-to-storage upload.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS, Default)]
#[ts(export)]
pub struct PresignedUrlResponse {
    /// The time-limited URL for the PUT request.
    pub upload_url: String,
    /// The object key to send back as `avatar_key` once the upload succeeded.
    pub resource_key: String,
}

/// CategoryRequest
///
/// Create or replace payload for categories. The slug is derived from `name`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CategoryRequest {
    pub name: String,
    pub description: Option<String>,
}

impl CategoryRequest {
    pub fn validate(&self) -> Result<(), &'static str> {
        validate_text(&self.name, &CATEGORY_NAME)?;
        if slugify(&self.name).is_empty() {
            return Err("name must contain letters or digits");
        }
        validate_description(self.description.as_deref())
    }
}

/// CreateForumRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateForumRequest {
    pub category_id: Uuid,
    pub title: String,
    pub description: Option<String>,
}

impl CreateForumRequest {
    pub fn validate(&self) -> Result<(), &'static str> {
        validate_text(&self.title, &FORUM_TITLE)?;
        validate_description(self.description.as_deref())
    }
}

/// UpdateForumRequest
///
/// Partial update for `PUT /api/forums/{id}`; uses `COALESCE` in the repository.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateForumRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Uuid>,
}

impl UpdateForumRequest {
    pub fn validate(&self) -> Result<(), &'static str> {
        if let Some(title) = &self.title {
            validate_text(title, &FORUM_TITLE)?;
        }
        validate_description(self.description.as_deref())
    }
}

// --- Dashboard & Health Schemas (Output) ---

/// AdminDashboardStats
///
/// Output for `GET /api/admin/stats`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct AdminDashboardStats {
    pub total_users: i64,
    /// Users holding ADMIN or SUPER_ADMIN.
    pub total_admins: i64,
    pub total_categories: i64,
    pub total_forums: i64,
}

/// HealthResponse
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
}

// --- Helpers ---

/// The storage prefix all avatars of one user live under.
pub fn avatar_prefix(user_id: Uuid) -> String {
    format!("avatars/{user_id}/")
}

/// slugify
///
/// Lowercases ASCII letters and digits and joins every other run of characters
/// into a single `-`. `"Fixed Income & Derivatives"` becomes
/// `"fixed-income-derivatives"`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

fn validate_email(email: &str) -> Result<(), &'static str> {
    let email = email.trim();
    if email.is_empty() || email.len() > 254 || email.chars().any(char::is_whitespace) {
        return Err("email is invalid");
    }
    match email.split_once('@') {
        Some((local, domain))
            if !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.') =>
        {
            Ok(())
        }
        _ => Err("email is invalid"),
    }
}

fn validate_text(value: &str, rule: &TextRule) -> Result<(), &'static str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(rule.missing);
    }
    if trimmed.chars().count() > rule.max {
        return Err(rule.too_long);
    }
    Ok(())
}

fn validate_description(description: Option<&str>) -> Result<(), &'static str> {
    match description {
        Some(d) if d.chars().count() > MAX_DESCRIPTION => Err("description must be <= 2000 chars"),
        _ => Ok(()),
    }
}
