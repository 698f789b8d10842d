use crate::models::{
    AdminDashboardStats, Category, CreateForumRequest, Forum, NewUser, Role, UpdateForumRequest,
    UpdateProfileRequest, User,
};
use async_trait::async_trait;
use serde::Deserialize;
use sqlx::{PgPool, query_builder::QueryBuilder};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

const USER_COLUMNS: &str = "id, email, display_name, avatar_key, role, created_at, updated_at";
const CATEGORY_COLUMNS: &str = "id, name, slug, description, created_at, updated_at";
const FORUM_COLUMNS: &str =
    "id, category_id, title, description, created_by, created_at, updated_at";

/// RepoError
///
/// What the persistence layer reports upwards. Unique and foreign-key violations
/// get their own variants so handlers can answer 409/404 instead of 500.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("unique constraint violated")]
    Conflict,
    #[error("referenced row does not exist")]
    MissingReference,
    #[error("database error: {0}")]
    Db(sqlx::Error),
}

impl From<sqlx::Error> for RepoError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            match db.code().as_deref() {
                Some("23505") => return RepoError::Conflict,
                Some("23503") => return RepoError::MissingReference,
                _ => {}
            }
        }
        RepoError::Db(e)
    }
}

/// ForumFilter
///
/// Query parameters accepted by `GET /api/forums`.
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
pub struct ForumFilter {
    /// Only forums in this category.
    pub category_id: Option<Uuid>,
    /// Case-insensitive match on title or description.
    pub search: Option<String>,
}

/// `%search%` for an `ILIKE ... ESCAPE '\'` clause. The user's own `%`, `_` and
/// `\` match literally.
pub fn contains_pattern(search: &str) -> String {
    let mut pattern = String::with_capacity(search.len() + 2);
    pattern.push('%');
    for c in search.trim().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Repository Trait
///
/// Abstract contract for all persistence operations, so handlers never know
/// whether they talk to Postgres or to a test double.
///
/// Ownership-scoped methods take `owner: Option<Uuid>`: `Some(id)` restricts the
/// statement to rows created by `id`, `None` is the admin override.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Cheap round-trip used by the health check.
    async fn ping(&self) -> Result<(), RepoError>;

    // --- Users ---
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, RepoError>;
    async fn create_user(&self, user: NewUser) -> Result<User, RepoError>;
    async fn list_users(&self) -> Result<Vec<User>, RepoError>;
    async fn update_profile(
        &self,
        id: Uuid,
        req: UpdateProfileRequest,
    ) -> Result<Option<User>, RepoError>;
    async fn set_user_role(&self, id: Uuid, role: Role) -> Result<Option<User>, RepoError>;
    async fn delete_user(&self, id: Uuid) -> Result<bool, RepoError>;
    async fn get_stats(&self) -> Result<AdminDashboardStats, RepoError>;

    // --- Categories ---
    async fn list_categories(&self) -> Result<Vec<Category>, RepoError>;
    async fn get_category(&self, id: Uuid) -> Result<Option<Category>, RepoError>;
    async fn create_category(
        &self,
        name: &str,
        slug: &str,
        description: Option<&str>,
    ) -> Result<Category, RepoError>;
    async fn update_category(
        &self,
        id: Uuid,
        name: &str,
        slug: &str,
        description: Option<&str>,
    ) -> Result<Option<Category>, RepoError>;
    async fn delete_category(&self, id: Uuid) -> Result<bool, RepoError>;

    // --- Forums ---
    async fn list_forums(&self, filter: ForumFilter) -> Result<Vec<Forum>, RepoError>;
    async fn get_forum(&self, id: Uuid) -> Result<Option<Forum>, RepoError>;
    async fn create_forum(
        &self,
        req: CreateForumRequest,
        created_by: Uuid,
    ) -> Result<Forum, RepoError>;
    async fn update_forum(
        &self,
        id: Uuid,
        owner: Option<Uuid>,
        req: UpdateForumRequest,
    ) -> Result<Option<Forum>, RepoError>;
    async fn delete_forum(&self, id: Uuid, owner: Option<Uuid>) -> Result<bool, RepoError>;
}

/// RepositoryState
///
/// The shared handle to the persistence layer stored in the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The `Repository` implementation backed by PostgreSQL.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn ping(&self) -> Result<(), RepoError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM profiles WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// create_user
    ///
    /// Mirrors an identity-provider account into `profiles`. A duplicate id or
    /// email surfaces as `RepoError::Conflict`.
    async fn create_user(&self, user: NewUser) -> Result<User, RepoError> {
        let created = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO profiles (id, email, display_name, role) \
             VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
        ))
        .bind(user.id)
        .bind(user.email)
        .bind(user.display_name)
        .bind(user.role.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn list_users(&self) -> Result<Vec<User>, RepoError> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM profiles ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    /// update_profile
    ///
    /// Partial update through `COALESCE`: a `None` field keeps the stored value.
    async fn update_profile(
        &self,
        id: Uuid,
        req: UpdateProfileRequest,
    ) -> Result<Option<User>, RepoError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE profiles \
             SET display_name = COALESCE($2, display_name), \
                 avatar_key = COALESCE($3, avatar_key), \
                 updated_at = NOW() \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(req.display_name.map(|name| name.trim().to_string()))
        .bind(req.avatar_key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn set_user_role(&self, id: Uuid, role: Role) -> Result<Option<User>, RepoError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE profiles SET role = $2, updated_at = NOW() WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(role.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM profiles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// get_stats
    ///
    /// All dashboard counters in a single round-trip.
    async fn get_stats(&self) -> Result<AdminDashboardStats, RepoError> {
        let stats = sqlx::query_as::<_, AdminDashboardStats>(
            "SELECT \
                (SELECT COUNT(*) FROM profiles) AS total_users, \
                (SELECT COUNT(*) FROM profiles WHERE role IN ('ADMIN', 'SUPER_ADMIN')) AS total_admins, \
                (SELECT COUNT(*) FROM categories) AS total_categories, \
                (SELECT COUNT(*) FROM forums) AS total_forums",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(stats)
    }

    async fn list_categories(&self) -> Result<Vec<Category>, RepoError> {
        let categories = sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY name ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    async fn get_category(&self, id: Uuid) -> Result<Option<Category>, RepoError> {
        let category = sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(category)
    }

    async fn create_category(
        &self,
        name: &str,
        slug: &str,
        description: Option<&str>,
    ) -> Result<Category, RepoError> {
        let category = sqlx::query_as::<_, Category>(&format!(
            "INSERT INTO categories (id, name, slug, description) \
             VALUES ($1, $2, $3, $4) RETURNING {CATEGORY_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(name.trim())
        .bind(slug)
        .bind(description)
        .fetch_one(&self.pool)
        .await?;
        Ok(category)
    }

    async fn update_category(
        &self,
        id: Uuid,
        name: &str,
        slug: &str,
        description: Option<&str>,
    ) -> Result<Option<Category>, RepoError> {
        let category = sqlx::query_as::<_, Category>(&format!(
            "UPDATE categories \
             SET name = $2, slug = $3, description = $4, updated_at = NOW() \
             WHERE id = $1 RETURNING {CATEGORY_COLUMNS}"
        ))
        .bind(id)
        .bind(name.trim())
        .bind(slug)
        .bind(description)
        .fetch_optional(&self.pool)
        .await?;
        Ok(category)
    }

    /// delete_category
    ///
    /// Forums of the category go with it (`ON DELETE CASCADE`).
    async fn delete_category(&self, id: Uuid) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// list_forums
    ///
    /// Builds the filter with `QueryBuilder` so every user value is bound, never
    /// interpolated.
    async fn list_forums(&self, filter: ForumFilter) -> Result<Vec<Forum>, RepoError> {
        let mut builder: QueryBuilder<sqlx::Postgres> =
            QueryBuilder::new(format!("SELECT {FORUM_COLUMNS} FROM forums WHERE TRUE"));

        if let Some(category_id) = filter.category_id {
            builder.push(" AND category_id = ");
            builder.push_bind(category_id);
        }

        if let Some(search) = filter.search.filter(|s| !s.trim().is_empty()) {
            let pattern = contains_pattern(&search);
            builder.push(" AND (title ILIKE ");
            builder.push_bind(pattern.clone());
            builder.push(r" ESCAPE '\' OR description ILIKE ");
            builder.push_bind(pattern);
            builder.push(r" ESCAPE '\')");
        }

        builder.push(" ORDER BY created_at DESC");

        let forums = builder
            .build_query_as::<Forum>()
            .fetch_all(&self.pool)
            .await?;
        Ok(forums)
    }

    async fn get_forum(&self, id: Uuid) -> Result<Option<Forum>, RepoError> {
        let forum = sqlx::query_as::<_, Forum>(&format!(
            "SELECT {FORUM_COLUMNS} FROM forums WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(forum)
    }

    async fn create_forum(
        &self,
        req: CreateForumRequest,
        created_by: Uuid,
    ) -> Result<Forum, RepoError> {
        let forum = sqlx::query_as::<_, Forum>(&format!(
            "INSERT INTO forums (id, category_id, title, description, created_by) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {FORUM_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(req.category_id)
        .bind(req.title.trim())
        .bind(req.description)
        .bind(created_by)
        .fetch_one(&self.pool)
        .await?;
        Ok(forum)
    }

    /// update_forum
    ///
    /// `$2 IS NULL` disables the ownership filter for admins.
    async fn update_forum(
        &self,
        id: Uuid,
        owner: Option<Uuid>,
        req: UpdateForumRequest,
    ) -> Result<Option<Forum>, RepoError> {
        let forum = sqlx::query_as::<_, Forum>(&format!(
            "UPDATE forums \
             SET title = COALESCE($3, title), \
                 description = COALESCE($4, description), \
                 category_id = COALESCE($5, category_id), \
                 updated_at = NOW() \
             WHERE id = $1 AND ($2::uuid IS NULL OR created_by = $2) \
             RETURNING {FORUM_COLUMNS}"
        ))
        .bind(id)
        .bind(owner)
        .bind(req.title.map(|title| title.trim().to_string()))
        .bind(req.description)
        .bind(req.category_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(forum)
    }

    async fn delete_forum(&self, id: Uuid, owner: Option<Uuid>) -> Result<bool, RepoError> {
        let result = sqlx::query(
            "DELETE FROM forums WHERE id = $1 AND ($2::uuid IS NULL OR created_by = $2)",
        )
        .bind(id)
        .bind(owner)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
