#![allow(dead_code)]

use async_trait::async_trait;
use cfa_prep::{
    AppState,
    auth::{AuthUser, issue_token},
    config::{AppConfig, Env},
    identity::MockIdentityProvider,
    models::{
        AdminDashboardStats, Category, CreateForumRequest, Forum, NewUser, Role,
        UpdateForumRequest, UpdateProfileRequest, User,
    },
    repository::{ForumFilter, RepoError, Repository},
    storage::MockStorageService,
};
use chrono::Utc;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "test-secret-value-1234567890";

// --- In-memory Repository ---

/// Fake persistence layer with the same ownership and uniqueness rules as the
/// Postgres implementation.
#[derive(Default)]
pub struct InMemoryRepo {
    pub users: Mutex<Vec<User>>,
    pub categories: Mutex<Vec<Category>>,
    pub forums: Mutex<Vec<Forum>>,
    pub fail_ping: bool,
}

impl InMemoryRepo {
    pub fn with_users(users: Vec<User>) -> Self {
        Self {
            users: Mutex::new(users),
            ..Self::default()
        }
    }

    pub fn add_category(&self, name: &str) -> Category {
        let category = Category {
            id: Uuid::new_v4(),
            name: name.to_string(),
            slug: cfa_prep::models::slugify(name),
            description: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.categories.lock().unwrap().push(category.clone());
        category
    }

    pub fn add_forum(&self, category_id: Uuid, owner: Uuid, title: &str) -> Forum {
        let forum = Forum {
            id: Uuid::new_v4(),
            category_id,
            title: title.to_string(),
            description: None,
            created_by: owner,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.forums.lock().unwrap().push(forum.clone());
        forum
    }
}

#[async_trait]
impl Repository for InMemoryRepo {
    async fn ping(&self) -> Result<(), RepoError> {
        if self.fail_ping {
            Err(RepoError::Db(sqlx::Error::PoolTimedOut))
        } else {
            Ok(())
        }
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        Ok(self.users.lock().unwrap().iter().find(|u| u.id == id).cloned())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, RepoError> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.id == user.id || u.email == user.email) {
            return Err(RepoError::Conflict);
        }
        let created = User {
            id: user.id,
            email: user.email,
            display_name: user.display_name,
            avatar_key: None,
            role: user.role,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        users.push(created.clone());
        Ok(created)
    }

    async fn list_users(&self) -> Result<Vec<User>, RepoError> {
        Ok(self.users.lock().unwrap().clone())
    }

    async fn update_profile(
        &self,
        id: Uuid,
        req: UpdateProfileRequest,
    ) -> Result<Option<User>, RepoError> {
        let mut users = self.users.lock().unwrap();
        Ok(users.iter_mut().find(|u| u.id == id).map(|u| {
            if let Some(name) = req.display_name {
                u.display_name = name.trim().to_string();
            }
            if let Some(key) = req.avatar_key {
                u.avatar_key = Some(key);
            }
            u.clone()
        }))
    }

    async fn set_user_role(&self, id: Uuid, role: Role) -> Result<Option<User>, RepoError> {
        let mut users = self.users.lock().unwrap();
        Ok(users.iter_mut().find(|u| u.id == id).map(|u| {
            u.role = role;
            u.clone()
        }))
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, RepoError> {
        let mut users = self.users.lock().unwrap();
        let before = users.len();
        users.retain(|u| u.id != id);
        Ok(users.len() < before)
    }

    async fn get_stats(&self) -> Result<AdminDashboardStats, RepoError> {
        let users = self.users.lock().unwrap();
        Ok(AdminDashboardStats {
            total_users: users.len() as i64,
            total_admins: users.iter().filter(|u| u.role.is_admin_like()).count() as i64,
            total_categories: self.categories.lock().unwrap().len() as i64,
            total_forums: self.forums.lock().unwrap().len() as i64,
        })
    }

    async fn list_categories(&self) -> Result<Vec<Category>, RepoError> {
        Ok(self.categories.lock().unwrap().clone())
    }

    async fn get_category(&self, id: Uuid) -> Result<Option<Category>, RepoError> {
        Ok(self
            .categories
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == id)
            .cloned())
    }

    async fn create_category(
        &self,
        name: &str,
        slug: &str,
        description: Option<&str>,
    ) -> Result<Category, RepoError> {
        let mut categories = self.categories.lock().unwrap();
        if categories.iter().any(|c| c.slug == slug) {
            return Err(RepoError::Conflict);
        }
        let category = Category {
            id: Uuid::new_v4(),
            name: name.trim().to_string(),
            slug: slug.to_string(),
            description: description.map(str::to_string),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        categories.push(category.clone());
        Ok(category)
    }

    async fn update_category(
        &self,
        id: Uuid,
        name: &str,
        slug: &str,
        description: Option<&str>,
    ) -> Result<Option<Category>, RepoError> {
        let mut categories = self.categories.lock().unwrap();
        if categories.iter().any(|c| c.slug == slug && c.id != id) {
            return Err(RepoError::Conflict);
        }
        Ok(categories.iter_mut().find(|c| c.id == id).map(|c| {
            c.name = name.trim().to_string();
            c.slug = slug.to_string();
            c.description = description.map(str::to_string);
            c.clone()
        }))
    }

    async fn delete_category(&self, id: Uuid) -> Result<bool, RepoError> {
        let mut categories = self.categories.lock().unwrap();
        let before = categories.len();
        categories.retain(|c| c.id != id);
        self.forums.lock().unwrap().retain(|f| f.category_id != id);
        Ok(categories.len() < before)
    }

    async fn list_forums(&self, filter: ForumFilter) -> Result<Vec<Forum>, RepoError> {
        let search = filter.search.map(|s| s.to_lowercase());
        Ok(self
            .forums
            .lock()
            .unwrap()
            .iter()
            .filter(|f| filter.category_id.is_none_or(|id| f.category_id == id))
            .filter(|f| {
                search
                    .as_deref()
                    .is_none_or(|s| f.title.to_lowercase().contains(s))
            })
            .cloned()
            .collect())
    }

    async fn get_forum(&self, id: Uuid) -> Result<Option<Forum>, RepoError> {
        Ok(self.forums.lock().unwrap().iter().find(|f| f.id == id).cloned())
    }

    async fn create_forum(
        &self,
        req: CreateForumRequest,
        created_by: Uuid,
    ) -> Result<Forum, RepoError> {
        let forum = Forum {
            id: Uuid::new_v4(),
            category_id: req.category_id,
            title: req.title.trim().to_string(),
            description: req.description,
            created_by,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.forums.lock().unwrap().push(forum.clone());
        Ok(forum)
    }

    async fn update_forum(
        &self,
        id: Uuid,
        owner: Option<Uuid>,
        req: UpdateForumRequest,
    ) -> Result<Option<Forum>, RepoError> {
        let mut forums = self.forums.lock().unwrap();
        Ok(forums
            .iter_mut()
            .find(|f| f.id == id && owner.is_none_or(|o| f.created_by == o))
            .map(|f| {
                if let Some(title) = req.title {
                    f.title = title.trim().to_string();
                }
                if let Some(description) = req.description {
                    f.description = Some(description);
                }
                if let Some(category_id) = req.category_id {
                    f.category_id = category_id;
                }
                f.clone()
            }))
    }

    async fn delete_forum(&self, id: Uuid, owner: Option<Uuid>) -> Result<bool, RepoError> {
        let mut forums = self.forums.lock().unwrap();
        let before = forums.len();
        forums.retain(|f| !(f.id == id && owner.is_none_or(|o| f.created_by == o)));
        Ok(forums.len() < before)
    }
}

// --- Helper Functions ---

pub fn user(role: Role) -> User {
    let id = Uuid::new_v4();
    User {
        id,
        email: format!("{}@example.com", id.simple()),
        display_name: "Candidate".to_string(),
        avatar_key: None,
        role,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn auth_user(user: &User) -> AuthUser {
    AuthUser {
        id: user.id,
        email: user.email.clone(),
        role: user.role,
    }
}

pub fn token_for(user_id: Uuid, role: Role) -> String {
    issue_token(user_id, role, TEST_JWT_SECRET, 3600).unwrap()
}

pub fn test_config(env: Env) -> AppConfig {
    AppConfig {
        env,
        jwt_secret: TEST_JWT_SECRET.to_string(),
        ..AppConfig::default()
    }
}

pub fn app_state(env: Env, repo: Arc<InMemoryRepo>, identity: MockIdentityProvider) -> AppState {
    AppState {
        repo,
        storage: Arc::new(MockStorageService::new()),
        identity: Arc::new(identity),
        config: test_config(env),
    }
}
