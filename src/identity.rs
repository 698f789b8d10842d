use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// ProviderError
///
/// `Rejected` means the provider answered and said no (bad credentials, email
/// taken, weak password). `Unavailable` means it could not be reached or answered
/// with something unreadable.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("identity provider rejected the request with status {0}")]
    Rejected(u16),
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

/// IdentityProvider
///
/// The external authentication framework. It owns credentials and password
/// hashing; this application only learns the subject id of the account.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Creates an account and returns its subject id.
    async fn sign_up(&self, email: &str, password: &str) -> Result<Uuid, ProviderError>;

    /// Checks a password and returns the subject id of the account.
    async fn sign_in(&self, email: &str, password: &str) -> Result<Uuid, ProviderError>;
}

/// IdentityState
///
/// The shared handle to the identity provider stored in the application state.
pub type IdentityState = Arc<dyn IdentityProvider>;

#[derive(Deserialize)]
struct ProviderUser {
    id: Uuid,
}

/// Signup answers with a bare user when email confirmation is pending and with a
/// session wrapping the user when accounts are auto-confirmed.
#[derive(Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session { user: ProviderUser },
    User(ProviderUser),
}

impl SignUpResponse {
    fn user_id(self) -> Uuid {
        match self {
            SignUpResponse::Session { user } | SignUpResponse::User(user) => user.id,
        }
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    user: ProviderUser,
}

/// GoTrueClient
///
/// `IdentityProvider` over a GoTrue-compatible REST API
/// (`/auth/v1/signup`, `/auth/v1/token?grant_type=password`).
#[derive(Clone)]
pub struct GoTrueClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GoTrueClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    async fn post(
        &self,
        path: &str,
        email: &str,
        password: &str,
    ) -> Result<reqwest::Response, ProviderError> {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .header("apikey", &self.api_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(ProviderError::Unavailable(format!("status {status}")));
        }
        if !status.is_success() {
            return Err(ProviderError::Rejected(status.as_u16()));
        }
        Ok(response)
    }
}

#[async_trait]
impl IdentityProvider for GoTrueClient {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Uuid, ProviderError> {
        let body = self
            .post("/auth/v1/signup", email, password)
            .await?
            .json::<SignUpResponse>()
            .await
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;
        Ok(body.user_id())
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Uuid, ProviderError> {
        let body = self
            .post("/auth/v1/token?grant_type=password", email, password)
            .await?
            .json::<TokenResponse>()
            .await
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;
        Ok(body.user.id)
    }
}

/// MockIdentityProvider
///
/// Test double. `user_id: None` makes every call fail with `Rejected(400)`,
/// `unavailable` simulates an unreachable provider.
#[derive(Clone, Default)]
pub struct MockIdentityProvider {
    pub user_id: Option<Uuid>,
    pub unavailable: bool,
}

impl MockIdentityProvider {
    pub fn accepting(user_id: Uuid) -> Self {
        Self {
            user_id: Some(user_id),
            unavailable: false,
        }
    }

    pub fn rejecting() -> Self {
        Self::default()
    }

    pub fn unavailable() -> Self {
        Self {
            user_id: None,
            unavailable: true,
        }
    }

    fn answer(&self) -> Result<Uuid, ProviderError> {
        if self.unavailable {
            return Err(ProviderError::Unavailable("mock provider offline".to_string()));
        }
        self.user_id.ok_or(ProviderError::Rejected(400))
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn sign_up(&self, _email: &str, _password: &str) -> Result<Uuid, ProviderError> {
        self.answer()
    }

    async fn sign_in(&self, _email: &str, _password: &str) -> Result<Uuid, ProviderError> {
        self.answer()
    }
}
