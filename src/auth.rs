use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, header, request::Parts},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::{
    access::{IdentityClaim, Role},
    config::{AppConfig, Env},
    error::ApiError,
    repository::RepositoryState,
};

/// Cookie carrying the session token on page navigations.
pub const SESSION_COOKIE: &str = "session_token";

/// Development-only header naming the acting user (local env only).
pub const DEV_USER_HEADER: &str = "x-user-id";

/// Claims
///
/// Payload of a session token. Signed with the shared HS256 secret at login and
/// validated on every request.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the profile id (the identity provider's user id).
    pub sub: Uuid,
    /// The role at the time of login. Route-level gating uses it; handlers
    /// re-read the stored role.
    pub role: Role,
    /// Expiration time, seconds since the epoch. Always validated.
    pub exp: usize,
    /// Issued at.
    pub iat: usize,
}

/// issue_token
///
/// Signs a session token for `user_id` valid for `ttl_secs`.
pub fn issue_token(
    user_id: Uuid,
    role: Role,
    secret: &str,
    ttl_secs: u64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();

    let claims = Claims {
        sub: user_id,
        role,
        iat: now as usize,
        exp: now.saturating_add(ttl_secs) as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// verify_token
///
/// Checks signature and expiry. A token whose `role` is not one of the known
/// roles fails to deserialize and is rejected like any malformed token.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::default();
    validation.validate_exp = true;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
}

/// session_token
///
/// The bearer token if an `Authorization: Bearer` header is present, otherwise
/// the `session_token` cookie.
pub fn session_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .or_else(|| cookie_value(headers, SESSION_COOKIE))
        .filter(|token| !token.is_empty())
}

fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

/// resolve_claim
///
/// Turns request headers into an `IdentityClaim`. Never errors: every failure
/// (missing header, bad signature, expired token, unknown role, lookup error)
/// yields `IdentityClaim::Absent`, so callers can only fail closed.
///
/// In `Env::Local` a `x-user-id` header naming an existing profile is accepted
/// first, with the stored role. Production ignores that header.
pub async fn resolve_claim(
    headers: &HeaderMap,
    config: &AppConfig,
    repo: &RepositoryState,
) -> IdentityClaim {
    if config.env == Env::Local
        && let Some(claim) = dev_bypass_claim(headers, repo).await
    {
        return claim;
    }

    let Some(token) = session_token(headers) else {
        return IdentityClaim::Absent;
    };

    match verify_token(token, &config.jwt_secret) {
        Ok(claims) => IdentityClaim::Present {
            user_id: claims.sub,
            role: claims.role,
        },
        Err(e) => {
            tracing::debug!(error = %e, "session token rejected");
            IdentityClaim::Absent
        }
    }
}

async fn dev_bypass_claim(headers: &HeaderMap, repo: &RepositoryState) -> Option<IdentityClaim> {
    let user_id = headers
        .get(DEV_USER_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| Uuid::parse_str(value).ok())?;

    match repo.get_user(user_id).await {
        Ok(Some(user)) => Some(IdentityClaim::Present {
            user_id: user.id,
            role: user.role,
        }),
        Ok(None) => None,
        Err(e) => {
            tracing::warn!(error = %e, "dev bypass lookup failed");
            None
        }
    }
}

/// AuthUser
///
/// The resolved identity of an authenticated request, with the role as currently
/// stored in `profiles`. Handlers use it for ownership and role checks.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

impl AuthUser {
    /// ADMIN or SUPER_ADMIN, else 403.
    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.role.is_admin_like() {
            Ok(())
        } else {
            Err(ApiError::AdminRequired)
        }
    }

    /// SUPER_ADMIN only, else 403.
    pub fn require_super_admin(&self) -> Result<(), ApiError> {
        if self.role == Role::SuperAdmin {
            Ok(())
        } else {
            Err(ApiError::SuperAdminRequired)
        }
    }
}

/// AuthUser Extractor Implementation
///
/// 1. Reuses the claim the access middleware attached to the request, or
///    resolves it here when the middleware did not run.
/// 2. Re-loads the profile so a deleted user or a changed role takes effect
///    immediately, whatever the token says.
///
/// Rejection: `ApiError::Unauthorized` (401) when there is no claim or no profile.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);

        let claim = match parts.extensions.get::<IdentityClaim>() {
            Some(claim) => *claim,
            None => {
                let config = AppConfig::from_ref(state);
                resolve_claim(&parts.headers, &config, &repo).await
            }
        };

        let user_id = claim.user_id().ok_or(ApiError::Unauthorized)?;

        let user = repo
            .get_user(user_id)
            .await?
            // A valid token for a profile that no longer exists.
            .ok_or(ApiError::Unauthorized)?;

        Ok(AuthUser {
            id: user.id,
            email: user.email,
            role: user.role,
        })
    }
}
