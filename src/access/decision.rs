use axum::response::{IntoResponse, Redirect, Response};
use url::form_urlencoded;

use super::{
    claim::IdentityClaim,
    classifier::{AccessClass, is_api_path, matches_prefix, normalize_path},
};
use crate::error::ApiError;

pub const LOGIN_PATH: &str = "/login";
pub const DASHBOARD_PATH: &str = "/dashboard";

/// Pages that make no sense for a caller who already holds a session.
pub const AUTH_PAGES: &[&str] = &["/login", "/register", "/forgot-password"];

/// Decision
///
/// The outcome of the access gate for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Redirect(RedirectTarget),
    Reject(Denial),
}

/// Where a denied page request is sent instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectTarget {
    /// The login page, remembering the original path and query for after sign-in.
    Login { callback: String },
    Dashboard,
}

impl RedirectTarget {
    /// The `Location` header value, e.g. `/login?callbackUrl=%2Fdashboard%2Fprofile`.
    pub fn location(&self) -> String {
        match self {
            RedirectTarget::Login { callback } => {
                let encoded: String =
                    form_urlencoded::byte_serialize(callback.as_bytes()).collect();
                format!("{LOGIN_PATH}?callbackUrl={encoded}")
            }
            RedirectTarget::Dashboard => DASHBOARD_PATH.to_string(),
        }
    }
}

impl IntoResponse for RedirectTarget {
    fn into_response(self) -> Response {
        Redirect::temporary(&self.location()).into_response()
    }
}

/// The two terminal denials of the access layer, as returned to API callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    /// 401: no usable identity claim.
    Unauthenticated,
    /// 403: a claim is present but its role is not admin-like.
    Forbidden,
}

impl From<Denial> for ApiError {
    fn from(denial: Denial) -> Self {
        match denial {
            Denial::Unauthenticated => ApiError::Unauthorized,
            Denial::Forbidden => ApiError::AdminRequired,
        }
    }
}

impl IntoResponse for Denial {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}

/// decide
///
/// Pure access decision. `path_and_query` is the request target as received; the
/// query string only matters for the login callback.
///
/// Evaluation order:
/// 1. A present claim on an auth page (`/login`, `/register`, `/forgot-password`)
///    is sent to the dashboard.
/// 2. Public classes always pass.
/// 3. Protected and admin classes without a claim: 401 on API paths, otherwise
///    a login redirect carrying the callback. This runs before any role check.
/// 4. Admin class with a non admin-like role: 403 on API paths, otherwise a
///    dashboard redirect.
pub fn decide(class: AccessClass, claim: &IdentityClaim, path_and_query: &str) -> Decision {
    let path = normalize_path(path_and_query);

    if claim.is_present() && is_auth_page(path) {
        return Decision::Redirect(RedirectTarget::Dashboard);
    }

    match class {
        AccessClass::Public | AccessClass::PublicApi => Decision::Allow,
        AccessClass::Protected | AccessClass::Admin => {
            let api = is_api_path(path);

            let Some(role) = claim.role() else {
                return if api {
                    Decision::Reject(Denial::Unauthenticated)
                } else {
                    Decision::Redirect(RedirectTarget::Login {
                        callback: same_origin_callback(path_and_query),
                    })
                };
            };

            if class == AccessClass::Admin && !role.is_admin_like() {
                return if api {
                    Decision::Reject(Denial::Forbidden)
                } else {
                    Decision::Redirect(RedirectTarget::Dashboard)
                };
            }

            Decision::Allow
        }
    }
}

/// Collapses leading `/` and `\` runs to a single `/`, so the callback stays a
/// same-origin path. `//evil.example/x` would otherwise be protocol-relative.
pub fn same_origin_callback(path_and_query: &str) -> String {
    let rest = path_and_query.trim_start_matches(['/', '\\']);
    format!("/{rest}")
}

fn is_auth_page(path: &str) -> bool {
    AUTH_PAGES.iter().any(|page| matches_prefix(path, page))
}
