use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::{
    classifier::{classify, is_api_path},
    decision::{Decision, decide},
};
use crate::{AppState, auth::resolve_claim};

/// Path prefixes of static assets that bypass the access layer entirely.
const EXCLUDED_PREFIXES: &[&str] = &[
    "/_next/static",
    "/_next/image",
    "/favicon.ico",
    "/icons",
    "/manifest.json",
    "/sw.js",
    "/robots.txt",
    "/sitemap.xml",
];

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "svg", "webp", "ico"];

/// is_static_asset
///
/// Upstream exclusion filter. Matching requests are never classified.
/// The image-extension rule only applies outside `/api`, so an API route can
/// never be made public by appending `.png` to it.
pub fn is_static_asset(path: &str) -> bool {
    if EXCLUDED_PREFIXES
        .iter()
        .any(|prefix| path == *prefix || path.starts_with(&format!("{prefix}/")))
    {
        return true;
    }

    if is_api_path(path) {
        return false;
    }

    path.rsplit('/')
        .next()
        .and_then(|segment| segment.rsplit_once('.'))
        .is_some_and(|(_, ext)| IMAGE_EXTENSIONS.iter().any(|e| ext.eq_ignore_ascii_case(e)))
}

/// access_middleware
///
/// Gate applied around the whole router, fallback included.
///
/// 1. Static assets pass through untouched.
/// 2. The identity claim is resolved from the request (never fails; unverifiable
///    tokens become `Absent`).
/// 3. The path is classified and the pure decision function runs.
/// 4. On `Allow` the claim is attached to the request extensions so the
///    `AuthUser` extractor can reuse it; otherwise a redirect or JSON denial is
///    returned and the handler never runs.
pub async fn access_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    if is_static_asset(&path) {
        return next.run(request).await;
    }

    let target = request
        .uri()
        .path_and_query()
        .map_or_else(|| path.clone(), |pq| pq.as_str().to_string());

    let claim = resolve_claim(request.headers(), &state.config, &state.repo).await;
    let class = classify(&path);

    match decide(class, &claim, &target) {
        Decision::Allow => {
            request.extensions_mut().insert(claim);
            next.run(request).await
        }
        Decision::Redirect(redirect) => {
            tracing::debug!(
                path = %path,
                ?class,
                location = %redirect.location(),
                "access redirected"
            );
            redirect.into_response()
        }
        Decision::Reject(denial) => {
            tracing::debug!(path = %path, ?class, ?denial, "access rejected");
            denial.into_response()
        }
    }
}
