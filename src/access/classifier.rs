/// AccessClass
///
/// Coarse category assigned to a route prefix. It governs what kind of caller
/// identity is required before the request may reach a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessClass {
    /// Pages anyone may visit (landing, login, docs).
    Public,
    /// API endpoints reachable without a session (health, registration, login).
    PublicApi,
    /// Requires a present identity claim.
    Protected,
    /// Requires a present claim with an admin-like role.
    Admin,
}

impl AccessClass {
    /// Evaluation priority. Higher wins when several rules match the same path.
    fn priority(self) -> u8 {
        match self {
            AccessClass::Admin => 3,
            AccessClass::Protected => 2,
            AccessClass::Public | AccessClass::PublicApi => 1,
        }
    }
}

/// RouteRule
///
/// One tagged entry of the route table: a path prefix and the class it maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteRule {
    pub prefix: &'static str,
    pub class: AccessClass,
}

const fn rule(prefix: &'static str, class: AccessClass) -> RouteRule {
    RouteRule { prefix, class }
}

/// ROUTE_TABLE
///
/// The canonical access policy, listed in evaluation order: admin prefixes,
/// then protected prefixes, then public pages and public API endpoints.
///
/// Static assets (bundle chunks, icons, manifest, robots.txt, ...) never reach
/// the classifier and therefore have no entries here.
pub static ROUTE_TABLE: &[RouteRule] = &[
    // --- Admin ---
    rule("/dashboard/admin", AccessClass::Admin),
    rule("/admin", AccessClass::Admin),
    rule("/api/admin", AccessClass::Admin),
    // --- Protected ---
    rule("/dashboard", AccessClass::Protected),
    rule("/profile", AccessClass::Protected),
    rule("/forums", AccessClass::Protected),
    rule("/api/user", AccessClass::Protected),
    rule("/api/forums", AccessClass::Protected),
    rule("/api/categories", AccessClass::Protected),
    // --- Public pages ---
    rule("/", AccessClass::Public),
    rule("/login", AccessClass::Public),
    rule("/register", AccessClass::Public),
    rule("/forgot-password", AccessClass::Public),
    rule("/reset-password", AccessClass::Public),
    rule("/about", AccessClass::Public),
    rule("/swagger-ui", AccessClass::Public),
    rule("/api-docs", AccessClass::Public),
    // --- Public API ---
    rule("/api/auth", AccessClass::PublicApi),
    rule("/api/register", AccessClass::PublicApi),
    rule("/api/health", AccessClass::PublicApi),
];

/// classify
///
/// Maps a request path onto its access class using [`ROUTE_TABLE`].
/// Unknown paths are `Protected`: the policy fails closed.
pub fn classify(path: &str) -> AccessClass {
    classify_with(ROUTE_TABLE, path)
}

/// classify_with
///
/// Same as [`classify`] over an arbitrary table. Among all matching rules the one
/// with the highest class priority wins, ties broken by the longest prefix, so the
/// result never depends on how the table happens to be ordered.
pub fn classify_with(table: &[RouteRule], path: &str) -> AccessClass {
    let path = normalize_path(path);

    table
        .iter()
        .filter(|rule| matches_prefix(path, rule.prefix))
        .max_by_key(|rule| (rule.class.priority(), rule.prefix.len()))
        .map_or(AccessClass::Protected, |rule| rule.class)
}

/// normalize_path
///
/// Strips the query string, any fragment, and trailing slashes. The root path
/// (and the empty string) normalize to `/`.
pub fn normalize_path(raw: &str) -> &str {
    let end = raw.find(['?', '#']).unwrap_or(raw.len());
    let trimmed = raw[..end].trim_end_matches('/');
    if trimmed.is_empty() { "/" } else { trimmed }
}

/// A path matches a prefix when it equals it or continues with a `/` segment.
/// `/dashboardx` therefore does not match `/dashboard`.
pub fn matches_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || (prefix != "/" && rest.starts_with('/')),
        None => false,
    }
}

/// is_api_path
///
/// API routes answer denials with JSON status codes instead of redirects.
pub fn is_api_path(path: &str) -> bool {
    matches_prefix(normalize_path(path), "/api")
}
