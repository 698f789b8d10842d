//! Router Module Index
//!
//! API routes are grouped by the access class the route table assigns to them.
//! The access middleware enforces that class before any of these handlers run;
//! handlers still re-check roles and ownership themselves.

/// `/api/health`, `/api/register` and `/api/auth/*`: reachable without a session.
pub mod public;

/// `/api/user`, `/api/categories` and `/api/forums`: any signed-in user.
pub mod authenticated;

/// `/api/admin/*`: ADMIN or SUPER_ADMIN.
pub mod admin;
