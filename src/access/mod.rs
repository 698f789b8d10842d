//! Access Control Layer
//!
//! Every request passes through this layer before reaching a handler.
//! It is split into three pieces, leaves first:
//!
//! - `classifier`: static prefix table mapping a path to its access class.
//! - `decision`: pure function from (class, identity claim, path) to a decision.
//! - `middleware`: the axum layer that resolves the claim and applies the decision.
//!
//! Handlers still re-check row-level permissions (ownership, super-admin);
//! this layer only gates coarse route-level access.

pub mod claim;
pub mod classifier;
pub mod decision;
pub mod middleware;

pub use claim::{IdentityClaim, Role};
pub use classifier::{AccessClass, ROUTE_TABLE, RouteRule, classify};
pub use decision::{Decision, Denial, RedirectTarget, decide, same_origin_callback};
pub use middleware::access_middleware;
