use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

/// Role
///
/// The RBAC role carried by every profile and by every session token.
/// Serialized as `USER`, `ADMIN` and `SUPER_ADMIN` on the wire and in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum Role {
    #[default]
    User,
    Admin,
    SuperAdmin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
            Role::SuperAdmin => "SUPER_ADMIN",
        }
    }

    /// Admin-like roles pass the admin route gate.
    pub fn is_admin_like(self) -> bool {
        matches!(self, Role::Admin | Role::SuperAdmin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USER" => Ok(Role::User),
            "ADMIN" => Ok(Role::Admin),
            "SUPER_ADMIN" => Ok(Role::SuperAdmin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

// Lets `sqlx::FromRow` decode the TEXT `role` column.
impl TryFrom<String> for Role {
    type Error = UnknownRole;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// IdentityClaim
///
/// Read-only assertion of who is calling, resolved from an already verified
/// session token before the access decision runs. Anything that could not be
/// verified is `Absent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdentityClaim {
    #[default]
    Absent,
    Present { user_id: Uuid, role: Role },
}

impl IdentityClaim {
    pub fn is_present(&self) -> bool {
        matches!(self, IdentityClaim::Present { .. })
    }

    pub fn role(&self) -> Option<Role> {
        match self {
            IdentityClaim::Present { role, .. } => Some(*role),
            IdentityClaim::Absent => None,
        }
    }

    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            IdentityClaim::Present { user_id, .. } => Some(*user_id),
            IdentityClaim::Absent => None,
        }
    }
}
