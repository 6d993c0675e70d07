use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Claims;
use crate::error::ApiError;

/// Role ladder. Ordering matters: a role satisfies any requirement at or
/// below its own level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Viewer,
    Accountant,
    Manager,
    Admin,
}

impl Role {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "viewer" => Some(Self::Viewer),
            "accountant" => Some(Self::Accountant),
            "manager" => Some(Self::Manager),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Viewer => "viewer",
            Self::Accountant => "accountant",
            Self::Manager => "manager",
            Self::Admin => "admin",
        }
    }
}

/// Authenticated user context extracted from a verified JWT
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// User ID (from JWT sub claim)
    pub user_id: Uuid,

    /// User role
    pub role: Role,
}

impl AuthContext {
    pub fn from_claims(claims: &Claims) -> Result<Self, &'static str> {
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| "Invalid user ID in token")?;
        let role = Role::from_str(&claims.role).ok_or("Unknown role in token")?;

        Ok(Self { user_id, role })
    }

    /// Returns 403 unless the caller's role is at least `required`.
    pub fn require(&self, required: Role) -> Result<(), ApiError> {
        if self.role >= required {
            Ok(())
        } else {
            Err(ApiError::Forbidden(format!(
                "requires {} role",
                required.as_str()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(role: Role) -> AuthContext {
        AuthContext {
            user_id: Uuid::new_v4(),
            role,
        }
    }

    #[test]
    fn ladder_ordering() {
        assert!(Role::Admin > Role::Manager);
        assert!(Role::Manager > Role::Accountant);
        assert!(Role::Accountant > Role::Viewer);
    }

    #[test]
    fn higher_role_satisfies_lower_requirement() {
        assert!(ctx(Role::Admin).require(Role::Accountant).is_ok());
        assert!(ctx(Role::Manager).require(Role::Manager).is_ok());
    }

    #[test]
    fn lower_role_is_forbidden() {
        let err = ctx(Role::Viewer).require(Role::Manager).unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[test]
    fn role_round_trip() {
        for role in [Role::Viewer, Role::Accountant, Role::Manager, Role::Admin] {
            assert_eq!(Role::from_str(role.as_str()), Some(role));
        }
        assert_eq!(Role::from_str("superuser"), None);
    }
}
