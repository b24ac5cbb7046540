use thiserror::Error;

use oilstock_core::UserId;

use crate::permissions::permissions_for;
use crate::{Permission, Role};

/// A signed-in user with the role the backend reported (if any).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub role: Option<Role>,
}

impl Principal {
    pub fn new(user_id: UserId, role: Option<Role>) -> Self {
        Self { user_id, role }
    }

    pub fn permissions(&self) -> Vec<Permission> {
        self.role.map(permissions_for).unwrap_or_default()
    }

    pub fn can_operate(&self) -> bool {
        authorize(self, &Permission::MOVEMENTS_RECORD).is_ok()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("no role assigned")]
    NoRole,

    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),
}

/// Check that the principal's role grants `required`. Pure, no IO.
pub fn authorize(principal: &Principal, required: &Permission) -> Result<(), AuthzError> {
    if principal.role.is_none() {
        return Err(AuthzError::NoRole);
    }

    let granted = principal
        .permissions()
        .iter()
        .any(|p| p.is_wildcard() || p == required);

    if granted {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}
