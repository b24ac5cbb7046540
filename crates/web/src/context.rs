use oilstock_auth::{AccessToken, AuthUser, Principal, Role};

/// Authenticated caller for the current request.
///
/// Inserted by the session middleware; absent for anonymous visitors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    user: AuthUser,
    role: Option<Role>,
    access_token: AccessToken,
}

impl SessionContext {
    pub fn new(user: AuthUser, role: Option<Role>, access_token: AccessToken) -> Self {
        Self {
            user,
            role,
            access_token,
        }
    }

    pub fn user(&self) -> &AuthUser {
        &self.user
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    /// Token forwarded on every backend call so row-level security sees the user.
    pub fn access_token(&self) -> &AccessToken {
        &self.access_token
    }

    pub fn principal(&self) -> Principal {
        Principal::new(self.user.id, self.role)
    }

    pub fn can_operate(&self) -> bool {
        self.principal().can_operate()
    }
}
