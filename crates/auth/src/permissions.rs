use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::Role;

/// Permission identifier (e.g. `"stock.read"`).
///
/// The wildcard `"*"` grants everything.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    /// View the stock table and warehouse list.
    pub const STOCK_READ: Permission = Permission(Cow::Borrowed("stock.read"));
    /// Insert rows into the movement ledger.
    pub const MOVEMENTS_RECORD: Permission = Permission(Cow::Borrowed("movements.record"));
    pub const WILDCARD: Permission = Permission(Cow::Borrowed("*"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Role → permission mapping.
///
/// Admin gets the wildcard; this mirrors, but does not replace, the row-level
/// security policies in the database.
pub fn permissions_for(role: Role) -> Vec<Permission> {
    match role {
        Role::Admin => vec![Permission::WILDCARD],
        Role::Operator => vec![Permission::STOCK_READ, Permission::MOVEMENTS_RECORD],
        Role::Viewer => vec![Permission::STOCK_READ],
    }
}
