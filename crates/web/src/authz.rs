//! Authorization guard for write operations.
//!
//! Checked before any remote write; the database's row-level security stays
//! the final authority.

use oilstock_auth::{authorize, AuthzError, Permission};

use crate::context::SessionContext;

/// Ensure the caller may insert into the movement ledger.
pub fn authorize_movement(session: &SessionContext) -> Result<(), AuthzError> {
    authorize(&session.principal(), &Permission::MOVEMENTS_RECORD)
}
