//! `oilstock-auth`: authentication/authorization types.
//!
//! Sign-in and role storage live in the hosted backend; this crate only models
//! what comes back (sessions, users, roles) and decides what a role may do.
//! It is decoupled from HTTP and from the backend client.

pub mod authorize;
pub mod email;
pub mod permissions;
pub mod roles;
pub mod session;

pub use authorize::{authorize, AuthzError, Principal};
pub use email::EmailAddress;
pub use permissions::Permission;
pub use roles::Role;
pub use session::{AccessToken, AuthUser, RefreshToken, Session};
