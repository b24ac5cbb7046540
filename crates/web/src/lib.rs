//! Web front end: server-rendered stock page, movement form, email-link
//! sign-in, and a small JSON API over the same operations.

pub mod app;
pub mod authz;
pub mod context;
pub mod cookies;
pub mod middleware;
