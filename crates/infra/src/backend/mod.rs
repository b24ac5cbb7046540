//! Ports to the hosted backend and their adapters.
//!
//! Every call carries the signed-in user's access token so the database's
//! row-level security sees the real caller. Nothing here retries.

use async_trait::async_trait;
use thiserror::Error;

use oilstock_auth::{AccessToken, AuthUser, EmailAddress, RefreshToken, Role, Session};
use oilstock_core::{ProductId, UserId};
use oilstock_inventory::{NewMovement, ProductKey, StockRow, Warehouse, WarehouseFilter};

pub mod in_memory;
pub mod supabase;

pub use in_memory::{InMemoryBackend, SentLink};
pub use supabase::SupabaseBackend;

/// Remote-call failure.
///
/// These are infrastructure errors; input validation lives in
/// `oilstock_core::DomainError`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Missing, expired or revoked credentials.
    #[error("not authenticated")]
    Unauthorized,

    /// Authenticated, but row-level security (or the auth API) refused.
    #[error("permission denied: {0}")]
    Forbidden(String),

    /// Any other non-success response.
    #[error("backend rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// A "maybe single" lookup matched more than one row.
    #[error("expected at most one row from {0}, got several")]
    MultipleRows(&'static str),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("failed to decode backend response: {0}")]
    Decode(String),
}

impl BackendError {
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }

    /// Text suitable for an alert shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            BackendError::Forbidden(msg) => msg.clone(),
            BackendError::Rejected { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Email-link authentication and session management.
#[async_trait]
pub trait AuthGateway: Send + Sync {
    /// Ask the auth API to email a sign-in link that returns to `redirect_to`.
    async fn send_sign_in_link(&self, email: &EmailAddress, redirect_to: &str) -> Result<(), BackendError>;

    /// Exchange the token carried by the emailed link for a session.
    async fn verify_sign_in_link(&self, token_hash: &str, link_type: &str) -> Result<Session, BackendError>;

    /// Resolve the user behind an access token.
    async fn current_user(&self, token: &AccessToken) -> Result<AuthUser, BackendError>;

    /// Trade a refresh token for a fresh session.
    async fn refresh_session(&self, refresh_token: &RefreshToken) -> Result<Session, BackendError>;

    /// Revoke the session remotely.
    async fn sign_out(&self, token: &AccessToken) -> Result<(), BackendError>;
}

/// Table/view access used by the stock page and the movement form.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// `app_users.role` for the user; `None` when there is no row, the column
    /// is null, or the value is not a known role.
    async fn role_of(&self, token: &AccessToken, user_id: UserId) -> Result<Option<Role>, BackendError>;

    /// All warehouses ordered by name.
    async fn warehouses(&self, token: &AccessToken) -> Result<Vec<Warehouse>, BackendError>;

    /// Rows of the aggregated stock view, optionally for one warehouse.
    async fn stock(&self, token: &AccessToken, filter: &WarehouseFilter) -> Result<Vec<StockRow>, BackendError>;

    /// Product id for (year, lot, size), if such a product exists.
    async fn find_product(&self, token: &AccessToken, key: &ProductKey) -> Result<Option<ProductId>, BackendError>;

    /// Insert one ledger row.
    async fn record_movement(&self, token: &AccessToken, movement: &NewMovement) -> Result<(), BackendError>;
}

/// Collapse a "maybe single" result: zero or one row, never more.
pub(crate) fn maybe_single<T>(mut rows: Vec<T>, source: &'static str) -> Result<Option<T>, BackendError> {
    match rows.len() {
        0 => Ok(None),
        1 => Ok(rows.pop()),
        _ => Err(BackendError::MultipleRows(source)),
    }
}

/// Interpret a raw role column, logging values the app does not know.
pub(crate) fn parse_role(raw: Option<&str>) -> Option<Role> {
    let raw = raw?;
    match raw.parse::<Role>() {
        Ok(role) => Some(role),
        Err(e) => {
            tracing::warn!(error = %e, "ignoring unrecognised role");
            None
        }
    }
}
