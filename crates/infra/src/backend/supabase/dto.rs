//! Wire shapes of the auth and table APIs.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use oilstock_auth::{AccessToken, AuthUser, RefreshToken, Session};
use oilstock_core::ProductId;

/// Session payload returned by `/verify` and `/token`.
#[derive(Debug, Deserialize)]
pub(crate) struct SessionDto {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    pub user: AuthUser,
}

impl SessionDto {
    pub fn into_session(self, now: DateTime<Utc>) -> Session {
        Session::issued(
            AccessToken::new(self.access_token),
            RefreshToken::new(self.refresh_token),
            self.expires_in.unwrap_or(3600),
            self.user,
            now,
        )
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RoleRowDto {
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct IdRowDto {
    pub id: ProductId,
}

/// Error body. The auth API uses `msg` / `error_description`, the table API
/// uses `message`; take whichever is present.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBodyDto {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ErrorBodyDto {
    pub fn best_message(self) -> Option<String> {
        self.message
            .or(self.msg)
            .or(self.error_description)
            .or(self.error)
            .filter(|m| !m.trim().is_empty())
    }
}
