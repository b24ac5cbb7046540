//! Sessions issued by the hosted auth API.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use oilstock_core::UserId;

macro_rules! secret_string {
    ($t:ident) => {
        /// Opaque bearer credential. `Debug` never prints the value.
        #[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $t(String);

        impl $t {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn expose(&self) -> &str {
                &self.0
            }
        }

        impl core::fmt::Debug for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(concat!(stringify!($t), "(***)"))
            }
        }
    };
}

secret_string!(AccessToken);
secret_string!(RefreshToken);

/// The authenticated user as reported by the auth API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
}

/// An access/refresh token pair plus the user it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: AccessToken,
    pub refresh_token: RefreshToken,
    pub expires_at: DateTime<Utc>,
    pub user: AuthUser,
}

impl Session {
    /// Build a session from the auth API's `expires_in` (seconds from now).
    pub fn issued(
        access_token: AccessToken,
        refresh_token: RefreshToken,
        expires_in_secs: i64,
        user: AuthUser,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token,
            refresh_token,
            expires_at: now + Duration::seconds(expires_in_secs.max(0)),
            user,
        }
    }

    /// Seconds until expiry, floored at zero (cookie max-age).
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_seconds().max(0)
    }
}
