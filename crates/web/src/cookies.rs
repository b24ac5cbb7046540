//! Session cookies: the browser keeps the access and refresh tokens in two
//! HttpOnly cookies.

use axum::http::{header, HeaderMap, HeaderValue};
use chrono::{DateTime, Utc};

use oilstock_auth::{AccessToken, RefreshToken, Session};

pub const ACCESS_COOKIE: &str = "oilstock_at";
pub const REFRESH_COOKIE: &str = "oilstock_rt";

const REFRESH_MAX_AGE_SECS: i64 = 60 * 60 * 24 * 30;

/// Tokens found on an incoming request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access: Option<AccessToken>,
    pub refresh: Option<RefreshToken>,
    /// Bearer header (API client) rather than cookies (browser).
    pub from_bearer: bool,
}

impl Credentials {
    /// Read a bearer header first, then the session cookies.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        if let Some(token) = bearer_token(headers) {
            return Some(Self {
                access: Some(AccessToken::new(token)),
                refresh: None,
                from_bearer: true,
            });
        }

        let access = cookie_value(headers, ACCESS_COOKIE).map(AccessToken::new);
        let refresh = cookie_value(headers, REFRESH_COOKIE).map(RefreshToken::new);
        if access.is_none() && refresh.is_none() {
            return None;
        }
        Some(Self {
            access,
            refresh,
            from_bearer: false,
        })
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let token = headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")?
        .trim();
    (!token.is_empty()).then_some(token)
}

/// Value of the named cookie from any `Cookie` header.
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, v)| *k == name && !v.is_empty())
        .map(|(_, v)| v)
}

fn set_cookie(name: &str, value: &str, max_age: i64, secure: bool) -> String {
    let mut cookie = format!("{name}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` values storing a session.
pub fn session_cookies(session: &Session, now: DateTime<Utc>, secure: bool) -> Vec<String> {
    vec![
        set_cookie(
            ACCESS_COOKIE,
            session.access_token.expose(),
            session.remaining_secs(now),
            secure,
        ),
        set_cookie(
            REFRESH_COOKIE,
            session.refresh_token.expose(),
            REFRESH_MAX_AGE_SECS,
            secure,
        ),
    ]
}

/// `Set-Cookie` values removing the session.
pub fn cleared_cookies(secure: bool) -> Vec<String> {
    vec![
        set_cookie(ACCESS_COOKIE, "", 0, secure),
        set_cookie(REFRESH_COOKIE, "", 0, secure),
    ]
}

/// Append `Set-Cookie` headers, skipping values that are not valid header text.
pub fn append_set_cookies(headers: &mut HeaderMap, cookies: Vec<String>) {
    for cookie in cookies {
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                headers.append(header::SET_COOKIE, value);
            }
            Err(_) => tracing::warn!("dropping cookie with invalid characters"),
        }
    }
}
