//! Configuration loading from environment variables.

use std::net::SocketAddr;
use std::time::Duration;

use reqwest::Url;
use thiserror::Error;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_PUBLIC_URL: &str = "http://localhost:8080";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(var: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            var,
            reason: reason.into(),
        }
    }
}

/// Connection settings for the hosted backend.
#[derive(Clone, PartialEq, Eq)]
pub struct SupabaseConfig {
    /// Project base URL, always ending in `/` so relative joins keep its path.
    pub url: Url,
    /// Public (anon) API key; sent as `apikey` on every call.
    pub anon_key: String,
    pub timeout: Duration,
}

impl core::fmt::Debug for SupabaseConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SupabaseConfig")
            .field("url", &self.url.as_str())
            .field("anon_key", &"***")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl SupabaseConfig {
    pub fn new(url: &str, anon_key: impl Into<String>, timeout: Duration) -> Result<Self, ConfigError> {
        let mut url = Url::parse(url.trim()).map_err(|e| ConfigError::invalid("SUPABASE_URL", e.to_string()))?;
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }

        let anon_key = anon_key.into();
        if anon_key.trim().is_empty() {
            return Err(ConfigError::Missing("SUPABASE_ANON_KEY"));
        }

        Ok(Self { url, anon_key, timeout })
    }
}

/// Which backend adapter the server should use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendSettings {
    Supabase(SupabaseConfig),
    /// Seeded in-memory adapter for local development.
    InMemory,
}

/// Process configuration for the web server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// Externally reachable base URL; sign-in links point back here.
    pub public_url: Url,
    pub secure_cookies: bool,
    pub backend: BackendSettings,
}

impl AppConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary variable lookup (tests pass a map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_addr = get("OILSTOCK_BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::invalid("OILSTOCK_BIND_ADDR", e.to_string()))?;

        let public_url = get("OILSTOCK_PUBLIC_URL").unwrap_or_else(|| DEFAULT_PUBLIC_URL.to_string());
        let public_url =
            Url::parse(&public_url).map_err(|e| ConfigError::invalid("OILSTOCK_PUBLIC_URL", e.to_string()))?;

        let secure_cookies = match get("OILSTOCK_SECURE_COOKIES") {
            None => false,
            Some(v) => parse_bool(&v).ok_or_else(|| ConfigError::invalid("OILSTOCK_SECURE_COOKIES", v))?,
        };

        let backend = match get("OILSTOCK_BACKEND").as_deref().map(str::trim) {
            None | Some("supabase") => {
                let timeout_secs = match get("OILSTOCK_HTTP_TIMEOUT_SECS") {
                    None => DEFAULT_HTTP_TIMEOUT_SECS,
                    Some(v) => v
                        .trim()
                        .parse::<u64>()
                        .map_err(|e| ConfigError::invalid("OILSTOCK_HTTP_TIMEOUT_SECS", e.to_string()))?,
                };
                let url = get("SUPABASE_URL")
                    .or_else(|| get("NEXT_PUBLIC_SUPABASE_URL"))
                    .ok_or(ConfigError::Missing("SUPABASE_URL"))?;
                let anon_key = get("SUPABASE_ANON_KEY")
                    .or_else(|| get("NEXT_PUBLIC_SUPABASE_ANON_KEY"))
                    .ok_or(ConfigError::Missing("SUPABASE_ANON_KEY"))?;
                BackendSettings::Supabase(SupabaseConfig::new(
                    &url,
                    anon_key,
                    Duration::from_secs(timeout_secs.max(1)),
                )?)
            }
            Some("memory") => BackendSettings::InMemory,
            Some(other) => {
                return Err(ConfigError::invalid(
                    "OILSTOCK_BACKEND",
                    format!("'{other}' (expected 'supabase' or 'memory')"),
                ));
            }
        };

        Ok(Self {
            bind_addr,
            public_url,
            secure_cookies,
            backend,
        })
    }

    /// Where the emailed sign-in link should send the browser back to.
    pub fn sign_in_redirect(&self) -> String {
        match self.public_url.join("auth/confirm") {
            Ok(url) => url.to_string(),
            Err(_) => format!("{}/auth/confirm", self.public_url.as_str().trim_end_matches('/')),
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
