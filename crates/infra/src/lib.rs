//! Infrastructure layer: configuration and the hosted-backend adapters.
//!
//! The web layer talks to two ports, [`backend::AuthGateway`] and
//! [`backend::InventoryStore`]. Production wires both to
//! [`backend::SupabaseBackend`]; local development and tests use
//! [`backend::InMemoryBackend`].

pub mod backend;
pub mod config;

pub use backend::{AuthGateway, BackendError, InMemoryBackend, InventoryStore, SupabaseBackend};
pub use config::{AppConfig, BackendSettings, ConfigError, SupabaseConfig};
