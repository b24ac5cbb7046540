use std::sync::Arc;

use oilstock_infra::{AppConfig, AuthGateway, BackendSettings, InMemoryBackend, InventoryStore, SupabaseBackend};

/// Backend ports and request-independent settings shared by all handlers.
#[derive(Clone)]
pub struct AppServices {
    pub auth: Arc<dyn AuthGateway>,
    pub store: Arc<dyn InventoryStore>,
    /// Absolute URL the emailed sign-in link returns to.
    pub sign_in_redirect: String,
    pub secure_cookies: bool,
}

impl AppServices {
    pub fn new(
        auth: Arc<dyn AuthGateway>,
        store: Arc<dyn InventoryStore>,
        sign_in_redirect: impl Into<String>,
        secure_cookies: bool,
    ) -> Self {
        Self {
            auth,
            store,
            sign_in_redirect: sign_in_redirect.into(),
            secure_cookies,
        }
    }

    /// Both ports served by one in-memory backend.
    pub fn in_memory(backend: Arc<InMemoryBackend>, sign_in_redirect: impl Into<String>) -> Self {
        Self::new(backend.clone(), backend, sign_in_redirect, false)
    }

    /// Wire the adapter selected by configuration.
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let redirect = config.sign_in_redirect();
        let services = match &config.backend {
            BackendSettings::Supabase(settings) => {
                tracing::info!(url = %settings.url, "using hosted backend");
                let backend = Arc::new(SupabaseBackend::new(settings)?);
                Self::new(backend.clone(), backend, redirect, config.secure_cookies)
            }
            BackendSettings::InMemory => {
                tracing::warn!("using in-memory backend with demo data; nothing is persisted");
                let backend = Arc::new(InMemoryBackend::with_demo_data());
                Self::new(backend.clone(), backend, redirect, config.secure_cookies)
            }
        };
        Ok(services)
    }
}
