//! Reqwest-backed adapter for a Supabase project.
//!
//! Transport only: URL building, headers, status mapping and JSON decoding.
//! Auth goes to `/auth/v1/*`, tables and views to `/rest/v1/<name>`.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::json;

use oilstock_auth::{AccessToken, AuthUser, EmailAddress, RefreshToken, Role, Session};
use oilstock_core::{ProductId, UserId};
use oilstock_inventory::{NewMovement, ProductKey, StockRow, Warehouse, WarehouseFilter};

use super::{AuthGateway, BackendError, InventoryStore, maybe_single, parse_role};
use crate::config::SupabaseConfig;

mod dto;

use dto::{ErrorBodyDto, IdRowDto, RoleRowDto, SessionDto};

const APP_USERS: &str = "app_users";
const WAREHOUSES: &str = "warehouses";
const STOCK_VIEW: &str = "v_stock_detailed";
const PRODUCTS: &str = "products";
const MOVEMENTS: &str = "inventory_movements";

/// Adapter implementing both backend ports over HTTP.
#[derive(Clone)]
pub struct SupabaseBackend {
    client: Client,
    base: Url,
    anon_key: String,
}

impl SupabaseBackend {
    /// Build an adapter using a reqwest client with the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(config: &SupabaseConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            base: config.url.clone(),
            anon_key: config.anon_key.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        self.base
            .join(path)
            .map_err(|e| BackendError::Transport(format!("invalid endpoint '{path}': {e}")))
    }

    /// Attach `apikey` plus a bearer: the user's token, or the anon key.
    fn authed(&self, builder: RequestBuilder, token: Option<&AccessToken>) -> RequestBuilder {
        let bearer = token.map_or(self.anon_key.as_str(), AccessToken::expose);
        builder
            .header("apikey", self.anon_key.as_str())
            .header(AUTHORIZATION, format!("Bearer {bearer}"))
    }

    fn auth_post(&self, path: &str, token: Option<&AccessToken>) -> Result<RequestBuilder, BackendError> {
        let url = self.endpoint(&format!("auth/v1/{path}"))?;
        Ok(self.authed(self.client.post(url), token))
    }

    fn rest_get(
        &self,
        table: &str,
        token: &AccessToken,
        query: &[(&str, String)],
    ) -> Result<RequestBuilder, BackendError> {
        let url = self.endpoint(&format!("rest/v1/{table}"))?;
        Ok(self
            .authed(self.client.get(url), Some(token))
            .header(ACCEPT, "application/json")
            .query(query))
    }

    async fn fetch_rows<T: DeserializeOwned>(
        &self,
        table: &'static str,
        token: &AccessToken,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, BackendError> {
        let response = send(self.rest_get(table, token, query)?).await?;
        tracing::debug!(table, "select");
        decode(response).await
    }
}

impl core::fmt::Debug for SupabaseBackend {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SupabaseBackend")
            .field("base", &self.base.as_str())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl AuthGateway for SupabaseBackend {
    async fn send_sign_in_link(&self, email: &EmailAddress, redirect_to: &str) -> Result<(), BackendError> {
        let request = self
            .auth_post("otp", None)?
            .query(&[("redirect_to", redirect_to)])
            .json(&json!({ "email": email.as_str(), "create_user": true }));
        send(request).await?;
        tracing::info!("sign-in link requested");
        Ok(())
    }

    async fn verify_sign_in_link(&self, token_hash: &str, link_type: &str) -> Result<Session, BackendError> {
        let request = self
            .auth_post("verify", None)?
            .json(&json!({ "token_hash": token_hash, "type": link_type }));
        let dto: SessionDto = decode(send(request).await?).await?;
        Ok(dto.into_session(Utc::now()))
    }

    async fn current_user(&self, token: &AccessToken) -> Result<AuthUser, BackendError> {
        let url = self.endpoint("auth/v1/user")?;
        let request = self.authed(self.client.get(url), Some(token));
        decode(send(request).await?).await
    }

    async fn refresh_session(&self, refresh_token: &RefreshToken) -> Result<Session, BackendError> {
        let request = self
            .auth_post("token", None)?
            .query(&[("grant_type", "refresh_token")])
            .json(&json!({ "refresh_token": refresh_token.expose() }));
        let dto: SessionDto = decode(send(request).await?).await?;
        tracing::debug!("session refreshed");
        Ok(dto.into_session(Utc::now()))
    }

    async fn sign_out(&self, token: &AccessToken) -> Result<(), BackendError> {
        send(self.auth_post("logout", Some(token))?).await?;
        Ok(())
    }
}

#[async_trait]
impl InventoryStore for SupabaseBackend {
    async fn role_of(&self, token: &AccessToken, user_id: UserId) -> Result<Option<Role>, BackendError> {
        let rows: Vec<RoleRowDto> = self
            .fetch_rows(
                APP_USERS,
                token,
                &[("select", "role".to_string()), ("user_id", format!("eq.{user_id}"))],
            )
            .await?;
        let row = maybe_single(rows, APP_USERS)?;
        Ok(parse_role(row.as_ref().and_then(|r| r.role.as_deref())))
    }

    async fn warehouses(&self, token: &AccessToken) -> Result<Vec<Warehouse>, BackendError> {
        self.fetch_rows(
            WAREHOUSES,
            token,
            &[("select", "id,name".to_string()), ("order", "name.asc".to_string())],
        )
        .await
    }

    async fn stock(&self, token: &AccessToken, filter: &WarehouseFilter) -> Result<Vec<StockRow>, BackendError> {
        let mut query = vec![("select", "*".to_string())];
        if let Some(name) = filter.name() {
            query.push(("warehouse", format!("eq.{name}")));
        }
        self.fetch_rows(STOCK_VIEW, token, &query).await
    }

    async fn find_product(&self, token: &AccessToken, key: &ProductKey) -> Result<Option<ProductId>, BackendError> {
        let rows: Vec<IdRowDto> = self
            .fetch_rows(
                PRODUCTS,
                token,
                &[
                    ("select", "id".to_string()),
                    ("year", format!("eq.{}", key.year)),
                    ("lot", format!("eq.{}", key.lot)),
                    ("size", format!("eq.{}", key.size)),
                ],
            )
            .await?;
        Ok(maybe_single(rows, PRODUCTS)?.map(|row| row.id))
    }

    async fn record_movement(&self, token: &AccessToken, movement: &NewMovement) -> Result<(), BackendError> {
        let url = self.endpoint(&format!("rest/v1/{MOVEMENTS}"))?;
        let request = self
            .authed(self.client.post(url), Some(token))
            .header("Prefer", "return=minimal")
            .json(movement);
        send(request).await?;
        tracing::info!(
            movement = %movement.movement,
            quantity_ml = movement.quantity_ml,
            warehouse_id = %movement.warehouse_id,
            product_id = %movement.product_id,
            "movement recorded"
        );
        Ok(())
    }
}

async fn send(request: RequestBuilder) -> Result<Response, BackendError> {
    let response = request.send().await.map_err(map_transport_error)?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.bytes().await.unwrap_or_default();
    Err(map_status_error(status, body.as_ref()))
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, BackendError> {
    let body = response.bytes().await.map_err(map_transport_error)?;
    serde_json::from_slice(&body).map_err(|e| BackendError::Decode(e.to_string()))
}

fn map_transport_error(error: reqwest::Error) -> BackendError {
    if error.is_timeout() {
        BackendError::Transport("request timed out".to_string())
    } else {
        BackendError::Transport(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> BackendError {
    let message = serde_json::from_slice::<ErrorBodyDto>(body)
        .ok()
        .and_then(ErrorBodyDto::best_message)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());

    tracing::warn!(status = status.as_u16(), %message, "backend call failed");

    match status {
        StatusCode::UNAUTHORIZED => BackendError::Unauthorized,
        StatusCode::FORBIDDEN => BackendError::Forbidden(message),
        other => BackendError::rejected(other.as_u16(), message),
    }
}
