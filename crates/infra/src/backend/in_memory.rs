//! In-memory backend for local development and tests.
//!
//! Stands in for the hosted project: it issues sign-in links and sessions,
//! stores roles, warehouses, products and the movement ledger, and derives
//! the stock view from the ledger. Row-level security is approximated by
//! requiring a valid session for every call and an operator/admin role for
//! inserts.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use oilstock_auth::{AccessToken, AuthUser, EmailAddress, RefreshToken, Role, Session};
use oilstock_core::{ProductId, UserId, WarehouseId};
use oilstock_inventory::product::VINTAGES;
use oilstock_inventory::warehouse::sort_by_name;
use oilstock_inventory::{Lot, NewMovement, PackageSize, ProductKey, StockRow, Warehouse, WarehouseFilter};

use super::{AuthGateway, BackendError, InventoryStore};

const SESSION_TTL_SECS: i64 = 3600;

/// A sign-in link "sent" by the in-memory auth API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentLink {
    pub email: String,
    pub token_hash: String,
    pub redirect_to: String,
}

#[derive(Debug, Default)]
struct State {
    users: HashMap<String, AuthUser>,
    roles: HashMap<UserId, Role>,
    outbox: Vec<SentLink>,
    pending_links: HashMap<String, String>,
    access_tokens: HashMap<String, UserId>,
    refresh_tokens: HashMap<String, UserId>,
    warehouses: Vec<Warehouse>,
    products: HashMap<ProductKey, ProductId>,
    movements: Vec<NewMovement>,
}

impl State {
    fn user_by_id(&self, user_id: UserId) -> Option<&AuthUser> {
        self.users.values().find(|u| u.id == user_id)
    }

    fn ensure_user(&mut self, email: &str) -> AuthUser {
        self.users
            .entry(email.to_string())
            .or_insert_with(|| AuthUser {
                id: UserId::new(),
                email: Some(email.to_string()),
            })
            .clone()
    }

    fn issue_session(&mut self, user: AuthUser) -> Session {
        let access = opaque_token();
        let refresh = opaque_token();
        self.access_tokens.insert(access.clone(), user.id);
        self.refresh_tokens.insert(refresh.clone(), user.id);
        Session::issued(
            AccessToken::new(access),
            RefreshToken::new(refresh),
            SESSION_TTL_SECS,
            user,
            Utc::now(),
        )
    }

    fn authenticate(&self, token: &AccessToken) -> Result<UserId, BackendError> {
        self.access_tokens
            .get(token.expose())
            .copied()
            .ok_or(BackendError::Unauthorized)
    }
}

/// Backend that keeps everything in process memory.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    state: RwLock<State>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Two warehouses, every product for the offered vintages, and an admin
    /// account (`admin@oilstock.local`).
    pub fn with_demo_data() -> Self {
        let backend = Self::new();
        backend.add_warehouse("Cantina");
        backend.add_warehouse("Frantoio");
        for year in VINTAGES {
            for lot in Lot::ALL {
                for size in PackageSize::ALL {
                    backend.add_product(ProductKey::new(year, lot, size));
                }
            }
        }
        backend.set_role("admin@oilstock.local", Some(Role::Admin));
        backend
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, BackendError> {
        self.state
            .read()
            .map_err(|_| BackendError::Transport("in-memory state poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, BackendError> {
        self.state
            .write()
            .map_err(|_| BackendError::Transport("in-memory state poisoned".to_string()))
    }

    pub fn add_warehouse(&self, name: &str) -> WarehouseId {
        let id = WarehouseId::new();
        if let Ok(mut state) = self.write() {
            state.warehouses.push(Warehouse::new(id, name));
        }
        id
    }

    pub fn add_product(&self, key: ProductKey) -> ProductId {
        match self.write() {
            Ok(mut state) => *state.products.entry(key).or_default(),
            Err(_) => ProductId::new(),
        }
    }

    /// Create the user if needed and set (or clear) its role.
    pub fn set_role(&self, email: &str, role: Option<Role>) -> UserId {
        let Ok(mut state) = self.write() else {
            return UserId::new();
        };
        let user = state.ensure_user(email);
        match role {
            Some(role) => state.roles.insert(user.id, role),
            None => state.roles.remove(&user.id),
        };
        user.id
    }

    /// Sign a user in without going through the email link.
    pub fn session_for(&self, email: &str) -> Option<Session> {
        let mut state = self.write().ok()?;
        let user = state.ensure_user(email);
        Some(state.issue_session(user))
    }

    /// Invalidate an access token while keeping its refresh token usable.
    pub fn expire_access_token(&self, token: &AccessToken) {
        if let Ok(mut state) = self.write() {
            state.access_tokens.remove(token.expose());
        }
    }

    pub fn sent_links(&self) -> Vec<SentLink> {
        self.read().map(|s| s.outbox.clone()).unwrap_or_default()
    }

    pub fn movements(&self) -> Vec<NewMovement> {
        self.read().map(|s| s.movements.clone()).unwrap_or_default()
    }
}

fn opaque_token() -> String {
    Uuid::now_v7().simple().to_string()
}

#[async_trait]
impl AuthGateway for InMemoryBackend {
    async fn send_sign_in_link(&self, email: &EmailAddress, redirect_to: &str) -> Result<(), BackendError> {
        let mut state = self.write()?;
        let token_hash = opaque_token();
        state.pending_links.insert(token_hash.clone(), email.to_string());
        state.outbox.push(SentLink {
            email: email.to_string(),
            token_hash,
            redirect_to: redirect_to.to_string(),
        });
        Ok(())
    }

    async fn verify_sign_in_link(&self, token_hash: &str, _link_type: &str) -> Result<Session, BackendError> {
        let mut state = self.write()?;
        let email = state
            .pending_links
            .remove(token_hash)
            .ok_or_else(|| BackendError::Forbidden("Email link is invalid or has expired".to_string()))?;
        let user = state.ensure_user(&email);
        Ok(state.issue_session(user))
    }

    async fn current_user(&self, token: &AccessToken) -> Result<AuthUser, BackendError> {
        let state = self.read()?;
        let user_id = state.authenticate(token)?;
        state.user_by_id(user_id).cloned().ok_or(BackendError::Unauthorized)
    }

    async fn refresh_session(&self, refresh_token: &RefreshToken) -> Result<Session, BackendError> {
        let mut state = self.write()?;
        let user_id = state
            .refresh_tokens
            .remove(refresh_token.expose())
            .ok_or_else(|| BackendError::rejected(400, "Invalid Refresh Token"))?;
        let user = state.user_by_id(user_id).cloned().ok_or(BackendError::Unauthorized)?;
        Ok(state.issue_session(user))
    }

    async fn sign_out(&self, token: &AccessToken) -> Result<(), BackendError> {
        let mut state = self.write()?;
        let user_id = state.authenticate(token)?;
        state.access_tokens.retain(|_, u| *u != user_id);
        state.refresh_tokens.retain(|_, u| *u != user_id);
        Ok(())
    }
}

#[async_trait]
impl InventoryStore for InMemoryBackend {
    async fn role_of(&self, token: &AccessToken, user_id: UserId) -> Result<Option<Role>, BackendError> {
        let state = self.read()?;
        state.authenticate(token)?;
        Ok(state.roles.get(&user_id).copied())
    }

    async fn warehouses(&self, token: &AccessToken) -> Result<Vec<Warehouse>, BackendError> {
        let state = self.read()?;
        state.authenticate(token)?;
        let mut list = state.warehouses.clone();
        sort_by_name(&mut list);
        Ok(list)
    }

    async fn stock(&self, token: &AccessToken, filter: &WarehouseFilter) -> Result<Vec<StockRow>, BackendError> {
        let state = self.read()?;
        state.authenticate(token)?;

        let names: HashMap<WarehouseId, &str> = state.warehouses.iter().map(|w| (w.id, w.name.as_str())).collect();
        let keys: HashMap<ProductId, ProductKey> = state.products.iter().map(|(k, id)| (*id, *k)).collect();

        let mut totals: BTreeMap<(String, i32, &'static str, &'static str), (ProductKey, i64)> = BTreeMap::new();
        for m in &state.movements {
            let (Some(name), Some(key)) = (names.get(&m.warehouse_id), keys.get(&m.product_id)) else {
                continue;
            };
            let bucket = totals
                .entry((name.to_string(), key.year, key.lot.as_str(), key.size.code()))
                .or_insert((*key, 0));
            bucket.1 += m.quantity_ml;
        }

        Ok(totals
            .into_iter()
            .map(|((warehouse, ..), (key, qty_ml))| StockRow {
                warehouse,
                year: key.year,
                lot: key.lot,
                size: key.size,
                qty_ml: qty_ml as f64,
                approx_units: qty_ml as f64 / key.size.ml_per_unit() as f64,
            })
            .filter(|row| filter.matches(row))
            .collect())
    }

    async fn find_product(&self, token: &AccessToken, key: &ProductKey) -> Result<Option<ProductId>, BackendError> {
        let state = self.read()?;
        state.authenticate(token)?;
        Ok(state.products.get(key).copied())
    }

    async fn record_movement(&self, token: &AccessToken, movement: &NewMovement) -> Result<(), BackendError> {
        let mut state = self.write()?;
        let user_id = state.authenticate(token)?;

        let allowed = state.roles.get(&user_id).is_some_and(Role::can_operate);
        if !allowed || movement.user_id != user_id {
            return Err(BackendError::Forbidden(
                "new row violates row-level security policy for table \"inventory_movements\"".to_string(),
            ));
        }
        if !state.warehouses.iter().any(|w| w.id == movement.warehouse_id) {
            return Err(BackendError::rejected(
                409,
                "insert or update on table \"inventory_movements\" violates foreign key constraint",
            ));
        }

        state.movements.push(movement.clone());
        Ok(())
    }
}
