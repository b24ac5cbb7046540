use std::sync::Arc;

use async_trait::async_trait;
use oilstock_auth::{AccessToken, AuthUser, EmailAddress, RefreshToken, Role, Session};
use oilstock_core::{ProductId, UserId, WarehouseId};
use oilstock_infra::{AuthGateway, BackendError, InMemoryBackend, InventoryStore};
use oilstock_inventory::{NewMovement, ProductKey, StockRow, Warehouse, WarehouseFilter};
use oilstock_web::app::{build_app, services::AppServices};
use reqwest::{header, StatusCode};
use serde_json::json;

const REDIRECT: &str = "http://localhost:8080/auth/confirm";

struct TestServer {
    base_url: String,
    backend: Arc<InMemoryBackend>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        Self::spawn_with(|backend| AppServices::in_memory(backend, REDIRECT)).await
    }

    /// Same router as prod on an ephemeral port; `wire` may wrap the
    /// in-memory backend in doubles.
    async fn spawn_with(wire: impl FnOnce(Arc<InMemoryBackend>) -> AppServices) -> Self {
        let backend = Arc::new(InMemoryBackend::with_demo_data());
        let services = wire(backend.clone());
        let app = build_app(Arc::new(services));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            backend,
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Access token for a user with the given role.
    fn token_for(&self, email: &str, role: Option<Role>) -> String {
        self.backend.set_role(email, role);
        self.backend
            .session_for(email)
            .expect("session")
            .access_token
            .expose()
            .to_string()
    }

    async fn warehouse_id(&self, client: &reqwest::Client, token: &str, name: &str) -> String {
        let list: Vec<serde_json::Value> = client
            .get(self.url("/api/warehouses"))
            .bearer_auth(token)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        list.iter()
            .find(|w| w["name"] == name)
            .and_then(|w| w["id"].as_str())
            .expect("warehouse present")
            .to_string()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Auth API that answers stale or unknown access tokens with 403, like
/// GoTrue's `bad_jwt` response.
struct StaleTokensForbidden(Arc<InMemoryBackend>);

#[async_trait]
impl AuthGateway for StaleTokensForbidden {
    async fn send_sign_in_link(&self, email: &EmailAddress, redirect_to: &str) -> Result<(), BackendError> {
        self.0.send_sign_in_link(email, redirect_to).await
    }

    async fn verify_sign_in_link(&self, token_hash: &str, link_type: &str) -> Result<Session, BackendError> {
        self.0.verify_sign_in_link(token_hash, link_type).await
    }

    async fn current_user(&self, token: &AccessToken) -> Result<AuthUser, BackendError> {
        self.0.current_user(token).await.map_err(|e| match e {
            BackendError::Unauthorized => BackendError::Forbidden("invalid JWT: token is expired".to_string()),
            other => other,
        })
    }

    async fn refresh_session(&self, refresh_token: &RefreshToken) -> Result<Session, BackendError> {
        self.0.refresh_session(refresh_token).await
    }

    async fn sign_out(&self, token: &AccessToken) -> Result<(), BackendError> {
        self.0.sign_out(token).await
    }
}

/// Store whose table reads fail at the transport level; writes and role
/// lookups go through.
struct UnreachableReads(Arc<InMemoryBackend>);

const READ_FAILURE: &str = "connection refused";

#[async_trait]
impl InventoryStore for UnreachableReads {
    async fn role_of(&self, token: &AccessToken, user_id: UserId) -> Result<Option<Role>, BackendError> {
        self.0.role_of(token, user_id).await
    }

    async fn warehouses(&self, _token: &AccessToken) -> Result<Vec<Warehouse>, BackendError> {
        Err(BackendError::Transport(READ_FAILURE.to_string()))
    }

    async fn stock(&self, _token: &AccessToken, _filter: &WarehouseFilter) -> Result<Vec<StockRow>, BackendError> {
        Err(BackendError::Transport(READ_FAILURE.to_string()))
    }

    async fn find_product(&self, token: &AccessToken, key: &ProductKey) -> Result<Option<ProductId>, BackendError> {
        self.0.find_product(token, key).await
    }

    async fn record_movement(&self, token: &AccessToken, movement: &NewMovement) -> Result<(), BackendError> {
        self.0.record_movement(token, movement).await
    }
}

fn no_redirect_client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

/// `name=value` of the named cookie among the response's `Set-Cookie` headers.
fn set_cookie(res: &reqwest::Response, name: &str) -> Option<String> {
    res.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(&format!("{name}=")))
        .map(str::to_string)
}

fn cookie_pair(set_cookie: &str) -> &str {
    set_cookie.split(';').next().unwrap_or_default()
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn().await;
    let res = reqwest::get(srv.url("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn api_requires_a_session() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/api/whoami")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "unauthorized");

    let res = client
        .get(srv.url("/api/stock"))
        .bearer_auth("not-a-token")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn anonymous_home_shows_sign_in_form() {
    let srv = TestServer::spawn().await;
    let res = reqwest::get(srv.url("/")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let html = res.text().await.unwrap();
    assert!(html.contains(r#"action="/auth/sign-in""#));
    assert!(html.contains("Accedi"));
}

#[tokio::test]
async fn email_link_sign_in_sets_session_cookies() {
    let srv = TestServer::spawn().await;
    let client = no_redirect_client();

    let res = client
        .post(srv.url("/auth/sign-in"))
        .form(&[("email", "mario@example.com")])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let html = res.text().await.unwrap();
    assert!(html.contains("Ti ho inviato un link via email. Aprilo per accedere."));

    let link = srv.backend.sent_links().pop().expect("link sent");
    assert_eq!(link.email, "mario@example.com");
    assert_eq!(link.redirect_to, REDIRECT);

    let res = client
        .get(srv.url(&format!("/auth/confirm?token_hash={}&type=email", link.token_hash)))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(res.headers()[header::LOCATION], "/");
    let access = set_cookie(&res, "oilstock_at").expect("access cookie");
    let refresh = set_cookie(&res, "oilstock_rt").expect("refresh cookie");
    assert!(access.contains("HttpOnly"));

    // Signed in, but no app_users row yet.
    let res = client
        .get(srv.url("/"))
        .header(header::COOKIE, format!("{}; {}", cookie_pair(&access), cookie_pair(&refresh)))
        .send()
        .await
        .unwrap();
    let html = res.text().await.unwrap();
    assert!(html.contains("Ruolo: ..."));
    assert!(!html.contains(r#"action="/movements""#));

    // Links are single use.
    let res = client
        .get(srv.url(&format!("/auth/confirm?token_hash={}&type=email", link.token_hash)))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert!(set_cookie(&res, "oilstock_at").is_none());
}

#[tokio::test]
async fn invalid_email_is_rejected_without_sending() {
    let srv = TestServer::spawn().await;
    let res = reqwest::Client::new()
        .post(srv.url("/auth/sign-in"))
        .form(&[("email", "not-an-email")])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(srv.backend.sent_links().is_empty());
}

#[tokio::test]
async fn confirm_without_token_is_bad_request() {
    let srv = TestServer::spawn().await;
    let res = reqwest::get(srv.url("/auth/confirm")).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn whoami_reports_role() {
    let srv = TestServer::spawn().await;
    let token = srv.token_for("op@example.com", Some(Role::Operator));

    let res = reqwest::Client::new()
        .get(srv.url("/api/whoami"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["email"], "op@example.com");
    assert_eq!(body["role"], "operator");
    assert_eq!(body["can_operate"], true);
}

#[tokio::test]
async fn viewer_cannot_record_movements() {
    let srv = TestServer::spawn().await;
    let client = no_redirect_client();
    let token = srv.token_for("viewer@example.com", Some(Role::Viewer));
    let warehouse_id = srv.warehouse_id(&client, &token, "Cantina").await;

    let res = client
        .post(srv.url("/api/movements"))
        .bearer_auth(&token)
        .json(&json!({ "warehouse_id": warehouse_id, "units": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .post(srv.url("/movements"))
        .header(header::COOKIE, format!("oilstock_at={token}"))
        .form(&[("warehouse_id", warehouse_id.as_str()), ("units", "1")])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let html = res.text().await.unwrap();
    assert!(html.contains("Il tuo ruolo non consente di registrare movimenti."));

    assert!(srv.backend.movements().is_empty());
}

#[tokio::test]
async fn operator_records_and_stock_reflects_it() {
    let srv = TestServer::spawn().await;
    let client = no_redirect_client();
    let token = srv.token_for("op@example.com", Some(Role::Operator));
    let cantina = srv.warehouse_id(&client, &token, "Cantina").await;

    let res = client
        .post(srv.url("/api/movements"))
        .bearer_auth(&token)
        .json(&json!({
            "warehouse_id": cantina, "year": 2024, "lot": "A", "size": "ml_500",
            "kind": "in", "units": 4, "note": "  "
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["quantity_ml"], 2000);

    let res = client
        .post(srv.url("/api/movements"))
        .bearer_auth(&token)
        .json(&json!({ "warehouse_id": cantina, "kind": "out", "units": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["quantity_ml"], -500);

    let recorded = srv.backend.movements();
    assert_eq!(recorded.len(), 2);
    assert_eq!(recorded[0].note, None);

    let rows: Vec<serde_json::Value> = client
        .get(srv.url("/api/stock?warehouse=Cantina"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["qty_ml"], 1500.0);
    assert_eq!(rows[0]["approx_units"], 3.0);
    assert_eq!(rows[0]["size"], "ml_500");

    let rows: Vec<serde_json::Value> = client
        .get(srv.url("/api/stock?warehouse=Frantoio"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(rows.is_empty());

    let html = client
        .get(srv.url("/?warehouse=Cantina"))
        .header(header::COOKIE, format!("oilstock_at={token}"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(html.contains("Ruolo: operator"));
    assert!(html.contains(r#"<td class="num">1.500</td><td class="num">3</td>"#));
    assert!(html.contains("Registra (≈ 500 ml)"));
}

#[tokio::test]
async fn form_submission_redirects_back_to_the_filter() {
    let srv = TestServer::spawn().await;
    let client = no_redirect_client();
    srv.backend.add_warehouse("Frantoio & Co");
    let token = srv.token_for("admin2@example.com", Some(Role::Admin));
    let warehouse_id = srv.warehouse_id(&client, &token, "Frantoio & Co").await;

    let res = client
        .post(srv.url("/movements"))
        .header(header::COOKIE, format!("oilstock_at={token}"))
        .form(&[
            ("warehouse_id", warehouse_id.as_str()),
            ("year", "2025"),
            ("lot", "B"),
            ("size", "lt_5"),
            ("kind", "adjustment"),
            ("units", ""),
            ("note", "inventario"),
            ("filter", "Frantoio & Co"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        res.headers()[header::LOCATION],
        "/?warehouse=Frantoio%20%26%20Co&notice=recorded"
    );

    let recorded = srv.backend.movements();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].quantity_ml, 5000);
    assert_eq!(recorded[0].note.as_deref(), Some("inventario"));

    let html = client
        .get(srv.url("/?warehouse=Frantoio%20%26%20Co&notice=recorded"))
        .header(header::COOKIE, format!("oilstock_at={token}"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(html.contains("Movimento registrato."));
    assert!(html.contains("<td>Frantoio &amp; Co</td>"));
}

#[tokio::test]
async fn unresolved_warehouse_or_product_is_reported() {
    let srv = TestServer::spawn().await;
    let client = no_redirect_client();
    let token = srv.token_for("op@example.com", Some(Role::Operator));
    let cantina = srv.warehouse_id(&client, &token, "Cantina").await;

    let res = client
        .post(srv.url("/movements"))
        .header(header::COOKIE, format!("oilstock_at={token}"))
        .form(&[("warehouse_id", ""), ("units", "2"), ("note", "resto")])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let html = res.text().await.unwrap();
    assert!(html.contains("Seleziona magazzino e prodotto."));
    // The submitted values are kept.
    assert!(html.contains(r#"name="note" value="resto""#));

    // No product exists for this vintage.
    let res = client
        .post(srv.url("/api/movements"))
        .bearer_auth(&token)
        .json(&json!({ "warehouse_id": cantina, "year": 1999 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    assert!(srv.backend.movements().is_empty());
}

#[tokio::test]
async fn invalid_units_are_validation_errors() {
    let srv = TestServer::spawn().await;
    let client = no_redirect_client();
    let token = srv.token_for("op@example.com", Some(Role::Operator));
    let cantina = srv.warehouse_id(&client, &token, "Cantina").await;

    let res = client
        .post(srv.url("/api/movements"))
        .bearer_auth(&token)
        .json(&json!({ "warehouse_id": cantina, "units": 0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "validation_error");

    let res = client
        .post(srv.url("/api/movements"))
        .bearer_auth(&token)
        .header(header::CONTENT_TYPE, "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .post(srv.url("/movements"))
        .header(header::COOKIE, format!("oilstock_at={token}"))
        .form(&[("warehouse_id", cantina.as_str()), ("units", "-3")])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    assert!(srv.backend.movements().is_empty());
}

#[tokio::test]
async fn expired_access_token_is_refreshed_from_cookie() {
    let srv = TestServer::spawn().await;
    let client = no_redirect_client();
    srv.backend.set_role("op@example.com", Some(Role::Operator));
    let session = srv.backend.session_for("op@example.com").unwrap();
    srv.backend.expire_access_token(&session.access_token);

    let res = client
        .get(srv.url("/"))
        .header(
            header::COOKIE,
            format!(
                "oilstock_at={}; oilstock_rt={}",
                session.access_token.expose(),
                session.refresh_token.expose()
            ),
        )
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let access = set_cookie(&res, "oilstock_at").expect("new access cookie");
    assert_ne!(cookie_pair(&access), format!("oilstock_at={}", session.access_token.expose()));
    assert!(set_cookie(&res, "oilstock_rt").is_some());
    let html = res.text().await.unwrap();
    assert!(html.contains("Ruolo: operator"));

    // The refreshed token works for the API too.
    let token = cookie_pair(&access).trim_start_matches("oilstock_at=").to_string();
    let res = client
        .get(srv.url("/api/whoami"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn unusable_session_cookies_are_cleared() {
    let srv = TestServer::spawn().await;
    let res = no_redirect_client()
        .get(srv.url("/"))
        .header(header::COOKIE, "oilstock_at=stale; oilstock_rt=revoked")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let access = set_cookie(&res, "oilstock_at").expect("cleared cookie");
    assert!(access.contains("Max-Age=0"));
    let html = res.text().await.unwrap();
    assert!(html.contains(r#"action="/auth/sign-in""#));
}

#[tokio::test]
async fn sign_out_revokes_and_clears_cookies() {
    let srv = TestServer::spawn().await;
    let client = no_redirect_client();
    let token = srv.token_for("op@example.com", Some(Role::Operator));

    let res = client
        .post(srv.url("/auth/sign-out"))
        .header(header::COOKIE, format!("oilstock_at={token}"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(res.headers()[header::LOCATION], "/");
    assert!(set_cookie(&res, "oilstock_at").unwrap().contains("Max-Age=0"));
    assert!(set_cookie(&res, "oilstock_rt").unwrap().contains("Max-Age=0"));

    let res = client
        .get(srv.url("/api/whoami"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn access_token_rejected_with_403_is_refreshed() {
    let srv = TestServer::spawn_with(|backend| {
        AppServices::new(
            Arc::new(StaleTokensForbidden(backend.clone())),
            backend,
            REDIRECT,
            false,
        )
    })
    .await;
    let client = no_redirect_client();
    srv.backend.set_role("op@example.com", Some(Role::Operator));
    let session = srv.backend.session_for("op@example.com").unwrap();
    srv.backend.expire_access_token(&session.access_token);

    let res = client
        .get(srv.url("/"))
        .header(
            header::COOKIE,
            format!(
                "oilstock_at={}; oilstock_rt={}",
                session.access_token.expose(),
                session.refresh_token.expose()
            ),
        )
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let access = set_cookie(&res, "oilstock_at").expect("new access cookie");
    assert!(!access.contains("Max-Age=0"));
    assert_ne!(cookie_pair(&access), format!("oilstock_at={}", session.access_token.expose()));
    let html = res.text().await.unwrap();
    assert!(html.contains("Ruolo: operator"));
    assert!(!html.contains(r#"action="/auth/sign-in""#));

    // Without a refresh cookie the 403 still ends the session.
    let res = client
        .get(srv.url("/"))
        .header(header::COOKIE, format!("oilstock_at={}", session.access_token.expose()))
        .send()
        .await
        .unwrap();
    assert!(set_cookie(&res, "oilstock_at").unwrap().contains("Max-Age=0"));
    let html = res.text().await.unwrap();
    assert!(html.contains(r#"action="/auth/sign-in""#));
}

#[tokio::test]
async fn rejected_insert_shows_backend_message() {
    let srv = TestServer::spawn().await;
    let client = no_redirect_client();
    let token = srv.token_for("op@example.com", Some(Role::Operator));
    // Well-formed id of a warehouse that does not exist: foreign key violation.
    let unknown = WarehouseId::new().to_string();

    let res = client
        .post(srv.url("/movements"))
        .header(header::COOKIE, format!("oilstock_at={token}"))
        .form(&[("warehouse_id", unknown.as_str()), ("units", "1"), ("filter", "all")])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    let html = res.text().await.unwrap();
    assert!(html.contains(r#"<p class="alert error" role="alert">"#));
    assert!(html.contains("violates foreign key constraint"));

    let res = client
        .post(srv.url("/api/movements"))
        .bearer_auth(&token)
        .json(&json!({ "warehouse_id": unknown, "units": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "backend_rejected");
    assert!(body["message"].as_str().unwrap().contains("foreign key"));

    assert!(srv.backend.movements().is_empty());
}

#[tokio::test]
async fn read_failures_render_page_with_alert() {
    let srv = TestServer::spawn_with(|backend| {
        AppServices::new(
            backend.clone(),
            Arc::new(UnreachableReads(backend)),
            REDIRECT,
            false,
        )
    })
    .await;
    let client = no_redirect_client();
    let token = srv.token_for("op@example.com", Some(Role::Operator));

    let res = client
        .get(srv.url("/"))
        .header(header::COOKIE, format!("oilstock_at={token}"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let html = res.text().await.unwrap();
    assert!(html.contains("Ruolo: operator"));
    assert!(html.contains(READ_FAILURE));
    assert!(html.contains("Nessuna giacenza (registra un carico per iniziare)."));
    // Only "Tutti" is offered when warehouses could not be loaded.
    assert!(html.contains(r#"<option value="all" selected>Tutti</option>"#));
    assert!(!html.contains("Cantina"));

    let res = client
        .get(srv.url("/api/stock"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "backend_unavailable");
}
