use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::State,
    http::{header, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use tracing::Instrument;
use uuid::Uuid;

use oilstock_auth::{AccessToken, AuthUser, Role, Session};
use oilstock_infra::BackendError;

use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::SessionContext;
use crate::cookies::{self, Credentials};

/// Wrap each request in a span with a request id and log its outcome.
pub async fn request_tracing(req: Request<axum::body::Body>, next: Next) -> Response {
    let request_id = Uuid::now_v7().to_string();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let span = tracing::info_span!("http.request", request_id = %request_id, method = %method, path = %path);

    let started = Instant::now();
    let mut response = next.run(req).instrument(span.clone()).await;
    span.in_scope(|| {
        tracing::info!(
            status = response.status().as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "request completed"
        );
    });

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

/// Outcome of resolving the request's credentials.
struct Resolved {
    context: SessionContext,
    /// Set when the access token had to be refreshed.
    refreshed: Option<Session>,
}

/// Resolve the caller's session, if any, and expose it as [`SessionContext`].
///
/// An expired access token is refreshed once using the refresh cookie and the
/// new tokens are written back. Unusable browser sessions are cleared; the
/// request then proceeds anonymously.
pub async fn session_middleware(
    State(services): State<Arc<AppServices>>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let Some(credentials) = Credentials::from_headers(req.headers()) else {
        return next.run(req).await;
    };

    match resolve(&services, &credentials).await {
        Ok(resolved) => {
            req.extensions_mut().insert(resolved.context);
            let mut response = next.run(req).await;
            // Handlers that set cookies themselves (link confirmation, sign-out) win.
            let handler_set_cookies = response.headers().contains_key(header::SET_COOKIE);
            if let (Some(session), false, false) = (resolved.refreshed, credentials.from_bearer, handler_set_cookies) {
                cookies::append_set_cookies(
                    response.headers_mut(),
                    cookies::session_cookies(&session, Utc::now(), services.secure_cookies),
                );
            }
            response
        }
        Err(e) => {
            tracing::info!(error = %e, "session could not be resolved");
            let mut response = next.run(req).await;
            // Keep the cookies when the backend was merely unreachable.
            if is_rejection(&e) && !credentials.from_bearer && !response.headers().contains_key(header::SET_COOKIE) {
                cookies::append_set_cookies(
                    response.headers_mut(),
                    cookies::cleared_cookies(services.secure_cookies),
                );
            }
            response
        }
    }
}

async fn resolve(services: &AppServices, credentials: &Credentials) -> Result<Resolved, BackendError> {
    let current = match &credentials.access {
        Some(token) => match services.auth.current_user(token).await {
            Ok(user) => Some((user, token.clone())),
            Err(BackendError::Unauthorized) => None,
            // Expired or invalid JWTs may also come back as 403 or another rejection.
            Err(e) if is_rejection(&e) && credentials.refresh.is_some() => {
                tracing::debug!(error = %e, "access token rejected, trying refresh");
                None
            }
            Err(e) => return Err(e),
        },
        None => None,
    };

    let (user, token, refreshed) = match current {
        Some((user, token)) => (user, token, None),
        None => {
            let refresh = credentials.refresh.as_ref().ok_or(BackendError::Unauthorized)?;
            let session = services.auth.refresh_session(refresh).await?;
            tracing::debug!("access token refreshed");
            (session.user.clone(), session.access_token.clone(), Some(session))
        }
    };

    let role = lookup_role(services, &user, &token).await;
    Ok(Resolved {
        context: SessionContext::new(user, role, token),
        refreshed,
    })
}

/// The backend answered and refused the credentials.
fn is_rejection(e: &BackendError) -> bool {
    matches!(
        e,
        BackendError::Unauthorized | BackendError::Forbidden(_) | BackendError::Rejected { .. }
    )
}

/// Role lookup failures degrade to "no role" rather than failing the request.
async fn lookup_role(
    services: &AppServices,
    user: &AuthUser,
    token: &AccessToken,
) -> Option<Role> {
    match services.store.role_of(token, user.id).await {
        Ok(role) => role,
        Err(e) => {
            tracing::warn!(error = %e, user_id = %user.id, "role lookup failed");
            None
        }
    }
}

/// Reject API requests that carry no resolvable session.
pub async fn require_session(req: Request<axum::body::Body>, next: Next) -> Response {
    if req.extensions().get::<SessionContext>().is_none() {
        return errors::json_error(StatusCode::UNAUTHORIZED, "unauthorized", "sign in required");
    }
    next.run(req).await
}
