//! Email-link sign-in, link confirmation and sign-out.

use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use chrono::Utc;

use oilstock_auth::EmailAddress;

use crate::app::dto::{ConfirmQuery, SignInForm};
use crate::app::errors;
use crate::app::services::AppServices;
use crate::app::views::{self, Alert};
use crate::context::SessionContext;
use crate::cookies;

/// Link type used when the emailed link does not say.
const DEFAULT_LINK_TYPE: &str = "email";

pub async fn sign_in(
    Extension(services): Extension<Arc<AppServices>>,
    Form(form): Form<SignInForm>,
) -> Response {
    let email = match EmailAddress::parse(&form.email) {
        Ok(email) => email,
        Err(e) => {
            let page = views::sign_in_page(&[Alert::error(e.to_string())], &form.email);
            return (StatusCode::BAD_REQUEST, Html(page)).into_response();
        }
    };

    match services.auth.send_sign_in_link(&email, &services.sign_in_redirect).await {
        Ok(()) => Html(views::sign_in_page(&[Alert::info(views::LINK_SENT)], email.as_str())).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "sign-in link could not be sent");
            let page = views::sign_in_page(&[Alert::error(e.user_message())], email.as_str());
            (errors::backend_status(&e), Html(page)).into_response()
        }
    }
}

/// Landing page of the emailed link: trade the token for a session cookie.
pub async fn confirm(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<ConfirmQuery>,
) -> Response {
    let Some(token_hash) = query.token_hash.as_deref().filter(|t| !t.trim().is_empty()) else {
        let page = views::sign_in_page(&[Alert::error("Link di accesso non valido.")], "");
        return (StatusCode::BAD_REQUEST, Html(page)).into_response();
    };
    let link_type = query.link_type.as_deref().unwrap_or(DEFAULT_LINK_TYPE);

    match services.auth.verify_sign_in_link(token_hash, link_type).await {
        Ok(session) => {
            tracing::info!(user_id = %session.user.id, "signed in");
            let mut response = Redirect::to("/").into_response();
            cookies::append_set_cookies(
                response.headers_mut(),
                cookies::session_cookies(&session, Utc::now(), services.secure_cookies),
            );
            response
        }
        Err(e) => {
            tracing::warn!(error = %e, "sign-in link rejected");
            let page = views::sign_in_page(&[Alert::error(e.user_message())], "");
            (errors::backend_status(&e), Html(page)).into_response()
        }
    }
}

/// Revoke the session (best effort) and drop the cookies.
pub async fn sign_out(
    Extension(services): Extension<Arc<AppServices>>,
    session: Option<Extension<SessionContext>>,
) -> Response {
    if let Some(Extension(session)) = session {
        if let Err(e) = services.auth.sign_out(session.access_token()).await {
            tracing::warn!(error = %e, "remote sign-out failed");
        }
        tracing::info!(user_id = %session.user().id, "signed out");
    }

    let mut response = Redirect::to("/").into_response();
    cookies::append_set_cookies(response.headers_mut(), cookies::cleared_cookies(services.secure_cookies));
    response
}
