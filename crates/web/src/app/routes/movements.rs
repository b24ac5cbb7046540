//! Recording inventory movements from the dashboard form or the JSON API.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Form, Json,
};
use thiserror::Error;

use oilstock_auth::AuthzError;
use oilstock_core::DomainError;
use oilstock_infra::BackendError;
use oilstock_inventory::{MovementDraft, NewMovement, WarehouseFilter};

use crate::app::dto::{MovementForm, MovementRecorded, MovementRequest};
use crate::app::errors;
use crate::app::routes::stock;
use crate::app::services::AppServices;
use crate::app::views::{self, Alert, MovementFormState};
use crate::authz::authorize_movement;
use crate::context::SessionContext;

const NOT_ALLOWED: &str = "Il tuo ruolo non consente di registrare movimenti.";

#[derive(Debug, Error)]
pub(crate) enum RecordError {
    #[error(transparent)]
    Forbidden(#[from] AuthzError),

    #[error(transparent)]
    Invalid(#[from] DomainError),

    /// No warehouse selected, or no product for (year, lot, size).
    #[error("warehouse or product not found")]
    Unresolved,

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl RecordError {
    fn status(&self) -> StatusCode {
        match self {
            RecordError::Forbidden(_) => StatusCode::FORBIDDEN,
            RecordError::Invalid(_) => StatusCode::BAD_REQUEST,
            RecordError::Unresolved => StatusCode::UNPROCESSABLE_ENTITY,
            RecordError::Backend(e) => errors::backend_status(e),
        }
    }

    fn user_message(&self) -> String {
        match self {
            RecordError::Forbidden(_) => NOT_ALLOWED.to_string(),
            RecordError::Invalid(e) => e.to_string(),
            RecordError::Unresolved => views::SELECT_WAREHOUSE_AND_PRODUCT.to_string(),
            RecordError::Backend(e) => e.user_message(),
        }
    }

    fn into_json_response(self) -> Response {
        match self {
            RecordError::Forbidden(e) => errors::authz_error_to_response(e),
            RecordError::Invalid(e) => errors::domain_error_to_response(e),
            RecordError::Unresolved => errors::json_error(
                StatusCode::UNPROCESSABLE_ENTITY,
                "unresolved",
                "warehouse or product not found",
            ),
            RecordError::Backend(e) => errors::backend_error_to_response(e),
        }
    }
}

/// Validate, resolve the product and insert one ledger row.
///
/// The caller must already have passed [`authorize_movement`].
pub(crate) async fn record(
    services: &AppServices,
    session: &SessionContext,
    draft: MovementDraft,
) -> Result<NewMovement, RecordError> {
    draft.quantity_ml()?;
    if draft.warehouse_id.is_none() {
        return Err(RecordError::Unresolved);
    }

    let token = session.access_token();
    let product_id = services
        .store
        .find_product(token, &draft.product)
        .await?
        .ok_or(RecordError::Unresolved)?;

    let movement = draft.into_new_movement(product_id, session.user().id)?;
    services.store.record_movement(token, &movement).await?;
    Ok(movement)
}

/// `POST /movements` from the dashboard form.
pub async fn submit_form(
    Extension(services): Extension<Arc<AppServices>>,
    session: Option<Extension<SessionContext>>,
    Form(form): Form<MovementForm>,
) -> Response {
    let Some(Extension(session)) = session else {
        return Redirect::to("/").into_response();
    };
    let filter = WarehouseFilter::from_param(Some(&form.filter));

    let outcome = match authorize_movement(&session) {
        Ok(()) => match form.to_draft() {
            Ok(draft) => record(&services, &session, draft).await,
            Err(e) => Err(e.into()),
        },
        Err(e) => Err(e.into()),
    };

    match outcome {
        Ok(_) => {
            let target = format!(
                "/?warehouse={}&notice=recorded",
                urlencoding::encode(filter.as_param())
            );
            Redirect::to(&target).into_response()
        }
        Err(e) => {
            tracing::info!(error = %e, user_id = %session.user().id, "movement not recorded");
            let mut data = stock::load_dashboard(&services, &session, &filter).await;
            data.alerts.insert(0, Alert::error(e.user_message()));
            let form_state = MovementFormState::from_submitted(&form);
            (e.status(), stock::render_dashboard(&session, &data, &filter, &form_state)).into_response()
        }
    }
}

/// `POST /api/movements`: 201 with the signed quantity.
pub async fn api_record(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    body: Result<Json<MovementRequest>, JsonRejection>,
) -> Response {
    if let Err(e) = authorize_movement(&session) {
        return errors::authz_error_to_response(e);
    }
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "validation_error", rejection.body_text());
        }
    };

    match record(&services, &session, request.into_draft()).await {
        Ok(movement) => (
            StatusCode::CREATED,
            Json(MovementRecorded {
                quantity_ml: movement.quantity_ml,
            }),
        )
            .into_response(),
        Err(e) => e.into_json_response(),
    }
}
