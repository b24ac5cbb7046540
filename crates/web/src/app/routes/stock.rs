//! Stock dashboard and the read-only JSON endpoints.

use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    response::{Html, IntoResponse, Response},
    Json,
};

use oilstock_inventory::{StockRow, Warehouse, WarehouseFilter};

use crate::app::dto::StockQuery;
use crate::app::errors;
use crate::app::services::AppServices;
use crate::app::views::{self, Alert, Dashboard, MovementFormState};
use crate::context::SessionContext;

const NOTICE_RECORDED: &str = "recorded";

/// Data behind the dashboard; read failures become alerts with empty data.
pub(crate) struct DashboardData {
    pub warehouses: Vec<Warehouse>,
    pub stock: Vec<StockRow>,
    pub alerts: Vec<Alert>,
}

pub(crate) async fn load_dashboard(
    services: &AppServices,
    session: &SessionContext,
    filter: &WarehouseFilter,
) -> DashboardData {
    let token = session.access_token();
    let mut alerts = Vec::new();

    let warehouses = services.store.warehouses(token).await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "warehouses could not be loaded");
        alerts.push(Alert::error(e.user_message()));
        Vec::new()
    });
    let stock = services.store.stock(token, filter).await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, %filter, "stock could not be loaded");
        alerts.push(Alert::error(e.user_message()));
        Vec::new()
    });

    DashboardData {
        warehouses,
        stock,
        alerts,
    }
}

pub(crate) fn render_dashboard(
    session: &SessionContext,
    data: &DashboardData,
    filter: &WarehouseFilter,
    form: &MovementFormState,
) -> Html<String> {
    Html(views::dashboard_page(&Dashboard {
        session,
        warehouses: &data.warehouses,
        stock: &data.stock,
        filter,
        form,
        alerts: &data.alerts,
    }))
}

pub async fn home(
    Extension(services): Extension<Arc<AppServices>>,
    session: Option<Extension<SessionContext>>,
    Query(query): Query<StockQuery>,
) -> Response {
    let Some(Extension(session)) = session else {
        return Html(views::sign_in_page(&[], "")).into_response();
    };

    let filter = WarehouseFilter::from_param(query.warehouse.as_deref());
    let mut data = load_dashboard(&services, &session, &filter).await;
    if query.notice.as_deref() == Some(NOTICE_RECORDED) {
        data.alerts.insert(0, Alert::info(views::MOVEMENT_RECORDED));
    }

    render_dashboard(&session, &data, &filter, &MovementFormState::default()).into_response()
}

pub async fn api_warehouses(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
) -> Response {
    match services.store.warehouses(session.access_token()).await {
        Ok(list) => Json(list).into_response(),
        Err(e) => errors::backend_error_to_response(e),
    }
}

pub async fn api_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Query(query): Query<StockQuery>,
) -> Response {
    let filter = WarehouseFilter::from_param(query.warehouse.as_deref());
    match services.store.stock(session.access_token(), &filter).await {
        Ok(rows) => Json(rows).into_response(),
        Err(e) => errors::backend_error_to_response(e),
    }
}
