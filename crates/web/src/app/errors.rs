use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use oilstock_auth::AuthzError;
use oilstock_core::DomainError;
use oilstock_infra::BackendError;

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// HTTP status used for a failed backend call, for both pages and JSON.
pub fn backend_status(err: &BackendError) -> StatusCode {
    match err {
        BackendError::Unauthorized => StatusCode::UNAUTHORIZED,
        BackendError::Forbidden(_) => StatusCode::FORBIDDEN,
        BackendError::Rejected { .. }
        | BackendError::MultipleRows(_)
        | BackendError::Transport(_)
        | BackendError::Decode(_) => StatusCode::BAD_GATEWAY,
    }
}

pub fn backend_error_to_response(err: BackendError) -> axum::response::Response {
    let code = match &err {
        BackendError::Unauthorized => "unauthorized",
        BackendError::Forbidden(_) => "forbidden",
        BackendError::Rejected { .. } => "backend_rejected",
        BackendError::MultipleRows(_) => "ambiguous_result",
        BackendError::Transport(_) => "backend_unavailable",
        BackendError::Decode(_) => "backend_decode_error",
    };
    json_error(backend_status(&err), code, err.user_message())
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "validation_error", err.to_string())
}

pub fn authz_error_to_response(err: AuthzError) -> axum::response::Response {
    json_error(StatusCode::FORBIDDEN, "forbidden", err.to_string())
}
