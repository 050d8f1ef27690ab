use axum::Json;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::AppState;

pub const API_KEY_HEADER: &str = "knotapi";

pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(value) = request.headers().get(API_KEY_HEADER) else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "success": false,
                "message": format!(
                    "Header missing! The required header \"{API_KEY_HEADER}\" is not present in the request."
                ),
                "error": "HEADER_MISSING",
                "required_header": API_KEY_HEADER,
            })),
        )
            .into_response();
    };

    if value.to_str().ok() != Some(state.api_key.as_str()) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "success": false,
                "message": format!(
                    "Not authorised! Invalid API key provided in \"{API_KEY_HEADER}\" header."
                ),
                "error": "INVALID_API_KEY",
                "header_name": API_KEY_HEADER,
            })),
        )
            .into_response();
    }

    next.run(request).await
}
