use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::json;

use knot_db::Page;

pub fn ok<T: Serialize>(data: T) -> Response {
    (
        StatusCode::OK,
        Json(json!({ "success": true, "data": data })),
    )
        .into_response()
}

pub fn ok_message<T: Serialize>(message: &str, data: T) -> Response {
    (
        StatusCode::OK,
        Json(json!({ "success": true, "message": message, "data": data })),
    )
        .into_response()
}

pub fn created<T: Serialize>(message: &str, data: T) -> Response {
    (
        StatusCode::CREATED,
        Json(json!({ "success": true, "message": message, "data": data })),
    )
        .into_response()
}

pub fn message_only(message: &str) -> Response {
    (
        StatusCode::OK,
        Json(json!({ "success": true, "message": message })),
    )
        .into_response()
}

pub fn paginated<T: Serialize>(page: Page<T>) -> Response {
    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "data": page.items,
            "pagination": {
                "current_page": page.current_page,
                "last_page": page.last_page,
                "per_page": page.per_page,
                "total": page.total,
            },
        })),
    )
        .into_response()
}
