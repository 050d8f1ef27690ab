use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use knot_db::DbError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Db(#[from] DbError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let ApiError::Db(err) = self;
        match err {
            DbError::ValidationFailed(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({
                    "success": false,
                    "message": "Validation failed",
                    "errors": errors,
                })),
            )
                .into_response(),
            DbError::ContactNotFound(_) => not_found("Contact not found"),
            DbError::HistoryEntryNotFound(_) => not_found("History entry not found"),
            err => {
                tracing::error!("storage error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "success": false,
                        "message": "Internal server error",
                    })),
                )
                    .into_response()
            }
        }
    }
}

fn not_found(message: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "success": false, "message": message })),
    )
        .into_response()
}
