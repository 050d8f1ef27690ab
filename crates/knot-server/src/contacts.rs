use axum::Json;
use axum::extract::{Path, Query, State};
use axum::response::Response;
use serde::Deserialize;
use serde_json::json;

use knot_db::{ContactInput, DEFAULT_PER_PAGE};

use crate::AppState;
use crate::error::ApiError;
use crate::response;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub search: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ContactPayload {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    pub user_id: Option<String>,
}

impl ContactPayload {
    fn input(&self) -> ContactInput {
        ContactInput {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DeletePayload {
    pub user_id: Option<String>,
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Response, ApiError> {
    let page = state
        .db
        .list_contacts(
            params.search.as_deref(),
            params.page.unwrap_or(1),
            params.per_page.unwrap_or(DEFAULT_PER_PAGE),
        )
        .await?;
    Ok(response::paginated(page))
}

pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<ContactPayload>,
) -> Result<Response, ApiError> {
    let contact = state
        .db
        .create_contact(&payload.input(), payload.user_id.as_deref())
        .await?;
    let data = state.db.get_contact_with_history(contact.id).await?;
    Ok(response::created("Contact created successfully", data))
}

pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let data = state.db.get_contact_with_history(id).await?;
    Ok(response::ok(data))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<ContactPayload>,
) -> Result<Response, ApiError> {
    let contact = state
        .db
        .update_contact(id, &payload.input(), payload.user_id.as_deref())
        .await?;
    let data = state.db.get_contact_with_history(contact.id).await?;
    Ok(response::ok_message("Contact updated successfully", data))
}

pub async fn destroy(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Option<Json<DeletePayload>>,
) -> Result<Response, ApiError> {
    let user_id = payload.and_then(|Json(body)| body.user_id);
    state.db.delete_contact(id, user_id.as_deref()).await?;
    Ok(response::message_only("Contact deleted successfully"))
}

pub async fn stats(State(state): State<AppState>) -> Result<Response, ApiError> {
    let stats = state.db.contact_stats().await?;
    Ok(response::ok(json!({
        "total_contacts": stats.total_contacts,
        "recent_updates": stats.recent_updates,
        "system_status": "ONLINE",
    })))
}
