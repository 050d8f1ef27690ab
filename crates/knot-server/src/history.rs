use axum::extract::{Path, Query, State};
use axum::response::Response;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;

use knot_db::{DEFAULT_PER_PAGE, HistoryFilter};

use crate::AppState;
use crate::error::ApiError;
use crate::response;

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub search: Option<String>,
    pub action: Option<String>,
    pub contact_id: Option<String>,
    pub user_id: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl HistoryParams {
    // Empty query values mean "filter not set"; malformed dates and ids are
    // ignored the same way.
    fn filter(&self) -> HistoryFilter {
        HistoryFilter {
            search: non_empty(self.search.as_deref()),
            action: non_empty(self.action.as_deref()),
            contact_id: self
                .contact_id
                .as_deref()
                .and_then(|raw| raw.trim().parse().ok()),
            user_id: non_empty(self.user_id.as_deref()),
            date_from: parse_date(self.date_from.as_deref()),
            date_to: parse_date(self.date_to.as_deref()),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn parse_date(value: Option<&str>) -> Option<NaiveDate> {
    value.and_then(|raw| NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok())
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> Result<Response, ApiError> {
    let page = state
        .db
        .list_history(
            &params.filter(),
            params.page.unwrap_or(1),
            params.per_page.unwrap_or(DEFAULT_PER_PAGE),
        )
        .await?;
    Ok(response::paginated(page))
}

pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let entry = state.db.get_history_entry(id).await?;
    Ok(response::ok(entry))
}

pub async fn for_contact(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let contact = state.db.get_contact(id).await?;
    let histories = state.db.history_for_contact(id).await?;
    Ok(response::ok(json!({
        "contact": contact,
        "histories": histories,
    })))
}

pub async fn actions() -> Response {
    response::ok(knot_db::actions::all())
}

pub async fn stats(State(state): State<AppState>) -> Result<Response, ApiError> {
    let stats = state.db.history_stats().await?;
    Ok(response::ok(stats))
}
