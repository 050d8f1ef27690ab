mod auth;
mod config;
mod contacts;
mod error;
mod history;
mod response;

pub use config::ServerConfig;

use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router, middleware};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use knot_db::KnotDb;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<KnotDb>,
    pub api_key: Arc<String>,
}

pub fn router(db: Arc<KnotDb>, api_key: String) -> Router {
    let state = AppState {
        db,
        api_key: Arc::new(api_key),
    };

    let api = Router::new()
        .route("/contacts", get(contacts::list).post(contacts::create))
        .route("/contacts/stats", get(contacts::stats))
        .route(
            "/contacts/:id",
            get(contacts::show)
                .put(contacts::update)
                .delete(contacts::destroy),
        )
        .route("/contacts/:id/history", get(history::for_contact))
        .route("/contact-histories", get(history::list))
        .route("/contact-histories/actions", get(history::actions))
        .route("/contact-histories/stats", get(history::stats))
        .route("/contact-histories/:id", get(history::show))
        .route("/test", get(test_probe))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_api_key,
        ));

    // The browser UI runs on a different origin, so CORS must let the
    // shared-secret header through.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api", api)
        .route("/healthz", get(healthz))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn test_probe() -> Json<serde_json::Value> {
    Json(json!({ "message": "API is working" }))
}

async fn healthz() -> &'static str {
    "ok"
}
