use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use admin_cell::router::admin_routes;
use dashboard_cell::router::dashboard_routes;
use shared_config::AppConfig;
use shared_database::SharedStore;

pub fn create_router(state: Arc<AppConfig>, store: SharedStore) -> Router {
    Router::new()
        .route("/", get(|| async { "Medical Dashboard API is running!" }))
        .nest("/admin", admin_routes(state.clone(), store.clone()))
        .nest("/dashboard", dashboard_routes(state, store))
}
