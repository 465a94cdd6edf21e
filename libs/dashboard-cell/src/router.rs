use std::sync::Arc;

use axum::{
    Router,
    routing::get,
    middleware,
};

use shared_config::AppConfig;
use shared_database::SharedStore;
use shared_utils::extractor::staff_member_required;

use crate::handlers::{self, DashboardState};

pub fn dashboard_routes(config: Arc<AppConfig>, store: SharedStore) -> Router {
    let state = Arc::new(DashboardState { store });

    Router::new()
        .route("/stats/", get(handlers::dashboard_stats))
        .route("/stats", get(handlers::dashboard_stats))
        .layer(middleware::from_fn_with_state(config, staff_member_required))
        .with_state(state)
}
