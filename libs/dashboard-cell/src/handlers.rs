use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    Json,
};
use chrono::Utc;
use tracing::debug;

use shared_database::SharedStore;
use shared_models::auth::AuthUser;
use shared_models::error::AppError;

use crate::models::DashboardStats;
use crate::services::StatsService;

pub struct DashboardState {
    pub store: SharedStore,
}

#[axum::debug_handler]
pub async fn dashboard_stats(
    State(state): State<Arc<DashboardState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<DashboardStats>, AppError> {
    debug!("Dashboard stats requested by {}", user.id);

    let stats = StatsService::new(state.store.clone())
        .get_dashboard_stats(Utc::now().date_naive())
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    Ok(Json(stats))
}
