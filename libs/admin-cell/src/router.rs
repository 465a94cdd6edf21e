use std::sync::Arc;

use axum::{
    Router,
    routing::get,
    middleware,
};

use shared_config::AppConfig;
use shared_database::SharedStore;
use shared_utils::extractor::staff_member_required;

use crate::handlers::{self, AdminState};
use crate::services::medical_admin_site;

pub fn admin_routes(config: Arc<AppConfig>, store: SharedStore) -> Router {
    let state = Arc::new(AdminState {
        config: config.clone(),
        store,
        site: medical_admin_site(),
    });

    Router::new()
        .route("/", get(handlers::site_index))
        .route("/{model}/", get(handlers::change_list))
        .route("/{model}/add/", get(handlers::refuse_add).post(handlers::refuse_add))
        .route("/{model}/{object_id}/", get(handlers::object_detail))
        .route("/{model}/{object_id}/change/", get(handlers::object_detail))
        .route(
            "/{model}/{object_id}/delete/",
            get(handlers::refuse_delete).post(handlers::refuse_delete),
        )
        .layer(middleware::from_fn_with_state(config, staff_member_required))
        .route("/login/", get(handlers::login_prompt))
        .with_state(state)
}
