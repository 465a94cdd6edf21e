use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::SharedStore;
use shared_models::auth::AuthUser;
use shared_models::error::AppError;

use crate::models::{
    AdminSite, ChangeList, ChangeListRequest, ModelKind, ModelSummary, ObjectDetail, SiteIndex,
};
use crate::services::changelist::InvalidPage;
use crate::services::ChangeListService;

pub struct AdminState {
    pub config: Arc<AppConfig>,
    pub store: SharedStore,
    pub site: AdminSite,
}

impl AdminState {
    fn change_list_service(&self) -> ChangeListService {
        ChangeListService::new(self.store.clone(), self.config.list_per_page)
    }
}

#[axum::debug_handler]
pub async fn site_index(
    State(state): State<Arc<AdminState>>,
    Extension(user): Extension<AuthUser>,
) -> Json<SiteIndex> {
    let site = &state.site;

    Json(SiteIndex {
        site_header: site.site_header.to_string(),
        site_title: site.site_title.to_string(),
        index_title: site.index_title.to_string(),
        models: site
            .registry
            .iter()
            .map(|admin| ModelSummary {
                name: admin.kind.slug().to_string(),
                verbose_name_plural: admin.kind.verbose_name_plural().to_string(),
                url: admin.url(),
                permissions: admin.permissions(&user),
            })
            .collect(),
    })
}

#[axum::debug_handler]
pub async fn change_list(
    State(state): State<Arc<AdminState>>,
    Extension(user): Extension<AuthUser>,
    Path(model): Path<String>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Result<Json<ChangeList>, AppError> {
    let kind: ModelKind = model.parse()?;
    let admin = state.site.model_admin(kind)?;
    let request = ChangeListRequest::parse(admin, &params, Utc::now().date_naive())?;

    debug!("User {} listing {} with {:?}", user.id, kind.slug(), params);

    let change_list = state
        .change_list_service()
        .change_list(admin, request, &user)
        .await
        .map_err(|e| match e.downcast_ref::<InvalidPage>() {
            Some(invalid) => AppError::BadRequest(invalid.to_string()),
            None => AppError::Database(e.to_string()),
        })?;

    Ok(Json(change_list))
}

#[axum::debug_handler]
pub async fn object_detail(
    State(state): State<Arc<AdminState>>,
    Extension(user): Extension<AuthUser>,
    Path((model, object_id)): Path<(String, String)>,
) -> Result<Json<ObjectDetail>, AppError> {
    let kind: ModelKind = model.parse()?;
    let admin = state.site.model_admin(kind)?;
    let not_found = || AppError::NotFound(format!("{} with id '{}' does not exist", kind.slug(), object_id));

    let id = Uuid::parse_str(&object_id).map_err(|_| not_found())?;

    let detail = state
        .change_list_service()
        .detail(admin, id, &user)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .ok_or_else(not_found)?;

    Ok(Json(detail))
}

#[axum::debug_handler]
pub async fn refuse_add(
    State(state): State<Arc<AdminState>>,
    Extension(user): Extension<AuthUser>,
    Path(model): Path<String>,
) -> Result<Json<()>, AppError> {
    let kind: ModelKind = model.parse()?;
    let admin = state.site.model_admin(kind)?;

    if !admin.has_add_permission(&user) {
        warn!("Refused add of {} for user {}", kind.slug(), user.id);
        return Err(AppError::Forbidden(format!(
            "{} cannot be added from the dashboard", kind.verbose_name_plural()
        )));
    }
    Err(AppError::BadRequest("The dashboard has no write path".to_string()))
}

#[axum::debug_handler]
pub async fn refuse_delete(
    State(state): State<Arc<AdminState>>,
    Extension(user): Extension<AuthUser>,
    Path((model, object_id)): Path<(String, String)>,
) -> Result<Json<()>, AppError> {
    let kind: ModelKind = model.parse()?;
    let admin = state.site.model_admin(kind)?;

    if !admin.has_delete_permission(&user, None) {
        warn!("Refused delete of {} {} for user {}", kind.slug(), object_id, user.id);
        return Err(AppError::Forbidden(format!(
            "{} cannot be deleted from the dashboard", kind.verbose_name_plural()
        )));
    }
    Err(AppError::BadRequest("The dashboard has no write path".to_string()))
}

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

/// Landing point of the staff redirect. Sessions are issued elsewhere, so this
/// only tells the caller how to present credentials.
pub async fn login_prompt(Query(query): Query<LoginQuery>) -> AppError {
    debug!("Login prompt for {:?}", query.next);
    AppError::Auth(
        "Staff credentials required: send a bearer token or an access_token cookie".to_string(),
    )
}
