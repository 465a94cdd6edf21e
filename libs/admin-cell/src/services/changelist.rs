use std::collections::BTreeSet;

use anyhow::{anyhow, Result};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use shared_database::query::{OrderBy, Query};
use shared_database::repository::{get_by_id, select_all, MAX_ROWS_PER_REQUEST};
use shared_database::{EntityStore, SharedStore};
use shared_models::auth::AuthUser;
use shared_models::{Appointment, Doctor, Entity, Room, User};

use crate::models::{
    ChangeList, ChangeListRequest, ChangeListRow, ColumnHeader, DatePreset, FilterChoices,
    FilterKind, ListColumn, ModelAdmin, ModelKind, ObjectDetail,
};
use crate::services::enrichment::AppointmentEnrichment;
use crate::services::registry::{DOCTOR_LABEL_COLUMN, PATIENT_LABEL_COLUMN, ROOM_LABEL_COLUMN};

/// Builds list and detail payloads for a registration.
pub struct ChangeListService {
    store: SharedStore,
    per_page: usize,
}

impl ChangeListService {
    /// `per_page` is clamped to what one store response can carry.
    pub fn new(store: SharedStore, per_page: usize) -> Self {
        Self {
            store,
            per_page: per_page.clamp(1, MAX_ROWS_PER_REQUEST),
        }
    }

    pub async fn change_list(
        &self,
        admin: &ModelAdmin,
        request: ChangeListRequest,
        user: &AuthUser,
    ) -> Result<ChangeList> {
        let table = admin.kind.table();
        let mut order = request.order.clone();
        if !order.iter().any(|o| o.column == "id") {
            order.push(OrderBy::desc("id"));
        }

        let mut query = Query::new().search(request.search.clone());
        query.filters = request.filters.clone();
        query.order = order;

        let result_count = self.store.count(table, &query).await?;
        let full_result_count = self.store.count(table, &Query::new()).await?;
        let num_pages = (result_count as usize).div_ceil(self.per_page).max(1);

        if request.page >= num_pages {
            return Err(anyhow!(InvalidPage(request.page)));
        }

        let query = query
            .offset(request.page * self.per_page)
            .limit(self.per_page);
        let rows = self.store.select(table, &query).await?;
        debug!("Rendering page {} of {} ({} rows)", request.page, table, rows.len());

        let rows = match admin.kind {
            ModelKind::Doctor => render_rows::<Doctor>(admin, rows)?,
            ModelKind::User => render_rows::<User>(admin, rows)?,
            ModelKind::Room => render_rows::<Room>(admin, rows)?,
            ModelKind::Appointment => self.render_appointments(admin, rows).await?,
        };

        Ok(ChangeList {
            model: admin.kind.slug().to_string(),
            verbose_name_plural: admin.kind.verbose_name_plural().to_string(),
            columns: admin
                .list_display
                .iter()
                .map(|column| ColumnHeader {
                    field: column.name().to_string(),
                    label: column.label(),
                    sortable: column.is_sortable(),
                })
                .collect(),
            rows,
            result_count,
            full_result_count,
            page: request.page,
            num_pages,
            per_page: self.per_page,
            filters: self.filter_choices(admin).await?,
            search_fields: admin.search_fields.iter().map(|f| f.to_string()).collect(),
            search: request.search_text,
            ordering: request
                .order
                .iter()
                .map(|o| if o.descending { format!("-{}", o.column) } else { o.column.clone() })
                .collect(),
            date_hierarchy: admin.date_hierarchy.map(str::to_string),
            permissions: admin.permissions(user),
        })
    }

    /// `Ok(None)` when the record does not exist.
    pub async fn detail(
        &self,
        admin: &ModelAdmin,
        id: Uuid,
        user: &AuthUser,
    ) -> Result<Option<ObjectDetail>> {
        let store = self.store.as_ref();
        let loaded = match admin.kind {
            ModelKind::Doctor => load_detail::<Doctor>(store, id).await?,
            ModelKind::User => load_detail::<User>(store, id).await?,
            ModelKind::Room => load_detail::<Room>(store, id).await?,
            ModelKind::Appointment => load_detail::<Appointment>(store, id).await?,
        };

        Ok(loaded.map(|(display, fields)| ObjectDetail {
            model: admin.kind.slug().to_string(),
            id,
            display,
            fields,
            readonly_fields: admin.readonly_fields.iter().map(|f| f.to_string()).collect(),
            permissions: admin.permissions(user),
        }))
    }

    async fn render_appointments(
        &self,
        admin: &ModelAdmin,
        rows: Vec<Value>,
    ) -> Result<Vec<ChangeListRow>> {
        let appointments: Vec<Appointment> = rows
            .iter()
            .cloned()
            .map(serde_json::from_value)
            .collect::<Result<_, _>>()?;

        let cache = AppointmentEnrichment::load(self.store.as_ref(), &appointments).await?;

        Ok(appointments
            .iter()
            .zip(rows.iter())
            .map(|(appointment, row)| ChangeListRow {
                id: appointment.id,
                display: appointment.to_string(),
                values: admin
                    .list_display
                    .iter()
                    .map(|column| match column.name() {
                        DOCTOR_LABEL_COLUMN => Value::String(cache.doctor_label(appointment)),
                        PATIENT_LABEL_COLUMN => Value::String(cache.patient_label(appointment)),
                        ROOM_LABEL_COLUMN => Value::String(cache.room_label(appointment)),
                        field => row.get(field).cloned().unwrap_or(Value::Null),
                    })
                    .collect(),
            })
            .collect())
    }

    async fn filter_choices(&self, admin: &ModelAdmin) -> Result<Vec<FilterChoices>> {
        let mut filters = Vec::with_capacity(admin.list_filter.len());

        for list_filter in admin.list_filter {
            let choices = match list_filter.kind {
                FilterKind::Boolean => vec!["true".to_string(), "false".to_string()],
                FilterKind::Date => DatePreset::ALL.iter().map(|p| p.slug().to_string()).collect(),
                FilterKind::Choices => {
                    let query = Query::new().columns(&[list_filter.field]);
                    let rows = select_all(self.store.as_ref(), admin.kind.table(), &query).await?;
                    let distinct: BTreeSet<String> = rows
                        .iter()
                        .filter_map(|row| row.get(list_filter.field))
                        .filter_map(|value| value.as_str().map(str::to_string))
                        .collect();
                    distinct.into_iter().collect()
                }
            };

            filters.push(FilterChoices {
                field: list_filter.field.to_string(),
                kind: list_filter.kind,
                choices,
            });
        }

        Ok(filters)
    }
}

/// Page index past the last page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Invalid page {0}")]
pub struct InvalidPage(pub usize);

fn render_rows<E: Entity>(admin: &ModelAdmin, rows: Vec<Value>) -> Result<Vec<ChangeListRow>> {
    rows.into_iter()
        .map(|row| -> Result<ChangeListRow> {
            let record: E = serde_json::from_value(row.clone())?;
            Ok(ChangeListRow {
                id: record.id(),
                display: record.to_string(),
                values: admin
                    .list_display
                    .iter()
                    .map(|column| match column {
                        ListColumn::Field(field) => row.get(*field).cloned().unwrap_or(Value::Null),
                        ListColumn::Computed { .. } => Value::Null,
                    })
                    .collect(),
            })
        })
        .collect()
}

async fn load_detail<E: Entity>(store: &dyn EntityStore, id: Uuid) -> Result<Option<(String, Value)>> {
    match get_by_id::<E>(store, id).await? {
        Some(record) => Ok(Some((record.to_string(), serde_json::to_value(&record)?))),
        None => Ok(None),
    }
}
