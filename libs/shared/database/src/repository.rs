use std::collections::{HashMap, HashSet};

use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;
use serde_json::Value;
use uuid::Uuid;

use shared_models::{Appointment, Doctor, Entity, Room, User};

use crate::query::{Filter, OrderBy, Query};
use crate::store::EntityStore;

pub async fn fetch<E: Entity>(store: &dyn EntityStore, query: &Query) -> Result<Vec<E>> {
    store
        .select(E::TABLE, query)
        .await?
        .into_iter()
        .map(|row| serde_json::from_value(row).map_err(anyhow::Error::from))
        .collect()
}

/// PostgREST's default `db-max-rows`; larger responses are cut short without error.
pub const MAX_ROWS_PER_REQUEST: usize = 1000;

/// Every row matching `query`, read in pages until the exact count is reached.
/// Falls back to ordering by `id` so pages never overlap.
pub async fn select_all(store: &dyn EntityStore, table: &str, query: &Query) -> Result<Vec<Value>> {
    let total = store.count(table, query).await? as usize;

    let mut paged = query.clone();
    if paged.order.is_empty() {
        paged.order.push(OrderBy::asc("id"));
    }

    let mut rows = Vec::with_capacity(total);
    while rows.len() < total {
        let page_query = paged.clone().offset(rows.len()).limit(MAX_ROWS_PER_REQUEST);
        let page = store.select(table, &page_query).await?;
        if page.is_empty() {
            break;
        }
        rows.extend(page);
    }

    debug!("Read {} of {} {} rows", rows.len(), total, table);
    Ok(rows)
}

/// `Ok(None)` when no record carries `id`.
pub async fn get_by_id<E: Entity>(store: &dyn EntityStore, id: Uuid) -> Result<Option<E>> {
    let query = Query::new().filter(Filter::in_ids("id", [id])).limit(1);
    let mut records = fetch::<E>(store, &query).await?;

    if records.is_empty() {
        debug!("No {} record with id {}", E::TABLE, id);
        return Ok(None);
    }
    Ok(Some(records.swap_remove(0)))
}

/// One `id in (...)` query; an empty id set skips the round trip.
pub async fn fetch_by_ids<E: Entity>(
    store: &dyn EntityStore,
    ids: &HashSet<Uuid>,
) -> Result<HashMap<Uuid, E>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let query = Query::new().filter(Filter::in_ids("id", ids.iter().copied()));
    let records = fetch::<E>(store, &query).await?;
    debug!("Batch loaded {} of {} {} records", records.len(), ids.len(), E::TABLE);

    Ok(records.into_iter().map(|record| (record.id(), record)).collect())
}

/// Resolves an appointment's references; a dangling id yields `None`.
#[async_trait]
pub trait AppointmentRelations {
    async fn get_doctor(&self, store: &dyn EntityStore) -> Result<Option<Doctor>>;
    async fn get_user(&self, store: &dyn EntityStore) -> Result<Option<User>>;
    async fn get_room(&self, store: &dyn EntityStore) -> Result<Option<Room>>;
}

#[async_trait]
impl AppointmentRelations for Appointment {
    async fn get_doctor(&self, store: &dyn EntityStore) -> Result<Option<Doctor>> {
        get_by_id(store, self.doctor_id).await
    }

    async fn get_user(&self, store: &dyn EntityStore) -> Result<Option<User>> {
        get_by_id(store, self.user_id).await
    }

    async fn get_room(&self, store: &dyn EntityStore) -> Result<Option<Room>> {
        get_by_id(store, self.room_id).await
    }
}
