use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

use shared_models::Entity;

use crate::query::{render_value, Filter, FilterOp, Query, Search};
use crate::store::EntityStore;

/// Store backed by in-process rows, evaluating [`Query`] the way PostgREST
/// would. Records every `select` so callers can check query counts.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<HashMap<String, Vec<Value>>>,
    select_log: Mutex<Vec<String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<E: Entity>(&self, record: &E) -> Result<()> {
        let row = serde_json::to_value(record)?;
        self.insert_row(E::TABLE, row)
    }

    pub fn insert_all<E: Entity>(&self, records: &[E]) -> Result<()> {
        records.iter().try_for_each(|record| self.insert(record))
    }

    pub fn insert_row(&self, table: &str, row: Value) -> Result<()> {
        let mut tables = self.tables.write().map_err(|_| anyhow!("store lock poisoned"))?;
        tables.entry(table.to_string()).or_default().push(row);
        Ok(())
    }

    /// Number of `select` calls issued against `table` so far.
    pub fn selects_on(&self, table: &str) -> usize {
        self.select_log
            .lock()
            .map(|log| log.iter().filter(|t| t.as_str() == table).count())
            .unwrap_or(0)
    }

    fn rows(&self, table: &str) -> Result<Vec<Value>> {
        let tables = self.tables.read().map_err(|_| anyhow!("store lock poisoned"))?;
        Ok(tables.get(table).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl EntityStore for InMemoryStore {
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Value>> {
        if let Ok(mut log) = self.select_log.lock() {
            log.push(table.to_string());
        }

        let mut rows: Vec<Value> = self
            .rows(table)?
            .into_iter()
            .filter(|row| query.filters.iter().all(|f| matches_filter(row, f)))
            .filter(|row| query.search.as_ref().map_or(true, |s| matches_search(row, s)))
            .collect();

        // Stable sort: later keys only break ties of earlier ones.
        rows.sort_by(|a, b| {
            query
                .order
                .iter()
                .map(|order| {
                    let ordering = compare_values(field(a, &order.column), field(b, &order.column));
                    if order.descending { ordering.reverse() } else { ordering }
                })
                .find(|ordering| *ordering != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });

        let offset = query.offset.unwrap_or(0);
        let limit = query.limit.unwrap_or(usize::MAX);
        let page = rows.into_iter().skip(offset).take(limit);

        Ok(match &query.columns {
            Some(columns) => page.map(|row| project(&row, columns)).collect(),
            None => page.collect(),
        })
    }

    async fn count(&self, table: &str, query: &Query) -> Result<u64> {
        let count = self
            .rows(table)?
            .iter()
            .filter(|row| query.filters.iter().all(|f| matches_filter(row, f)))
            .filter(|row| query.search.as_ref().map_or(true, |s| matches_search(row, s)))
            .count();
        Ok(count as u64)
    }
}

fn field<'a>(row: &'a Value, column: &str) -> &'a Value {
    row.get(column).unwrap_or(&Value::Null)
}

fn project(row: &Value, columns: &[String]) -> Value {
    let projected: Map<String, Value> = columns
        .iter()
        .map(|column| (column.clone(), field(row, column).clone()))
        .collect();
    Value::Object(projected)
}

fn matches_filter(row: &Value, filter: &Filter) -> bool {
    let value = field(row, &filter.column);
    match &filter.op {
        FilterOp::Eq(expected) => values_equal(value, expected),
        FilterOp::In(candidates) => candidates.iter().any(|c| values_equal(value, c)),
        FilterOp::Gte(bound) => !value.is_null() && compare_values(value, bound) != Ordering::Less,
        FilterOp::Lt(bound) => !value.is_null() && compare_values(value, bound) == Ordering::Less,
    }
}

fn matches_search(row: &Value, search: &Search) -> bool {
    search
        .terms
        .iter()
        .all(|term| search.columns.iter().any(|column| icontains(field(row, column), term)))
}

fn icontains(value: &Value, needle: &str) -> bool {
    !value.is_null() && render_value(value).to_lowercase().contains(&needle.to_lowercase())
}

fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.with_timezone(&Utc))
}

fn values_equal(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    if let (Value::String(x), Value::String(y)) = (a, b) {
        if let (Ok(x), Ok(y)) = (Uuid::parse_str(x), Uuid::parse_str(y)) {
            return x == y;
        }
        if let (Some(x), Some(y)) = (parse_datetime(x), parse_datetime(y)) {
            return x == y;
        }
    }
    // Query parameters arrive as text: "false" matches false, "101" matches 101.
    !a.is_null() && !b.is_null() && render_value(a) == render_value(b)
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::String(x), Value::String(y)) => match (parse_datetime(x), parse_datetime(y)) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => x.cmp(y),
        },
        _ => render_value(a).cmp(&render_value(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::query::OrderBy;

    fn store() -> InMemoryStore {
        let store = InMemoryStore::new();
        for (name, surname, age, disabled) in [
            ("Alice", "Johnson", 30, false),
            ("Bob", "Wilson", 45, true),
            ("Carol", "Adams", 30, false),
        ] {
            store
                .insert_row("users", json!({
                    "id": Uuid::new_v4(),
                    "name": name,
                    "surname": surname,
                    "age": age,
                    "disabled": disabled,
                    "joined": "2024-01-15T10:30:00Z"
                }))
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn filters_and_counts() {
        let store = store();
        let count = |filter: Filter| Query::new().filter(filter);
        assert_eq!(store.count("users", &count(Filter::eq("disabled", false))).await.unwrap(), 2);
        assert_eq!(store.count("users", &count(Filter::eq("disabled", "true"))).await.unwrap(), 1);
        assert_eq!(store.count("missing", &Query::new()).await.unwrap(), 0);

        let searched = Query::new().search(Search::new("wil", &["surname"]));
        assert_eq!(store.count("users", &searched).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn compares_datetimes_across_offsets() {
        let store = store();
        let query = Query::new()
            .filter(Filter::gte("joined", "2024-01-15T11:30:00+01:00"))
            .filter(Filter::lt("joined", "2024-01-15T10:31:00Z"));
        assert_eq!(store.count("users", &query).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn orders_pages_and_projects() {
        let store = store();
        let query = Query::new()
            .order_by(OrderBy::asc("age"))
            .order_by(OrderBy::desc("surname"))
            .columns(&["name"])
            .offset(1)
            .limit(1);

        let rows = store.select("users", &query).await.unwrap();
        assert_eq!(rows, vec![json!({ "name": "Carol" })]);
        assert_eq!(store.selects_on("users"), 1);
    }

    #[tokio::test]
    async fn search_requires_all_terms() {
        let store = store();
        let query = Query::new().search(Search::new("ali john", &["name", "surname"]));
        let rows = store.select("users", &query).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["name"], "Alice");
    }
}
