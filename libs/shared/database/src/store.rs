use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use shared_config::AppConfig;

use crate::query::{encode_params, Filter, Query};
use crate::supabase::SupabaseClient;

/// Read-only access to the relational store.
///
/// Rows travel as JSON objects; the typed helpers in
/// [`crate::repository`] decode them into entities.
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Value>>;

    /// Rows matching `query`'s filters and search; paging and ordering are ignored.
    async fn count(&self, table: &str, query: &Query) -> Result<u64>;
}

pub type SharedStore = Arc<dyn EntityStore>;

/// PostgREST-backed store.
pub struct SupabaseStore {
    supabase: SupabaseClient,
    auth_token: Option<String>,
}

impl SupabaseStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            auth_token: config.supabase_service_role_key.clone(),
        }
    }

    pub fn shared(config: &AppConfig) -> SharedStore {
        Arc::new(Self::new(config))
    }

    fn resource_path(table: &str, query_string: &str) -> String {
        if query_string.is_empty() {
            format!("/rest/v1/{}", table)
        } else {
            format!("/rest/v1/{}?{}", table, query_string)
        }
    }
}

#[async_trait]
impl EntityStore for SupabaseStore {
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Value>> {
        let path = Self::resource_path(table, &query.to_query_string());
        debug!("Selecting from {}: {}", table, path);

        self.supabase
            .get::<Vec<Value>>(&path, self.auth_token.as_deref())
            .await
    }

    async fn count(&self, table: &str, query: &Query) -> Result<u64> {
        let mut params: Vec<(String, String)> = query.filters.iter().map(Filter::to_postgrest).collect();
        if let Some(search) = &query.search {
            params.push(search.to_postgrest());
        }
        let path = Self::resource_path(table, &encode_params(&params));

        self.supabase.count(&path, self.auth_token.as_deref()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::query::OrderBy;
    use crate::repository::select_all;

    fn config_for(server: &MockServer) -> AppConfig {
        AppConfig {
            supabase_url: server.uri(),
            supabase_anon_key: "test-anon-key".to_string(),
            supabase_jwt_secret: "secret".to_string(),
            supabase_service_role_key: Some("service-key".to_string()),
            ..AppConfig::default()
        }
    }

    #[tokio::test]
    async fn select_sends_postgrest_query() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/doctors"))
            .and(query_param("specialization", "eq.Cardiology"))
            .and(query_param("order", "surname.asc,name.asc"))
            .and(query_param("limit", "5"))
            .and(header("apikey", "test-anon-key"))
            .and(header("Authorization", "Bearer service-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": "00000000-0000-0000-0000-000000000001", "name": "John" }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let store = SupabaseStore::new(&config_for(&server));
        let query = Query::new()
            .filter(Filter::eq("specialization", "Cardiology"))
            .order_by(OrderBy::asc("surname"))
            .order_by(OrderBy::asc("name"))
            .limit(5);

        let rows = store.select("doctors", &query).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["name"], "John");
    }

    #[tokio::test]
    async fn count_reads_content_range() {
        let server = MockServer::start().await;

        Mock::given(method("HEAD"))
            .and(path("/rest/v1/users"))
            .and(query_param("disabled", "eq.false"))
            .and(header("Prefer", "count=exact"))
            .respond_with(ResponseTemplate::new(200).insert_header("Content-Range", "0-19/20"))
            .expect(1)
            .mount(&server)
            .await;

        let store = SupabaseStore::new(&config_for(&server));
        let count = store.count("users", &Query::new().filter(Filter::eq("disabled", false))).await.unwrap();
        assert_eq!(count, 20);
    }

    #[tokio::test]
    async fn select_all_pages_past_the_server_row_cap() {
        let server = MockServer::start().await;

        Mock::given(method("HEAD"))
            .and(path("/rest/v1/doctors"))
            .respond_with(ResponseTemplate::new(200).insert_header("Content-Range", "0-1/3"))
            .expect(1)
            .mount(&server)
            .await;
        // The server caps every response at two rows regardless of `limit`.
        Mock::given(method("GET"))
            .and(path("/rest/v1/doctors"))
            .and(query_param("order", "id.asc"))
            .and(query_param("offset", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": "00000000-0000-0000-0000-000000000001" },
                { "id": "00000000-0000-0000-0000-000000000002" }
            ])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/doctors"))
            .and(query_param("offset", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": "00000000-0000-0000-0000-000000000003" }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let store = SupabaseStore::new(&config_for(&server));
        let rows = select_all(&store, "doctors", &Query::new().columns(&["id"])).await.unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2]["id"], "00000000-0000-0000-0000-000000000003");
    }

    #[tokio::test]
    async fn select_surfaces_api_errors() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/rooms"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let store = SupabaseStore::new(&config_for(&server));
        let err = store.select("rooms", &Query::new()).await.unwrap_err();
        assert!(err.to_string().contains("500"));
    }
}
