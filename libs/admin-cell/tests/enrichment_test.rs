use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use mockall::mock;
use serde_json::{json, Value};
use uuid::Uuid;

use admin_cell::services::AppointmentEnrichment;
use shared_database::{EntityStore, FilterOp, Query};
use shared_models::Appointment;

mock! {
    pub Store {}

    #[async_trait]
    impl EntityStore for Store {
        async fn select(&self, table: &str, query: &Query) -> anyhow::Result<Vec<Value>>;
        async fn count(&self, table: &str, query: &Query) -> anyhow::Result<u64>;
    }
}

fn batched_ids(query: &Query) -> usize {
    match query.filters.as_slice() {
        [filter] if filter.column == "id" => match &filter.op {
            FilterOp::In(values) => values.len(),
            _ => 0,
        },
        _ => 0,
    }
}

fn appointment(doctor_id: Uuid, user_id: Uuid, room_id: Uuid) -> Appointment {
    Appointment {
        id: Uuid::new_v4(),
        datetime: Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap(),
        doctor_id,
        user_id,
        room_id,
    }
}

#[tokio::test]
async fn one_batched_select_per_related_table() {
    let doctor_id = Uuid::new_v4();
    let user_id = Uuid::new_v4();
    let room_a = Uuid::new_v4();
    let room_b = Uuid::new_v4();

    let page = vec![
        appointment(doctor_id, user_id, room_a),
        appointment(doctor_id, user_id, room_b),
        appointment(doctor_id, user_id, room_a),
    ];

    let mut store = MockStore::new();
    store
        .expect_select()
        .withf(|table, query| table == "doctors" && batched_ids(query) == 1)
        .times(1)
        .returning(move |_, _| {
            Ok(vec![json!({
                "id": doctor_id,
                "name": "Sarah",
                "surname": "Connor",
                "age": 41,
                "specialization": "Oncology",
                "category": "Senior",
                "experience_years": 12
            })])
        });
    store
        .expect_select()
        .withf(|table, query| table == "users" && batched_ids(query) == 1)
        .times(1)
        .returning(|_, _| Ok(vec![]));
    store
        .expect_select()
        .withf(|table, query| table == "rooms" && batched_ids(query) == 2)
        .times(1)
        .returning(move |_, _| Ok(vec![json!({ "id": room_b, "number": 7 })]));
    store.expect_count().never();

    let cache = AppointmentEnrichment::load(&store, &page).await.unwrap();

    assert_eq!(cache.doctor_label(&page[0]), "Dr. Sarah Connor");
    assert_eq!(cache.patient_label(&page[0]), "Unknown Patient");
    assert_eq!(cache.room_label(&page[0]), "Unknown Room");
    assert_eq!(cache.room_label(&page[1]), "Room 7");
}

#[tokio::test]
async fn empty_page_issues_no_queries() {
    let mut store = MockStore::new();
    store.expect_select().never();
    store.expect_count().never();

    let cache = AppointmentEnrichment::load(&store, &[]).await.unwrap();
    let orphan = appointment(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

    assert_eq!(cache.doctor_label(&orphan), "Unknown Doctor");
}

#[tokio::test]
async fn store_failure_propagates() {
    let mut store = MockStore::new();
    store
        .expect_select()
        .returning(|_, _| Err(anyhow::anyhow!("connection reset")));

    let page = vec![appointment(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4())];
    let result = AppointmentEnrichment::load(&store, &page).await;

    assert!(result.is_err());
}
