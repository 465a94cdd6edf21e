use std::collections::BTreeMap;

use anyhow::Result;
use chrono::{DateTime, Duration, NaiveDate, SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use shared_database::repository::select_all;
use shared_database::{EntityStore, Filter, Query, SharedStore};
use shared_models::{Appointment, Doctor, Entity, Room, User};

use crate::models::{DashboardStats, SpecializationCount};

#[derive(Deserialize)]
struct DoctorSpecialization {
    id: Uuid,
    specialization: String,
}

pub struct StatsService {
    store: SharedStore,
}

impl StatsService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Computed fresh on every call. `today` is a UTC calendar date.
    pub async fn get_dashboard_stats(&self, today: NaiveDate) -> Result<DashboardStats> {
        let store = self.store.as_ref();
        let (start, end) = day_bounds(today);

        let all = Query::new();
        let active = Query::new().filter(Filter::eq("disabled", false));
        let on_day = Query::new()
            .filter(Filter::gte("datetime", start))
            .filter(Filter::lt("datetime", end));
        let specializations = Query::new().columns(&["id", "specialization"]);

        let (
            total_doctors,
            active_users,
            total_appointments,
            today_appointments,
            total_rooms,
            doctor_rows,
        ) = tokio::try_join!(
            store.count(Doctor::TABLE, &all),
            store.count(User::TABLE, &active),
            store.count(Appointment::TABLE, &all),
            store.count(Appointment::TABLE, &on_day),
            store.count(Room::TABLE, &all),
            select_all(store, Doctor::TABLE, &specializations),
        )?;

        let specialization_stats = count_by_specialization(store, doctor_rows).await?;
        debug!(
            "Dashboard stats for {}: {} appointments today across {} specializations",
            today,
            today_appointments,
            specialization_stats.len()
        );

        Ok(DashboardStats {
            total_doctors,
            active_users,
            total_appointments,
            today_appointments,
            total_rooms,
            specialization_stats,
        })
    }
}

fn day_bounds(day: NaiveDate) -> (String, String) {
    let midnight = |date: NaiveDate| -> DateTime<Utc> {
        date.and_hms_opt(0, 0, 0)
            .map(|naive| naive.and_utc())
            .unwrap_or_default()
    };
    (
        midnight(day).to_rfc3339_opts(SecondsFormat::Secs, true),
        midnight(day + Duration::days(1)).to_rfc3339_opts(SecondsFormat::Secs, true),
    )
}

fn doctors_by_specialization(doctor_rows: Vec<Value>) -> Result<BTreeMap<String, Vec<Uuid>>> {
    let mut grouped: BTreeMap<String, Vec<Uuid>> = BTreeMap::new();
    for row in doctor_rows {
        let doctor: DoctorSpecialization = serde_json::from_value(row)?;
        grouped.entry(doctor.specialization).or_default().push(doctor.id);
    }
    Ok(grouped)
}

// One exact count per specialization. Appointments whose doctor no longer
// exists match no group.
async fn count_by_specialization(
    store: &dyn EntityStore,
    doctor_rows: Vec<Value>,
) -> Result<Vec<SpecializationCount>> {
    let mut stats = Vec::new();

    for (specialization, doctor_ids) in doctors_by_specialization(doctor_rows)? {
        let query = Query::new().filter(Filter::in_ids("doctor_id", doctor_ids));
        let count = store.count(Appointment::TABLE, &query).await?;
        stats.push(SpecializationCount { specialization, count });
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shared_database::InMemoryStore;

    #[test]
    fn day_bounds_cover_one_utc_day() {
        let (start, end) = day_bounds(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
        assert_eq!(start, "2024-12-31T00:00:00Z");
        assert_eq!(end, "2025-01-01T00:00:00Z");
    }

    #[tokio::test]
    async fn specializations_are_sorted_and_include_zero_counts() {
        let store = InMemoryStore::new();
        let cardiologist = Uuid::new_v4();
        let neurologist = Uuid::new_v4();
        for doctor_id in [cardiologist, cardiologist, neurologist, Uuid::new_v4()] {
            store
                .insert_row(Appointment::TABLE, json!({ "id": Uuid::new_v4(), "doctor_id": doctor_id }))
                .unwrap();
        }
        let doctors = vec![
            json!({ "id": neurologist, "specialization": "Neurology" }),
            json!({ "id": cardiologist, "specialization": "Cardiology" }),
            json!({ "id": Uuid::new_v4(), "specialization": "Dermatology" }),
        ];

        let stats = count_by_specialization(&store, doctors).await.unwrap();

        let flattened: Vec<(&str, u64)> = stats
            .iter()
            .map(|s| (s.specialization.as_str(), s.count))
            .collect();
        assert_eq!(
            flattened,
            vec![("Cardiology", 2), ("Dermatology", 0), ("Neurology", 1)]
        );
    }

    #[test]
    fn malformed_rows_are_errors() {
        assert!(doctors_by_specialization(vec![json!({ "id": "nope" })]).is_err());
    }
}
