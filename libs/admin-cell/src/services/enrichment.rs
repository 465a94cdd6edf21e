use std::collections::{HashMap, HashSet};

use anyhow::Result;
use tracing::debug;
use uuid::Uuid;

use shared_database::repository::fetch_by_ids;
use shared_database::EntityStore;
use shared_models::{Appointment, Doctor, Room, User};

pub const UNKNOWN_DOCTOR: &str = "Unknown Doctor";
pub const UNKNOWN_PATIENT: &str = "Unknown Patient";
pub const UNKNOWN_ROOM: &str = "Unknown Room";

/// Records referenced by one page of appointments, loaded in one batch per
/// entity type. Lives for a single change-list render.
#[derive(Debug, Clone, Default)]
pub struct AppointmentEnrichment {
    doctors: HashMap<Uuid, Doctor>,
    users: HashMap<Uuid, User>,
    rooms: HashMap<Uuid, Room>,
}

impl AppointmentEnrichment {
    pub async fn load(store: &dyn EntityStore, appointments: &[Appointment]) -> Result<Self> {
        let doctor_ids: HashSet<Uuid> = appointments.iter().map(|a| a.doctor_id).collect();
        let user_ids: HashSet<Uuid> = appointments.iter().map(|a| a.user_id).collect();
        let room_ids: HashSet<Uuid> = appointments.iter().map(|a| a.room_id).collect();

        let (doctors, users, rooms) = tokio::try_join!(
            fetch_by_ids::<Doctor>(store, &doctor_ids),
            fetch_by_ids::<User>(store, &user_ids),
            fetch_by_ids::<Room>(store, &room_ids),
        )?;

        debug!(
            "Enriched {} appointments with {} doctors, {} patients, {} rooms",
            appointments.len(),
            doctors.len(),
            users.len(),
            rooms.len()
        );

        Ok(Self { doctors, users, rooms })
    }

    pub fn doctor_label(&self, appointment: &Appointment) -> String {
        self.doctors
            .get(&appointment.doctor_id)
            .map(|doctor| format!("Dr. {}", doctor.full_name()))
            .unwrap_or_else(|| UNKNOWN_DOCTOR.to_string())
    }

    pub fn patient_label(&self, appointment: &Appointment) -> String {
        self.users
            .get(&appointment.user_id)
            .map(User::full_name)
            .unwrap_or_else(|| UNKNOWN_PATIENT.to_string())
    }

    pub fn room_label(&self, appointment: &Appointment) -> String {
        self.rooms
            .get(&appointment.room_id)
            .map(|room| room.to_string())
            .unwrap_or_else(|| UNKNOWN_ROOM.to_string())
    }
}
