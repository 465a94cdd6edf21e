use std::fmt;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

/// A record type persisted in the scheduling store.
pub trait Entity: Serialize + DeserializeOwned + fmt::Display + Clone + Send + Sync + 'static {
    /// Table (PostgREST resource) holding the records.
    const TABLE: &'static str;

    fn id(&self) -> Uuid;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    pub name: String,
    pub surname: String,
    pub age: i32,
    pub specialization: String,
    pub category: String,
    pub experience_years: i32,
}

impl Doctor {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.name, self.surname)
    }
}

impl fmt::Display for Doctor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dr. {} {} - {}", self.name, self.surname, self.specialization)
    }
}

impl Entity for Doctor {
    const TABLE: &'static str = "doctors";

    fn id(&self) -> Uuid {
        self.id
    }
}

pub const DEFAULT_USER_ROLE: &str = "user";

fn default_role() -> String {
    DEFAULT_USER_ROLE.to_string()
}

/// Patient or staff record kept by the scheduling system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub surname: String,
    pub email: String,
    #[serde(default = "default_role")]
    pub role: String,
    pub age: i32,
    #[serde(default)]
    pub disabled: bool,
}

impl User {
    /// Builds a record with the store defaults for `role`, `disabled` and `age`.
    pub fn new(name: &str, surname: &str, email: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            surname: surname.to_string(),
            email: email.to_string(),
            role: default_role(),
            age: 0,
            disabled: false,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.name, self.surname)
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.name, self.surname, self.email)
    }
}

impl Entity for User {
    const TABLE: &'static str = "users";

    fn id(&self) -> Uuid {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: Uuid,
    pub number: i32,
}

impl fmt::Display for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Room {}", self.number)
    }
}

impl Entity for Room {
    const TABLE: &'static str = "rooms";

    fn id(&self) -> Uuid {
        self.id
    }
}

/// A booking. `doctor_id`, `user_id` and `room_id` are plain references and
/// may point at records that no longer exist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub datetime: DateTime<Utc>,
    pub doctor_id: Uuid,
    pub user_id: Uuid,
    pub room_id: Uuid,
}

impl fmt::Display for Appointment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Appointment {}", self.datetime.format("%Y-%m-%d %H:%M"))
    }
}

impl Entity for Appointment {
    const TABLE: &'static str = "appointments";

    fn id(&self) -> Uuid {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn doctor(name: &str, surname: &str, specialization: &str) -> Doctor {
        Doctor {
            id: Uuid::new_v4(),
            name: name.to_string(),
            surname: surname.to_string(),
            age: 0,
            specialization: specialization.to_string(),
            category: String::new(),
            experience_years: 0,
        }
    }

    #[test]
    fn test_doctor_display() {
        let doctor = doctor("John", "Smith", "Cardiology");
        assert_eq!(doctor.to_string(), "Dr. John Smith - Cardiology");
    }

    #[test]
    fn test_doctor_fields() {
        let doctor = Doctor {
            age: 35,
            category: "Senior".to_string(),
            experience_years: 10,
            ..doctor("Jane", "Doe", "Neurology")
        };
        assert_eq!(doctor.name, "Jane");
        assert_eq!(doctor.specialization, "Neurology");
        assert_eq!(doctor.experience_years, 10);
        assert_eq!(doctor.full_name(), "Jane Doe");
    }

    #[test]
    fn test_user_display() {
        let user = User::new("Alice", "Johnson", "alice@example.com");
        assert_eq!(user.to_string(), "Alice Johnson (alice@example.com)");
    }

    #[test]
    fn test_user_default_values() {
        let user = User::new("Bob", "Wilson", "bob@test.com");
        assert_eq!(user.role, "user");
        assert!(!user.disabled);
    }

    #[test]
    fn test_user_defaults_when_row_omits_columns() {
        let user: User = serde_json::from_value(json!({
            "id": Uuid::new_v4(),
            "name": "Bob",
            "surname": "Wilson",
            "email": "bob@test.com",
            "age": 41
        }))
        .unwrap();

        assert_eq!(user.role, DEFAULT_USER_ROLE);
        assert!(!user.disabled);
    }

    #[test]
    fn test_appointment_display() {
        let appointment = Appointment {
            id: Uuid::new_v4(),
            datetime: Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap(),
            doctor_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            room_id: Uuid::new_v4(),
        };
        assert_eq!(appointment.to_string(), "Appointment 2024-01-15 10:30");
    }

    #[test]
    fn test_room_display() {
        let room = Room { id: Uuid::new_v4(), number: 101 };
        assert_eq!(room.to_string(), "Room 101");
    }
}
