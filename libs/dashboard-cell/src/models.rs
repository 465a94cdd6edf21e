use serde::{Deserialize, Serialize};

/// Aggregate counts shown on the staff landing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_doctors: u64,
    /// Users not flagged `disabled`.
    pub active_users: u64,
    pub total_appointments: u64,
    pub today_appointments: u64,
    pub total_rooms: u64,
    pub specialization_stats: Vec<SpecializationCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecializationCount {
    pub specialization: String,
    pub count: u64,
}
