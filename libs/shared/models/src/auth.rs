use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Roles that grant access to the administrative views.
pub const STAFF_ROLES: &[&str] = &["admin", "staff"];

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub app_metadata: Option<serde_json::Value>,
    pub user_metadata: Option<serde_json::Value>,
    pub aud: Option<String>,
    pub iat: Option<u64>,
}

/// Identity of the caller, as carried by a validated token.
///
/// Distinct from [`crate::entities::User`], which is a record in the
/// scheduling store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
    pub role: Option<String>,
    pub app_metadata: Option<serde_json::Value>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: Option<DateTime<Utc>>,
}

impl AuthUser {
    pub fn is_staff(&self) -> bool {
        let staff_role = self
            .role
            .as_deref()
            .map(|role| STAFF_ROLES.contains(&role))
            .unwrap_or(false);

        let staff_flag = self
            .app_metadata
            .as_ref()
            .and_then(|meta| meta.get("is_staff"))
            .and_then(|flag| flag.as_bool())
            .unwrap_or(false);

        staff_role || staff_flag
    }
}
