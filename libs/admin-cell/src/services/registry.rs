use crate::models::{AdminSite, ListColumn, ListFilter, ModelAdmin, ModelKind};

pub const DOCTOR_LABEL_COLUMN: &str = "get_doctor_name";
pub const PATIENT_LABEL_COLUMN: &str = "get_patient_name";
pub const ROOM_LABEL_COLUMN: &str = "get_room_number";

const DOCTOR_ADMIN: ModelAdmin = ModelAdmin {
    kind: ModelKind::Doctor,
    list_display: &[
        ListColumn::Field("name"),
        ListColumn::Field("surname"),
        ListColumn::Field("specialization"),
        ListColumn::Field("category"),
        ListColumn::Field("experience_years"),
        ListColumn::Field("age"),
    ],
    list_filter: &[ListFilter::choices("specialization"), ListFilter::choices("category")],
    search_fields: &["name", "surname", "specialization"],
    readonly_fields: &["id"],
    ordering: &["surname", "name"],
    date_hierarchy: None,
};

const USER_ADMIN: ModelAdmin = ModelAdmin {
    kind: ModelKind::User,
    list_display: &[
        ListColumn::Field("name"),
        ListColumn::Field("surname"),
        ListColumn::Field("email"),
        ListColumn::Field("role"),
        ListColumn::Field("age"),
        ListColumn::Field("disabled"),
    ],
    list_filter: &[ListFilter::choices("role"), ListFilter::boolean("disabled")],
    search_fields: &["name", "surname", "email"],
    readonly_fields: &["id"],
    ordering: &["surname", "name"],
    date_hierarchy: None,
};

const ROOM_ADMIN: ModelAdmin = ModelAdmin {
    kind: ModelKind::Room,
    list_display: &[ListColumn::Field("number")],
    list_filter: &[],
    search_fields: &[],
    readonly_fields: &["id"],
    ordering: &["number"],
    date_hierarchy: None,
};

const APPOINTMENT_ADMIN: ModelAdmin = ModelAdmin {
    kind: ModelKind::Appointment,
    list_display: &[
        ListColumn::Field("datetime"),
        ListColumn::Computed { name: DOCTOR_LABEL_COLUMN, label: "Doctor" },
        ListColumn::Computed { name: PATIENT_LABEL_COLUMN, label: "Patient" },
        ListColumn::Computed { name: ROOM_LABEL_COLUMN, label: "Room" },
    ],
    list_filter: &[ListFilter::date("datetime")],
    search_fields: &[],
    readonly_fields: &["id", "doctor_id", "user_id", "room_id"],
    ordering: &["-datetime"],
    date_hierarchy: Some("datetime"),
};

pub fn medical_admin_site() -> AdminSite {
    AdminSite {
        site_header: "Medical Dashboard",
        site_title: "Medical Admin",
        index_title: "Medical Center Administration",
        registry: vec![DOCTOR_ADMIN, USER_ADMIN, ROOM_ADMIN, APPOINTMENT_ADMIN],
    }
}
