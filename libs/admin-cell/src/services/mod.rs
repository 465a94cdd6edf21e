pub mod changelist;
pub mod enrichment;
pub mod registry;

pub use changelist::ChangeListService;
pub use enrichment::AppointmentEnrichment;
pub use registry::medical_admin_site;
