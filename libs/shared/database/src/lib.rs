pub mod memory;
pub mod query;
pub mod repository;
pub mod store;
pub mod supabase;

pub use memory::InMemoryStore;
pub use query::{Filter, FilterOp, OrderBy, Query, Search};
pub use store::{EntityStore, SharedStore, SupabaseStore};
