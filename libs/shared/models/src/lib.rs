pub mod auth;
pub mod entities;
pub mod error;

pub use entities::{Appointment, Doctor, Entity, Room, User};
