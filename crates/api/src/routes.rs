pub mod appointment;
pub mod availability;
pub mod health;
pub mod schedule;
pub mod time_slot;
