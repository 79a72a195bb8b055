//! # SlotBook Core
//!
//! Domain model and booking engine for provider schedules and patient
//! appointments.
//!
//! ## Architecture
//!
//! - **Models**: schedules, time slots and appointments
//! - **Slot generator**: turns an availability window into a slot grid
//! - **Store**: the transactional storage contract plus an in-memory arena
//! - **Services**: schedule management, booking coordination and availability queries
//! - **Collaborators**: authorization guard, points ledger and clock, all injected

/// Capability checks for actors
pub mod auth;
/// Injectable time source
pub mod clock;
/// Domain error type
pub mod errors;
/// Points ledger contract
pub mod ledger;
/// Appointment state machine and text validation
pub mod lifecycle;
/// Mock collaborators for tests
pub mod mock;
/// Domain entities and request payloads
pub mod models;
/// Schedule, booking and availability services
pub mod services;
/// Availability window to slot grid
pub mod slot_generator;
/// Storage contract and in-memory implementation
pub mod store;
