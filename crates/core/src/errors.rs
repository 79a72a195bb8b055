use thiserror::Error;

use crate::models::appointment::AppointmentStatus;

#[derive(Error, Debug)]
pub enum ClinicError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Duplicate booking: {0}")]
    DuplicateBooking(String),

    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Slot unavailable: {0}")]
    SlotUnavailable(String),

    #[error("Invalid transition: {from} -> {to}")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Busy: {0}")]
    Busy(String),

    #[error("Dependency failure: {0}")]
    DependencyFailure(String),

    #[error("Database error: {0}")]
    Database(#[from] eyre::Report),
}

impl ClinicError {
    /// Stable machine-readable name of the error kind, used in response bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            ClinicError::NotFound(_) => "not_found",
            ClinicError::Conflict(_) => "conflict",
            ClinicError::DuplicateBooking(_) => "duplicate_booking",
            ClinicError::InvalidRange(_) => "invalid_range",
            ClinicError::InvalidParameter(_) => "invalid_parameter",
            ClinicError::SlotUnavailable(_) => "slot_unavailable",
            ClinicError::InvalidTransition { .. } => "invalid_transition",
            ClinicError::Forbidden(_) => "forbidden",
            ClinicError::Busy(_) => "busy",
            ClinicError::DependencyFailure(_) => "dependency_failure",
            ClinicError::Database(_) => "database",
        }
    }

    /// Only transient contention may be retried automatically.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClinicError::Busy(_))
    }
}

pub type ClinicResult<T> = Result<T, ClinicError>;
