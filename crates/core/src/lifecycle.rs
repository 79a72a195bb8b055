//! Appointment state machine and free-text validation shared by the services.

use tracing::{debug, warn};

use crate::errors::{ClinicError, ClinicResult};
use crate::models::appointment::AppointmentStatus;

impl AppointmentStatus {
    /// Statuses reachable in one step from `self`.
    pub fn valid_transitions(&self) -> &'static [AppointmentStatus] {
        match self {
            AppointmentStatus::Booked => &[
                AppointmentStatus::CheckedIn,
                AppointmentStatus::Cancelled,
                AppointmentStatus::NoShow,
            ],
            AppointmentStatus::CheckedIn => {
                &[AppointmentStatus::Completed, AppointmentStatus::Cancelled]
            }
            // Terminal states
            AppointmentStatus::Completed
            | AppointmentStatus::Cancelled
            | AppointmentStatus::NoShow => &[],
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }

    pub fn can_transition_to(&self, next: AppointmentStatus) -> bool {
        self.valid_transitions().contains(&next)
    }
}

pub fn validate_transition(from: AppointmentStatus, to: AppointmentStatus) -> ClinicResult<()> {
    if !from.can_transition_to(to) {
        warn!("Invalid status transition attempted: {} -> {}", from, to);
        return Err(ClinicError::InvalidTransition { from, to });
    }
    debug!("Status transition validated: {} -> {}", from, to);
    Ok(())
}

/// Trims optional free text, maps blank input to `None` and enforces a
/// character limit.
pub fn normalize_text(field: &str, value: Option<&str>, max_len: usize) -> ClinicResult<Option<String>> {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    if value.chars().count() > max_len {
        return Err(ClinicError::InvalidParameter(format!(
            "{} must be at most {} characters",
            field, max_len
        )));
    }
    Ok(Some(value.to_string()))
}
