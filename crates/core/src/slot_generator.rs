//! Carves a single-day availability window into fixed-length time slots.

use chrono::{Duration, NaiveTime};
use uuid::Uuid;

use crate::errors::{ClinicError, ClinicResult};
use crate::models::time_slot::TimeSlot;

/// Checks a window and slot length without generating anything.
pub fn validate_window(start: NaiveTime, end: NaiveTime, slot_minutes: i32) -> ClinicResult<()> {
    if slot_minutes <= 0 {
        return Err(ClinicError::InvalidParameter(format!(
            "slot_minutes must be > 0, got {}",
            slot_minutes
        )));
    }
    if end <= start {
        return Err(ClinicError::InvalidRange(format!(
            "end time {} must be after start time {}",
            end, start
        )));
    }
    Ok(())
}

/// Generates the ordered, contiguous slots `[cursor, cursor + slot_minutes)`
/// that fit entirely inside `[start, end)`.
///
/// A trailing remainder shorter than `slot_minutes` is dropped. Every draft
/// has capacity 1, no bookings and status Open. Pure and deterministic.
pub fn generate(
    schedule_id: Uuid,
    start: NaiveTime,
    end: NaiveTime,
    slot_minutes: i32,
) -> ClinicResult<Vec<TimeSlot>> {
    validate_window(start, end, slot_minutes)?;

    let step = Duration::minutes(i64::from(slot_minutes));
    let mut slots = Vec::new();
    let mut cursor = start;

    loop {
        let (slot_end, wrapped) = cursor.overflowing_add_signed(step);
        // Past midnight the window is over, whatever the wrapped clock says.
        if wrapped != 0 || slot_end > end {
            break;
        }
        slots.push(TimeSlot::draft(schedule_id, cursor, slot_end));
        cursor = slot_end;
    }

    Ok(slots)
}
