use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::time_slot::TimeSlot;

pub const DEFAULT_SLOT_MINUTES: i32 = 15;
pub const MAX_LOCATION_LEN: usize = 120;

/// A provider's declared working window for one calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub work_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub slot_minutes: i32,
    pub location: Option<String>,
    pub published: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateScheduleRequest {
    pub work_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub slot_minutes: Option<i32>,
    pub location: Option<String>,
    pub publish: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewSlotsRequest {
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub slot_minutes: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleWithSlots {
    #[serde(flatten)]
    pub schedule: Schedule,
    pub time_slots: Vec<TimeSlot>,
}

/// Rows removed by a cascading schedule deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadeSummary {
    pub schedule_id: Uuid,
    pub time_slots_removed: usize,
    pub appointments_removed: usize,
}

/// What happens to bookings when their schedule is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeletePolicy {
    /// Slots and every appointment on them are removed with the schedule.
    #[default]
    Cascade,
    /// Deletion is refused while any Booked or CheckedIn appointment exists.
    RequireEmpty,
}

impl std::str::FromStr for DeletePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cascade" => Ok(DeletePolicy::Cascade),
            "require-empty" => Ok(DeletePolicy::RequireEmpty),
            other => Err(format!("unknown delete policy: {}", other)),
        }
    }
}
