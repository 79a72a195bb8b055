use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeSlotStatus {
    Open,
    Full,
    Closed,
}

impl TimeSlotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeSlotStatus::Open => "Open",
            TimeSlotStatus::Full => "Full",
            TimeSlotStatus::Closed => "Closed",
        }
    }
}

impl fmt::Display for TimeSlotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TimeSlotStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Open" => Ok(TimeSlotStatus::Open),
            "Full" => Ok(TimeSlotStatus::Full),
            "Closed" => Ok(TimeSlotStatus::Closed),
            other => Err(format!("unknown time slot status: {}", other)),
        }
    }
}

/// One bookable unit of time within a schedule.
///
/// `version` is bumped by the store on every committed mutation and is what
/// writers compare against to detect a concurrent change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub id: Uuid,
    pub schedule_id: Uuid,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub capacity: i32,
    pub booked_count: i32,
    pub status: TimeSlotStatus,
    pub version: i64,
}

impl TimeSlot {
    pub fn draft(schedule_id: Uuid, start_time: NaiveTime, end_time: NaiveTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            schedule_id,
            start_time,
            end_time,
            capacity: 1,
            booked_count: 0,
            status: TimeSlotStatus::Open,
            version: 0,
        }
    }

    pub fn remaining(&self) -> i32 {
        (self.capacity - self.booked_count).max(0)
    }

    /// Open and not yet at capacity.
    pub fn is_bookable(&self) -> bool {
        self.status == TimeSlotStatus::Open && self.booked_count < self.capacity
    }

    /// Status implied by the counters, leaving an administrative close in place.
    pub fn derived_status(&self) -> TimeSlotStatus {
        if self.status == TimeSlotStatus::Closed {
            TimeSlotStatus::Closed
        } else if self.booked_count >= self.capacity {
            TimeSlotStatus::Full
        } else {
            TimeSlotStatus::Open
        }
    }

    /// The slot after taking one more booking, or `None` if it cannot take one.
    pub fn with_booking_added(&self) -> Option<TimeSlot> {
        if !self.is_bookable() {
            return None;
        }
        let mut next = self.clone();
        next.booked_count += 1;
        next.status = next.derived_status();
        Some(next)
    }

    /// The slot after one booking is released. Never drops below zero.
    pub fn with_booking_released(&self) -> TimeSlot {
        let mut next = self.clone();
        next.booked_count = (next.booked_count - 1).max(0);
        next.status = next.derived_status();
        next
    }

    pub fn closed(&self) -> TimeSlot {
        let mut next = self.clone();
        next.status = TimeSlotStatus::Closed;
        next
    }

    pub fn reopened(&self) -> TimeSlot {
        let mut next = self.clone();
        next.status = TimeSlotStatus::Open;
        next.status = next.derived_status();
        next
    }
}

/// A slot write guarded by the version the writer read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotWrite {
    pub slot: TimeSlot,
    pub expected_version: i64,
}

impl SlotWrite {
    pub fn new(read: &TimeSlot, next: TimeSlot) -> Self {
        Self {
            expected_version: read.version,
            slot: next,
        }
    }
}
