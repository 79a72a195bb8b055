use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use eyre::{Report, eyre};
use serde::{Deserialize, Serialize};
use slotbook_core::models::{
    appointment::{Appointment, AppointmentStatus, PaymentStatus},
    schedule::Schedule,
    time_slot::{TimeSlot, TimeSlotStatus},
};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbSchedule {
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

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbTimeSlot {
    pub id: Uuid,
    pub schedule_id: Uuid,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub capacity: i32,
    pub booked_count: i32,
    pub status: String,
    pub version: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbAppointment {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub time_slot_id: Uuid,
    pub status: String,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub cancellation_reason: Option<String>,
    pub points_used: i32,
    pub payment_status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<DbSchedule> for Schedule {
    fn from(row: DbSchedule) -> Self {
        Schedule {
            id: row.id,
            provider_id: row.provider_id,
            work_date: row.work_date,
            start_time: row.start_time,
            end_time: row.end_time,
            slot_minutes: row.slot_minutes,
            location: row.location,
            published: row.published,
            created_at: row.created_at,
        }
    }
}

impl TryFrom<DbTimeSlot> for TimeSlot {
    type Error = Report;

    fn try_from(row: DbTimeSlot) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<TimeSlotStatus>()
            .map_err(|e| eyre!("time slot {}: {}", row.id, e))?;
        Ok(TimeSlot {
            id: row.id,
            schedule_id: row.schedule_id,
            start_time: row.start_time,
            end_time: row.end_time,
            capacity: row.capacity,
            booked_count: row.booked_count,
            status,
            version: row.version,
        })
    }
}

impl TryFrom<DbAppointment> for Appointment {
    type Error = Report;

    fn try_from(row: DbAppointment) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<AppointmentStatus>()
            .map_err(|e| eyre!("appointment {}: {}", row.id, e))?;
        let payment_status = row
            .payment_status
            .parse::<PaymentStatus>()
            .map_err(|e| eyre!("appointment {}: {}", row.id, e))?;
        Ok(Appointment {
            id: row.id,
            doctor_id: row.doctor_id,
            patient_id: row.patient_id,
            time_slot_id: row.time_slot_id,
            status,
            reason: row.reason,
            notes: row.notes,
            cancellation_reason: row.cancellation_reason,
            points_used: row.points_used,
            payment_status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
