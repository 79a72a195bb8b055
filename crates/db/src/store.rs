//! Postgres implementation of [`SchedulingStore`].
//!
//! Every multi-row change runs in one transaction with a bounded
//! `lock_timeout`. Versioned slot writes are conditional updates; a write
//! that matches no row is reported as [`Commit::Stale`] and the transaction
//! is rolled back by dropping it.

use async_trait::async_trait;
use chrono::NaiveDate;
use eyre::Report;
use slotbook_core::{
    errors::{ClinicError, ClinicResult},
    models::{
        appointment::Appointment,
        schedule::{CascadeSummary, DeletePolicy, Schedule},
        time_slot::{SlotWrite, TimeSlot},
    },
    store::{Commit, SchedulingStore, TransitionWrite},
};
use sqlx::{Postgres, Transaction};
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use crate::DbPool;
use crate::repositories::{appointment, schedule, time_slot};
use crate::schema::ACTIVE_APPOINTMENT_INDEX;

pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(500);

/// Translates a repository failure into the domain error it stands for.
pub fn map_db_error(report: Report) -> ClinicError {
    let Some(sqlx_error) = report.downcast_ref::<sqlx::Error>() else {
        return ClinicError::Database(report);
    };

    match sqlx_error {
        sqlx::Error::PoolTimedOut => {
            return ClinicError::Busy("timed out waiting for a database connection".to_string());
        }
        sqlx::Error::Database(db_error) => match db_error.code().as_deref() {
            // lock_not_available, serialization_failure, deadlock_detected
            Some("55P03") | Some("40001") | Some("40P01") => {
                return ClinicError::Busy(db_error.message().to_string());
            }
            Some("23505") => {
                let message = db_error.message().to_string();
                return match db_error.constraint() {
                    Some(ACTIVE_APPOINTMENT_INDEX) => ClinicError::DuplicateBooking(message),
                    // schedules_provider_day, time_slots_schedule_window
                    _ => ClinicError::Conflict(message),
                };
            }
            _ => {}
        },
        _ => {}
    }
    ClinicError::Database(report)
}

fn slot_from_row(row: crate::models::DbTimeSlot) -> ClinicResult<TimeSlot> {
    TimeSlot::try_from(row).map_err(ClinicError::Database)
}

fn appointment_from_row(row: crate::models::DbAppointment) -> ClinicResult<Appointment> {
    Appointment::try_from(row).map_err(ClinicError::Database)
}

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: DbPool,
    lock_timeout: Duration,
}

impl PgStore {
    pub fn new(pool: DbPool, lock_timeout: Duration) -> Self {
        Self { pool, lock_timeout }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    async fn begin(&self) -> ClinicResult<Transaction<'static, Postgres>> {
        let mut tx = self.pool.begin().await.map_err(|e| map_db_error(e.into()))?;
        // SET does not take bind parameters
        sqlx::query(&format!(
            "SET LOCAL lock_timeout = '{}ms'",
            self.lock_timeout.as_millis()
        ))
        .execute(&mut *tx)
        .await
        .map_err(|e| map_db_error(e.into()))?;
        Ok(tx)
    }

    async fn commit(tx: Transaction<'static, Postgres>) -> ClinicResult<()> {
        tx.commit().await.map_err(|e| map_db_error(e.into()))
    }

    /// Tells a missing slot apart from one whose version moved on.
    async fn stale_or_missing<T>(
        tx: &mut Transaction<'static, Postgres>,
        slot_id: Uuid,
    ) -> ClinicResult<Commit<T>> {
        match time_slot::get_time_slot_by_id(&mut **tx, slot_id)
            .await
            .map_err(map_db_error)?
        {
            Some(_) => Ok(Commit::Stale),
            None => Err(ClinicError::NotFound(format!(
                "Time slot with ID {} not found",
                slot_id
            ))),
        }
    }
}

#[async_trait]
impl SchedulingStore for PgStore {
    async fn insert_schedule(&self, schedule: &Schedule, slots: &[TimeSlot]) -> ClinicResult<()> {
        let mut tx = self.begin().await?;
        schedule::insert_schedule(&mut *tx, schedule)
            .await
            .map_err(map_db_error)?;
        for slot in slots {
            time_slot::insert_time_slot(&mut *tx, slot)
                .await
                .map_err(map_db_error)?;
        }
        Self::commit(tx).await?;
        debug!("Stored schedule {} with {} slots", schedule.id, slots.len());
        Ok(())
    }

    async fn get_schedule(&self, id: Uuid) -> ClinicResult<Option<Schedule>> {
        let row = schedule::get_schedule_by_id(&self.pool, id)
            .await
            .map_err(map_db_error)?;
        Ok(row.map(Schedule::from))
    }

    async fn find_schedule_for_day(
        &self,
        provider_id: Uuid,
        work_date: NaiveDate,
    ) -> ClinicResult<Option<Schedule>> {
        let row = schedule::find_schedule_for_day(&self.pool, provider_id, work_date)
            .await
            .map_err(map_db_error)?;
        Ok(row.map(Schedule::from))
    }

    async fn list_schedules(
        &self,
        provider_id: Uuid,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> ClinicResult<Vec<Schedule>> {
        let rows = schedule::list_schedules(&self.pool, provider_id, from, to)
            .await
            .map_err(map_db_error)?;
        Ok(rows.into_iter().map(Schedule::from).collect())
    }

    async fn set_published(&self, id: Uuid, published: bool) -> ClinicResult<Option<Schedule>> {
        let row = schedule::set_published(&self.pool, id, published)
            .await
            .map_err(map_db_error)?;
        Ok(row.map(Schedule::from))
    }

    async fn delete_schedule(
        &self,
        id: Uuid,
        policy: DeletePolicy,
    ) -> ClinicResult<Option<CascadeSummary>> {
        let mut tx = self.begin().await?;
        if schedule::lock_schedule(&mut *tx, id)
            .await
            .map_err(map_db_error)?
            .is_none()
        {
            return Ok(None);
        }

        if policy == DeletePolicy::RequireEmpty {
            let pending = appointment::count_for_schedule(&mut *tx, id, true)
                .await
                .map_err(map_db_error)?;
            if pending > 0 {
                return Err(ClinicError::Conflict(format!(
                    "Schedule {} still has {} pending appointments",
                    id, pending
                )));
            }
        }

        let time_slots_removed = time_slot::count_time_slots(&mut *tx, id)
            .await
            .map_err(map_db_error)?;
        let appointments_removed = appointment::count_for_schedule(&mut *tx, id, false)
            .await
            .map_err(map_db_error)?;
        schedule::delete_schedule(&mut *tx, id)
            .await
            .map_err(map_db_error)?;
        Self::commit(tx).await?;

        Ok(Some(CascadeSummary {
            schedule_id: id,
            time_slots_removed: time_slots_removed as usize,
            appointments_removed: appointments_removed as usize,
        }))
    }

    async fn get_time_slot(&self, id: Uuid) -> ClinicResult<Option<TimeSlot>> {
        time_slot::get_time_slot_by_id(&self.pool, id)
            .await
            .map_err(map_db_error)?
            .map(slot_from_row)
            .transpose()
    }

    async fn list_time_slots(&self, schedule_id: Uuid) -> ClinicResult<Vec<TimeSlot>> {
        time_slot::get_time_slots_by_schedule_id(&self.pool, schedule_id)
            .await
            .map_err(map_db_error)?
            .into_iter()
            .map(slot_from_row)
            .collect()
    }

    async fn update_time_slot(&self, write: &SlotWrite) -> ClinicResult<Commit<TimeSlot>> {
        let mut tx = self.begin().await?;
        let Some(row) = time_slot::update_time_slot_versioned(&mut *tx, write)
            .await
            .map_err(map_db_error)?
        else {
            return Self::stale_or_missing(&mut tx, write.slot.id).await;
        };
        Self::commit(tx).await?;
        Ok(Commit::Applied(slot_from_row(row)?))
    }

    async fn list_published_slots(
        &self,
        provider_id: Uuid,
        date: NaiveDate,
    ) -> ClinicResult<Vec<TimeSlot>> {
        time_slot::list_published_slots(&self.pool, provider_id, date)
            .await
            .map_err(map_db_error)?
            .into_iter()
            .map(slot_from_row)
            .collect()
    }

    async fn providers_with_open_slots(&self, date: NaiveDate) -> ClinicResult<Vec<Uuid>> {
        time_slot::providers_with_open_slots(&self.pool, date)
            .await
            .map_err(map_db_error)
    }

    async fn get_appointment(&self, id: Uuid) -> ClinicResult<Option<Appointment>> {
        appointment::get_appointment_by_id(&self.pool, id)
            .await
            .map_err(map_db_error)?
            .map(appointment_from_row)
            .transpose()
    }

    async fn find_active_appointment(
        &self,
        patient_id: Uuid,
        time_slot_id: Uuid,
    ) -> ClinicResult<Option<Appointment>> {
        appointment::find_active_appointment(&self.pool, patient_id, time_slot_id)
            .await
            .map_err(map_db_error)?
            .map(appointment_from_row)
            .transpose()
    }

    async fn list_patient_appointments(&self, patient_id: Uuid) -> ClinicResult<Vec<Appointment>> {
        appointment::get_appointments_by_patient_id(&self.pool, patient_id)
            .await
            .map_err(map_db_error)?
            .into_iter()
            .map(appointment_from_row)
            .collect()
    }

    async fn list_schedule_appointments(&self, schedule_id: Uuid) -> ClinicResult<Vec<Appointment>> {
        appointment::get_appointments_by_schedule_id(&self.pool, schedule_id)
            .await
            .map_err(map_db_error)?
            .into_iter()
            .map(appointment_from_row)
            .collect()
    }

    async fn commit_reservation(
        &self,
        slot: &SlotWrite,
        appointment: &Appointment,
    ) -> ClinicResult<Commit<TimeSlot>> {
        let mut tx = self.begin().await?;
        let Some(row) = time_slot::update_time_slot_versioned(&mut *tx, slot)
            .await
            .map_err(map_db_error)?
        else {
            return Self::stale_or_missing(&mut tx, slot.slot.id).await;
        };
        // The partial unique index turns a racing duplicate into DuplicateBooking
        appointment::insert_appointment(&mut *tx, appointment)
            .await
            .map_err(map_db_error)?;
        Self::commit(tx).await?;
        Ok(Commit::Applied(slot_from_row(row)?))
    }

    async fn discard_reservation(&self, appointment_id: Uuid) -> ClinicResult<bool> {
        let mut tx = self.begin().await?;
        let removed = appointment::delete_unsettled_appointment(&mut *tx, appointment_id)
            .await
            .map_err(map_db_error)?;

        match &removed {
            Some(removed) => {
                time_slot::release_booking(&mut *tx, removed.time_slot_id)
                    .await
                    .map_err(map_db_error)?;
            }
            None => {
                if appointment::mark_cancelled_payment_failed(&mut *tx, appointment_id)
                    .await
                    .map_err(map_db_error)?
                {
                    debug!("Appointment {} was cancelled before its payment failed", appointment_id);
                }
            }
        }

        Self::commit(tx).await?;
        Ok(removed.is_some())
    }

    async fn commit_transition(&self, write: &TransitionWrite) -> ClinicResult<Commit<Appointment>> {
        let mut tx = self.begin().await?;
        let id = write.appointment.id;

        let Some(row) = appointment::update_appointment_if_unchanged(
            &mut *tx,
            &write.appointment,
            write.expected_status,
            write.expected_payment,
        )
        .await
        .map_err(map_db_error)?
        else {
            return match appointment::get_appointment_by_id(&mut *tx, id)
                .await
                .map_err(map_db_error)?
            {
                Some(_) => Ok(Commit::Stale),
                None => Err(ClinicError::NotFound(format!(
                    "Appointment with ID {} not found",
                    id
                ))),
            };
        };

        if let Some(slot) = &write.slot {
            if time_slot::update_time_slot_versioned(&mut *tx, slot)
                .await
                .map_err(map_db_error)?
                .is_none()
            {
                return Self::stale_or_missing(&mut tx, slot.slot.id).await;
            }
        }

        Self::commit(tx).await?;
        Ok(Commit::Applied(appointment_from_row(row)?))
    }
}
