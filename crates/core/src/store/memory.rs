//! In-process arena implementation of [`SchedulingStore`].
//!
//! Entities live in id-keyed tables with explicit foreign keys. Every
//! operation takes the arena lock once, so each call is its own isolation
//! unit; versioned writes are compare-and-swap under that lock. Lock
//! acquisition is bounded by `lock_wait` and reports `Busy` when exceeded.

use async_trait::async_trait;
use chrono::NaiveDate;
use eyre::eyre;
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::time::timeout;
use tracing::debug;
use uuid::Uuid;

use super::{Commit, SchedulingStore, TransitionWrite};
use crate::errors::{ClinicError, ClinicResult};
use crate::models::{
    appointment::{Appointment, PaymentStatus},
    schedule::{CascadeSummary, DeletePolicy, Schedule},
    time_slot::{SlotWrite, TimeSlot},
};

pub const DEFAULT_LOCK_WAIT: Duration = Duration::from_millis(500);

#[derive(Debug, Default)]
struct Tables {
    schedules: HashMap<Uuid, Schedule>,
    time_slots: HashMap<Uuid, TimeSlot>,
    appointments: HashMap<Uuid, Appointment>,
}

impl Tables {
    fn published_schedule(&self, provider_id: Uuid, date: NaiveDate) -> Option<&Schedule> {
        self.schedules
            .values()
            .find(|s| s.provider_id == provider_id && s.work_date == date && s.published)
    }

    fn slots_of(&self, schedule_id: Uuid) -> Vec<TimeSlot> {
        let mut slots: Vec<TimeSlot> = self
            .time_slots
            .values()
            .filter(|slot| slot.schedule_id == schedule_id)
            .cloned()
            .collect();
        slots.sort_by_key(|slot| slot.start_time);
        slots
    }

    /// Version check plus the row constraints a database would enforce.
    fn apply_slot_write(&mut self, write: &SlotWrite) -> ClinicResult<Commit<TimeSlot>> {
        let Some(current) = self.time_slots.get_mut(&write.slot.id) else {
            return Err(ClinicError::NotFound(format!(
                "Time slot with ID {} not found",
                write.slot.id
            )));
        };
        if current.version != write.expected_version {
            return Ok(Commit::Stale);
        }
        let next = &write.slot;
        if next.booked_count < 0 || next.booked_count > next.capacity || next.capacity < 1 {
            return Err(ClinicError::Database(eyre!(
                "time slot {} violates capacity constraint: booked {} of {}",
                next.id,
                next.booked_count,
                next.capacity
            )));
        }
        *current = TimeSlot {
            version: current.version + 1,
            ..next.clone()
        };
        Ok(Commit::Applied(current.clone()))
    }
}

#[derive(Debug)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    lock_wait: Duration,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_LOCK_WAIT)
    }
}

impl MemoryStore {
    pub fn new(lock_wait: Duration) -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            lock_wait,
        }
    }

    async fn read(&self) -> ClinicResult<RwLockReadGuard<'_, Tables>> {
        timeout(self.lock_wait, self.tables.read())
            .await
            .map_err(|_| ClinicError::Busy("timed out waiting for a store read lock".to_string()))
    }

    async fn write(&self) -> ClinicResult<RwLockWriteGuard<'_, Tables>> {
        timeout(self.lock_wait, self.tables.write())
            .await
            .map_err(|_| ClinicError::Busy("timed out waiting for a store write lock".to_string()))
    }
}

#[async_trait]
impl SchedulingStore for MemoryStore {
    async fn insert_schedule(&self, schedule: &Schedule, slots: &[TimeSlot]) -> ClinicResult<()> {
        let mut tables = self.write().await?;

        if tables
            .schedules
            .values()
            .any(|s| s.provider_id == schedule.provider_id && s.work_date == schedule.work_date)
        {
            return Err(ClinicError::Conflict(format!(
                "Schedule already exists for provider {} on {}",
                schedule.provider_id, schedule.work_date
            )));
        }

        let mut windows = BTreeSet::new();
        for slot in slots {
            if slot.schedule_id != schedule.id || !windows.insert((slot.start_time, slot.end_time)) {
                return Err(ClinicError::Conflict(format!(
                    "Duplicate or foreign time slot {}-{} for schedule {}",
                    slot.start_time, slot.end_time, schedule.id
                )));
            }
        }

        tables.schedules.insert(schedule.id, schedule.clone());
        for slot in slots {
            tables.time_slots.insert(slot.id, slot.clone());
        }
        debug!("Stored schedule {} with {} slots", schedule.id, slots.len());
        Ok(())
    }

    async fn get_schedule(&self, id: Uuid) -> ClinicResult<Option<Schedule>> {
        Ok(self.read().await?.schedules.get(&id).cloned())
    }

    async fn find_schedule_for_day(
        &self,
        provider_id: Uuid,
        work_date: NaiveDate,
    ) -> ClinicResult<Option<Schedule>> {
        let tables = self.read().await?;
        Ok(tables
            .schedules
            .values()
            .find(|s| s.provider_id == provider_id && s.work_date == work_date)
            .cloned())
    }

    async fn list_schedules(
        &self,
        provider_id: Uuid,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> ClinicResult<Vec<Schedule>> {
        let tables = self.read().await?;
        let mut schedules: Vec<Schedule> = tables
            .schedules
            .values()
            .filter(|s| s.provider_id == provider_id)
            .filter(|s| from.is_none_or(|from| s.work_date >= from))
            .filter(|s| to.is_none_or(|to| s.work_date <= to))
            .cloned()
            .collect();
        schedules.sort_by_key(|s| s.work_date);
        Ok(schedules)
    }

    async fn set_published(&self, id: Uuid, published: bool) -> ClinicResult<Option<Schedule>> {
        let mut tables = self.write().await?;
        Ok(tables.schedules.get_mut(&id).map(|schedule| {
            schedule.published = published;
            schedule.clone()
        }))
    }

    async fn delete_schedule(
        &self,
        id: Uuid,
        policy: DeletePolicy,
    ) -> ClinicResult<Option<CascadeSummary>> {
        let mut tables = self.write().await?;
        if !tables.schedules.contains_key(&id) {
            return Ok(None);
        }

        let slot_ids: BTreeSet<Uuid> = tables
            .time_slots
            .values()
            .filter(|slot| slot.schedule_id == id)
            .map(|slot| slot.id)
            .collect();
        let appointment_ids: Vec<Uuid> = tables
            .appointments
            .values()
            .filter(|a| slot_ids.contains(&a.time_slot_id))
            .map(|a| a.id)
            .collect();

        if policy == DeletePolicy::RequireEmpty {
            let pending = appointment_ids
                .iter()
                .filter(|a| tables.appointments[*a].is_pending())
                .count();
            if pending > 0 {
                return Err(ClinicError::Conflict(format!(
                    "Schedule {} still has {} pending appointments",
                    id, pending
                )));
            }
        }

        for appointment_id in &appointment_ids {
            tables.appointments.remove(appointment_id);
        }
        for slot_id in &slot_ids {
            tables.time_slots.remove(slot_id);
        }
        tables.schedules.remove(&id);

        Ok(Some(CascadeSummary {
            schedule_id: id,
            time_slots_removed: slot_ids.len(),
            appointments_removed: appointment_ids.len(),
        }))
    }

    async fn get_time_slot(&self, id: Uuid) -> ClinicResult<Option<TimeSlot>> {
        Ok(self.read().await?.time_slots.get(&id).cloned())
    }

    async fn list_time_slots(&self, schedule_id: Uuid) -> ClinicResult<Vec<TimeSlot>> {
        Ok(self.read().await?.slots_of(schedule_id))
    }

    async fn update_time_slot(&self, write: &SlotWrite) -> ClinicResult<Commit<TimeSlot>> {
        self.write().await?.apply_slot_write(write)
    }

    async fn list_published_slots(
        &self,
        provider_id: Uuid,
        date: NaiveDate,
    ) -> ClinicResult<Vec<TimeSlot>> {
        let tables = self.read().await?;
        Ok(tables
            .published_schedule(provider_id, date)
            .map(|schedule| tables.slots_of(schedule.id))
            .unwrap_or_default())
    }

    async fn providers_with_open_slots(&self, date: NaiveDate) -> ClinicResult<Vec<Uuid>> {
        let tables = self.read().await?;
        let providers: BTreeSet<Uuid> = tables
            .schedules
            .values()
            .filter(|s| s.work_date == date && s.published)
            .filter(|s| {
                tables
                    .time_slots
                    .values()
                    .any(|slot| slot.schedule_id == s.id && slot.is_bookable())
            })
            .map(|s| s.provider_id)
            .collect();
        Ok(providers.into_iter().collect())
    }

    async fn get_appointment(&self, id: Uuid) -> ClinicResult<Option<Appointment>> {
        Ok(self.read().await?.appointments.get(&id).cloned())
    }

    async fn find_active_appointment(
        &self,
        patient_id: Uuid,
        time_slot_id: Uuid,
    ) -> ClinicResult<Option<Appointment>> {
        let tables = self.read().await?;
        Ok(tables
            .appointments
            .values()
            .find(|a| a.patient_id == patient_id && a.time_slot_id == time_slot_id && a.is_active())
            .cloned())
    }

    async fn list_patient_appointments(&self, patient_id: Uuid) -> ClinicResult<Vec<Appointment>> {
        let tables = self.read().await?;
        let mut appointments: Vec<Appointment> = tables
            .appointments
            .values()
            .filter(|a| a.patient_id == patient_id)
            .cloned()
            .collect();
        appointments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(appointments)
    }

    async fn list_schedule_appointments(&self, schedule_id: Uuid) -> ClinicResult<Vec<Appointment>> {
        let tables = self.read().await?;
        let mut appointments: Vec<(chrono::NaiveTime, Appointment)> = tables
            .appointments
            .values()
            .filter_map(|a| {
                let slot = tables.time_slots.get(&a.time_slot_id)?;
                (slot.schedule_id == schedule_id).then(|| (slot.start_time, a.clone()))
            })
            .collect();
        appointments.sort_by(|(a_start, a), (b_start, b)| {
            a_start.cmp(b_start).then(a.created_at.cmp(&b.created_at))
        });
        Ok(appointments.into_iter().map(|(_, a)| a).collect())
    }

    async fn commit_reservation(
        &self,
        slot: &SlotWrite,
        appointment: &Appointment,
    ) -> ClinicResult<Commit<TimeSlot>> {
        let mut tables = self.write().await?;

        if tables.appointments.values().any(|a| {
            a.patient_id == appointment.patient_id
                && a.time_slot_id == appointment.time_slot_id
                && a.is_active()
        }) {
            return Err(ClinicError::DuplicateBooking(format!(
                "Patient {} already holds time slot {}",
                appointment.patient_id, appointment.time_slot_id
            )));
        }

        let committed = tables.apply_slot_write(slot)?;
        if let Commit::Applied(_) = committed {
            tables.appointments.insert(appointment.id, appointment.clone());
        }
        Ok(committed)
    }

    async fn discard_reservation(&self, appointment_id: Uuid) -> ClinicResult<bool> {
        let mut tables = self.write().await?;
        let Some(current) = tables.appointments.get_mut(&appointment_id) else {
            return Ok(false);
        };
        if current.payment_status != PaymentStatus::Pending {
            return Ok(false);
        }
        if !current.is_active() {
            current.payment_status = PaymentStatus::Failed;
            return Ok(false);
        }

        let time_slot_id = current.time_slot_id;
        tables.appointments.remove(&appointment_id);
        if let Some(slot) = tables.time_slots.get_mut(&time_slot_id) {
            *slot = TimeSlot {
                version: slot.version + 1,
                ..slot.with_booking_released()
            };
        }
        Ok(true)
    }

    async fn commit_transition(&self, write: &TransitionWrite) -> ClinicResult<Commit<Appointment>> {
        let mut tables = self.write().await?;

        let id = write.appointment.id;
        let (current_status, current_payment) = match tables.appointments.get(&id) {
            Some(current) => (current.status, current.payment_status),
            None => {
                return Err(ClinicError::NotFound(format!(
                    "Appointment with ID {} not found",
                    id
                )));
            }
        };
        if current_status != write.expected_status || current_payment != write.expected_payment {
            return Ok(Commit::Stale);
        }

        if let Some(slot) = &write.slot {
            if let Commit::Stale = tables.apply_slot_write(slot)? {
                return Ok(Commit::Stale);
            }
        }

        tables.appointments.insert(id, write.appointment.clone());
        Ok(Commit::Applied(write.appointment.clone()))
    }
}
