//! Transactional storage contract for schedules, time slots and appointments.
//!
//! Every method is one isolation unit on the backing store. Writers that
//! depend on a value they read earlier pass the version (or status) they
//! observed; the store applies the write only if it still holds and reports
//! [`Commit::Stale`] otherwise. Callers retry from a fresh read.

pub mod memory;

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::errors::ClinicResult;
use crate::models::{
    appointment::{Appointment, AppointmentStatus, PaymentStatus},
    schedule::{CascadeSummary, DeletePolicy, Schedule},
    time_slot::{SlotWrite, TimeSlot},
};

pub use memory::MemoryStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Commit<T> {
    Applied(T),
    /// Another writer got there first; nothing was written.
    Stale,
}

/// An appointment update applied only while the row still has
/// `expected_status` and `expected_payment`, optionally together with a
/// versioned slot write.
#[derive(Debug, Clone)]
pub struct TransitionWrite {
    pub appointment: Appointment,
    pub expected_status: AppointmentStatus,
    pub expected_payment: PaymentStatus,
    pub slot: Option<SlotWrite>,
}

impl TransitionWrite {
    /// Replaces `current` with `next`, guarded on what was read.
    pub fn new(current: &Appointment, next: Appointment) -> Self {
        Self {
            appointment: next,
            expected_status: current.status,
            expected_payment: current.payment_status,
            slot: None,
        }
    }

    pub fn with_slot(mut self, slot: Option<SlotWrite>) -> Self {
        self.slot = slot;
        self
    }
}

#[async_trait]
pub trait SchedulingStore: Send + Sync {
    /// Stores a schedule and all of its slots, or nothing.
    ///
    /// Fails with `Conflict` when the provider already has a schedule on that
    /// date.
    async fn insert_schedule(&self, schedule: &Schedule, slots: &[TimeSlot]) -> ClinicResult<()>;

    async fn get_schedule(&self, id: Uuid) -> ClinicResult<Option<Schedule>>;

    async fn find_schedule_for_day(
        &self,
        provider_id: Uuid,
        work_date: NaiveDate,
    ) -> ClinicResult<Option<Schedule>>;

    /// Ordered by work date. Bounds are inclusive.
    async fn list_schedules(
        &self,
        provider_id: Uuid,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> ClinicResult<Vec<Schedule>>;

    async fn set_published(&self, id: Uuid, published: bool) -> ClinicResult<Option<Schedule>>;

    /// Removes the schedule, its slots and their appointments in one
    /// transaction. `None` when the schedule does not exist.
    async fn delete_schedule(
        &self,
        id: Uuid,
        policy: DeletePolicy,
    ) -> ClinicResult<Option<CascadeSummary>>;

    async fn get_time_slot(&self, id: Uuid) -> ClinicResult<Option<TimeSlot>>;

    /// Ordered by start time.
    async fn list_time_slots(&self, schedule_id: Uuid) -> ClinicResult<Vec<TimeSlot>>;

    async fn update_time_slot(&self, write: &SlotWrite) -> ClinicResult<Commit<TimeSlot>>;

    /// Every slot of the provider's published schedule on `date`, ordered by
    /// start time.
    async fn list_published_slots(
        &self,
        provider_id: Uuid,
        date: NaiveDate,
    ) -> ClinicResult<Vec<TimeSlot>>;

    /// Providers with at least one bookable slot on a published schedule.
    async fn providers_with_open_slots(&self, date: NaiveDate) -> ClinicResult<Vec<Uuid>>;

    async fn get_appointment(&self, id: Uuid) -> ClinicResult<Option<Appointment>>;

    /// The non-cancelled appointment of `patient_id` on `time_slot_id`, if any.
    async fn find_active_appointment(
        &self,
        patient_id: Uuid,
        time_slot_id: Uuid,
    ) -> ClinicResult<Option<Appointment>>;

    /// Newest first.
    async fn list_patient_appointments(&self, patient_id: Uuid) -> ClinicResult<Vec<Appointment>>;

    /// Every appointment on the schedule's slots, in slot order.
    async fn list_schedule_appointments(&self, schedule_id: Uuid) -> ClinicResult<Vec<Appointment>>;

    /// Applies the slot write and inserts the appointment together.
    ///
    /// Fails with `DuplicateBooking` if the patient already holds a
    /// non-cancelled appointment on the slot.
    async fn commit_reservation(
        &self,
        slot: &SlotWrite,
        appointment: &Appointment,
    ) -> ClinicResult<Commit<TimeSlot>>;

    /// Undoes a reservation whose payment failed.
    ///
    /// Only an active appointment whose payment is still `Pending` is
    /// removed, together with its unit of capacity; returns whether that
    /// happened. An appointment cancelled in the meantime already gave its
    /// unit back, so it is kept with its payment marked `Failed`.
    async fn discard_reservation(&self, appointment_id: Uuid) -> ClinicResult<bool>;

    async fn commit_transition(&self, write: &TransitionWrite) -> ClinicResult<Commit<Appointment>>;
}
