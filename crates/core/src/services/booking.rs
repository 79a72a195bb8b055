//! Reservation and appointment lifecycle against bounded slot capacity.
//!
//! Each booking decision is a read-validate-commit cycle. The commit carries
//! the slot version (and appointment status) that was validated, so the store
//! rejects it if anything moved in between and the cycle starts over from a
//! fresh read. A slot can therefore never be incremented past its capacity,
//! no matter how many reservations race for it: every loser re-reads the slot
//! as Full and is turned away with `SlotUnavailable`.

use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::RetryPolicy;
use crate::auth::{Actor, AuthorizationGuard};
use crate::clock::Clock;
use crate::errors::{ClinicError, ClinicResult};
use crate::ledger::BalanceLedger;
use crate::lifecycle::{normalize_text, validate_transition};
use crate::models::{
    appointment::{
        Appointment, AppointmentStatus, MAX_CANCELLATION_REASON_LEN, MAX_NOTES_LEN,
        MAX_REASON_LEN, PaymentStatus, ReserveRequest,
    },
    time_slot::SlotWrite,
};
use crate::store::{Commit, SchedulingStore, TransitionWrite};

#[derive(Clone)]
pub struct BookingCoordinator {
    store: Arc<dyn SchedulingStore>,
    guard: Arc<dyn AuthorizationGuard>,
    ledger: Arc<dyn BalanceLedger>,
    clock: Arc<dyn Clock>,
    retry: RetryPolicy,
}

impl BookingCoordinator {
    pub fn new(
        store: Arc<dyn SchedulingStore>,
        guard: Arc<dyn AuthorizationGuard>,
        ledger: Arc<dyn BalanceLedger>,
        clock: Arc<dyn Clock>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            guard,
            ledger,
            clock,
            retry,
        }
    }

    async fn load_appointment(&self, id: Uuid) -> ClinicResult<Appointment> {
        self.store
            .get_appointment(id)
            .await?
            .ok_or_else(|| ClinicError::NotFound(format!("Appointment with ID {} not found", id)))
    }

    fn busy(&self, what: &str, id: Uuid) -> ClinicError {
        ClinicError::Busy(format!(
            "{} {} is under contention after {} attempts, try again",
            what, id, self.retry.max_attempts
        ))
    }

    /// Books `request.time_slot_id` for `request.patient_id`.
    ///
    /// Points, when requested, are debited after the booking commits; a
    /// failed debit discards the booking again before returning.
    #[instrument(skip(self, request), fields(
        actor = %actor.user_id,
        patient_id = %request.patient_id,
        time_slot_id = %request.time_slot_id,
    ))]
    pub async fn reserve(&self, actor: &Actor, request: ReserveRequest) -> ClinicResult<Appointment> {
        if !self.guard.can_book_for(actor, request.patient_id) {
            return Err(ClinicError::Forbidden(format!(
                "Actor {} may not book for patient {}",
                actor.user_id, request.patient_id
            )));
        }
        if request.points < 0 {
            return Err(ClinicError::InvalidParameter(format!(
                "points must be >= 0, got {}",
                request.points
            )));
        }
        let reason = normalize_text("reason", request.reason.as_deref(), MAX_REASON_LEN)?;

        for attempt in 1..=self.retry.max_attempts {
            match self.try_reserve(&request, reason.clone()).await? {
                Commit::Applied(appointment) => {
                    let appointment = self.settle_points(appointment).await?;
                    info!(
                        "Reserved time slot {} for patient {} as appointment {}",
                        appointment.time_slot_id, appointment.patient_id, appointment.id
                    );
                    return Ok(appointment);
                }
                Commit::Stale => {
                    warn!(
                        "Time slot {} changed during reservation, retrying attempt {}/{}",
                        request.time_slot_id, attempt, self.retry.max_attempts
                    );
                    self.retry.wait(attempt).await;
                }
            }
        }

        Err(self.busy("Time slot", request.time_slot_id))
    }

    async fn try_reserve(
        &self,
        request: &ReserveRequest,
        reason: Option<String>,
    ) -> ClinicResult<Commit<Appointment>> {
        let slot = self
            .store
            .get_time_slot(request.time_slot_id)
            .await?
            .ok_or_else(|| {
                ClinicError::NotFound(format!(
                    "Time slot with ID {} not found",
                    request.time_slot_id
                ))
            })?;
        let schedule = self
            .store
            .get_schedule(slot.schedule_id)
            .await?
            .ok_or_else(|| {
                ClinicError::NotFound(format!("Schedule with ID {} not found", slot.schedule_id))
            })?;

        if !schedule.published {
            return Err(ClinicError::SlotUnavailable(format!(
                "Schedule {} is not published",
                schedule.id
            )));
        }
        let Some(booked) = slot.with_booking_added() else {
            return Err(ClinicError::SlotUnavailable(format!(
                "Time slot {} is {}",
                slot.id, slot.status
            )));
        };

        if self
            .store
            .find_active_appointment(request.patient_id, slot.id)
            .await?
            .is_some()
        {
            return Err(ClinicError::DuplicateBooking(format!(
                "Patient {} already holds time slot {}",
                request.patient_id, slot.id
            )));
        }

        let appointment = Appointment {
            id: Uuid::new_v4(),
            doctor_id: schedule.provider_id,
            patient_id: request.patient_id,
            time_slot_id: slot.id,
            status: AppointmentStatus::Booked,
            reason,
            notes: None,
            cancellation_reason: None,
            points_used: request.points,
            // Becomes Paid only once settle_points has debited the ledger.
            payment_status: if request.points > 0 {
                PaymentStatus::Pending
            } else {
                PaymentStatus::Unpaid
            },
            created_at: self.clock.now(),
            updated_at: None,
        };

        let committed = self
            .store
            .commit_reservation(&SlotWrite::new(&slot, booked), &appointment)
            .await?;
        Ok(match committed {
            Commit::Applied(_) => Commit::Applied(appointment),
            Commit::Stale => Commit::Stale,
        })
    }

    /// Debits the points of a freshly committed reservation and records the
    /// payment. A failed debit discards the reservation again.
    async fn settle_points(&self, appointment: Appointment) -> ClinicResult<Appointment> {
        if appointment.points_used == 0 {
            return Ok(appointment);
        }
        if let Err(debit_error) = self
            .ledger
            .debit(appointment.patient_id, appointment.points_used)
            .await
        {
            warn!(
                "Debit of {} points for appointment {} failed, discarding reservation: {}",
                appointment.points_used, appointment.id, debit_error
            );
            match self.store.discard_reservation(appointment.id).await {
                Ok(true) => {}
                Ok(false) => info!(
                    "Appointment {} was cancelled before its debit failed, keeping it",
                    appointment.id
                ),
                Err(discard_error) => {
                    error!(
                        "Could not discard appointment {} after failed debit: {}",
                        appointment.id, discard_error
                    );
                    return Err(discard_error);
                }
            }
            return Err(ClinicError::DependencyFailure(format!(
                "points debit failed: {}",
                debit_error
            )));
        }

        for attempt in 1..=self.retry.max_attempts {
            let current = match self.store.get_appointment(appointment.id).await? {
                Some(current) if current.is_active() => current,
                other => {
                    // Cancelled or removed while the debit was in flight; nobody
                    // else will hand these points back.
                    self.return_points(&appointment).await;
                    if let Some(cancelled) = other {
                        let mut refunded = cancelled.clone();
                        refunded.payment_status = PaymentStatus::Refunded;
                        if let Err(e) = self
                            .store
                            .commit_transition(&TransitionWrite::new(&cancelled, refunded))
                            .await
                        {
                            warn!(
                                "Could not mark appointment {} as refunded: {}",
                                cancelled.id, e
                            );
                        }
                    }
                    return Err(ClinicError::Conflict(format!(
                        "Appointment {} was cancelled before its payment settled",
                        appointment.id
                    )));
                }
            };

            let mut paid = current.clone();
            paid.payment_status = PaymentStatus::Paid;
            match self
                .store
                .commit_transition(&TransitionWrite::new(&current, paid))
                .await?
            {
                Commit::Applied(paid) => return Ok(paid),
                Commit::Stale => {
                    warn!(
                        "Appointment {} changed while settling payment, retrying attempt {}/{}",
                        appointment.id, attempt, self.retry.max_attempts
                    );
                    self.retry.wait(attempt).await;
                }
            }
        }

        self.return_points(&appointment).await;
        self.store.discard_reservation(appointment.id).await?;
        Err(self.busy("Appointment", appointment.id))
    }

    async fn return_points(&self, appointment: &Appointment) {
        if let Err(e) = self
            .ledger
            .credit(appointment.patient_id, appointment.points_used)
            .await
        {
            error!(
                "Could not return {} points for appointment {}: {}",
                appointment.points_used, appointment.id, e
            );
        }
    }

    /// Cancels an appointment and hands its unit of capacity back to the slot.
    ///
    /// Paid points are refunded before the cancellation commits. The refund
    /// is claimed first by moving the payment from Paid to Refunded, so only
    /// one cancel can ever credit it; a failed credit or commit undoes the
    /// claim and leaves the appointment as it was.
    #[instrument(skip(self, reason), fields(actor = %actor.user_id))]
    pub async fn cancel(
        &self,
        actor: &Actor,
        appointment_id: Uuid,
        reason: &str,
    ) -> ClinicResult<Appointment> {
        let reason = normalize_text(
            "cancellation_reason",
            Some(reason),
            MAX_CANCELLATION_REASON_LEN,
        )?;

        let appointment = self.load_appointment(appointment_id).await?;
        if !self.guard.can_cancel_appointment(actor, &appointment) {
            return Err(ClinicError::Forbidden(format!(
                "Actor {} may not cancel appointment {}",
                actor.user_id, appointment_id
            )));
        }
        validate_transition(appointment.status, AppointmentStatus::Cancelled)?;

        let refund = self.claim_refund(appointment_id).await?;
        if refund {
            if let Err(e) = self
                .ledger
                .credit(appointment.patient_id, appointment.points_used)
                .await
            {
                self.release_refund_claim(appointment_id).await;
                return Err(ClinicError::DependencyFailure(format!(
                    "points credit failed: {}",
                    e
                )));
            }
        }

        match self.commit_cancellation(appointment_id, reason).await {
            Ok(cancelled) => {
                info!(
                    "Cancelled appointment {} on time slot {}",
                    cancelled.id, cancelled.time_slot_id
                );
                Ok(cancelled)
            }
            Err(e) => {
                if refund {
                    if let Err(undo) = self
                        .ledger
                        .debit(appointment.patient_id, appointment.points_used)
                        .await
                    {
                        error!(
                            "Could not reverse refund of {} points for appointment {}: {}",
                            appointment.points_used, appointment_id, undo
                        );
                    }
                    self.release_refund_claim(appointment_id).await;
                }
                Err(e)
            }
        }
    }

    /// Moves a Paid appointment to Refunded ahead of the credit. Returns
    /// false when there is nothing to refund. A Refunded appointment that is
    /// not yet cancelled has a refund in flight and is waited on.
    async fn claim_refund(&self, appointment_id: Uuid) -> ClinicResult<bool> {
        for attempt in 1..=self.retry.max_attempts {
            let current = self.load_appointment(appointment_id).await?;
            validate_transition(current.status, AppointmentStatus::Cancelled)?;
            if current.points_used == 0 {
                return Ok(false);
            }

            match current.payment_status {
                PaymentStatus::Paid => {
                    let mut claimed = current.clone();
                    claimed.payment_status = PaymentStatus::Refunded;
                    if let Commit::Applied(_) = self
                        .store
                        .commit_transition(&TransitionWrite::new(&current, claimed))
                        .await?
                    {
                        return Ok(true);
                    }
                }
                PaymentStatus::Refunded => {
                    debug!("Appointment {} has a refund in flight", appointment_id);
                }
                _ => return Ok(false),
            }
            self.retry.wait(attempt).await;
        }
        Err(self.busy("Appointment", appointment_id))
    }

    /// Puts a claimed but unfinished refund back to Paid.
    async fn release_refund_claim(&self, appointment_id: Uuid) {
        for attempt in 1..=self.retry.max_attempts {
            let current = match self.store.get_appointment(appointment_id).await {
                Ok(Some(current)) => current,
                Ok(None) => return,
                Err(e) => {
                    error!("Could not reload appointment {}: {}", appointment_id, e);
                    return;
                }
            };
            if current.payment_status != PaymentStatus::Refunded || !current.is_active() {
                return;
            }

            let mut paid = current.clone();
            paid.payment_status = PaymentStatus::Paid;
            match self
                .store
                .commit_transition(&TransitionWrite::new(&current, paid))
                .await
            {
                Ok(Commit::Applied(_)) => return,
                Ok(Commit::Stale) => self.retry.wait(attempt).await,
                Err(e) => {
                    error!("Could not restore payment of appointment {}: {}", appointment_id, e);
                    return;
                }
            }
        }
        error!(
            "Appointment {} kept a Refunded payment without a refund",
            appointment_id
        );
    }

    async fn commit_cancellation(
        &self,
        appointment_id: Uuid,
        reason: Option<String>,
    ) -> ClinicResult<Appointment> {
        for attempt in 1..=self.retry.max_attempts {
            let current = self.load_appointment(appointment_id).await?;
            validate_transition(current.status, AppointmentStatus::Cancelled)?;

            let slot = self
                .store
                .get_time_slot(current.time_slot_id)
                .await?
                .map(|slot| {
                    let released = slot.with_booking_released();
                    SlotWrite::new(&slot, released)
                });

            let mut cancelled = current.clone();
            cancelled.status = AppointmentStatus::Cancelled;
            cancelled.cancellation_reason = reason.clone();
            cancelled.updated_at = Some(self.clock.now());

            let write = TransitionWrite::new(&current, cancelled).with_slot(slot);
            match self.store.commit_transition(&write).await? {
                Commit::Applied(appointment) => return Ok(appointment),
                Commit::Stale => {
                    warn!(
                        "Appointment {} changed during cancellation, retrying attempt {}/{}",
                        appointment_id, attempt, self.retry.max_attempts
                    );
                    self.retry.wait(attempt).await;
                }
            }
        }
        Err(self.busy("Appointment", appointment_id))
    }

    pub async fn check_in(&self, actor: &Actor, appointment_id: Uuid) -> ClinicResult<Appointment> {
        self.transition(actor, appointment_id, AppointmentStatus::CheckedIn, None)
            .await
    }

    pub async fn complete(
        &self,
        actor: &Actor,
        appointment_id: Uuid,
        notes: Option<&str>,
    ) -> ClinicResult<Appointment> {
        let notes = normalize_text("notes", notes, MAX_NOTES_LEN)?;
        self.transition(actor, appointment_id, AppointmentStatus::Completed, notes)
            .await
    }

    pub async fn mark_no_show(&self, actor: &Actor, appointment_id: Uuid) -> ClinicResult<Appointment> {
        self.transition(actor, appointment_id, AppointmentStatus::NoShow, None)
            .await
    }

    /// Single-row status change; the slot already counts this appointment.
    #[instrument(skip(self, notes), fields(actor = %actor.user_id))]
    async fn transition(
        &self,
        actor: &Actor,
        appointment_id: Uuid,
        target: AppointmentStatus,
        notes: Option<String>,
    ) -> ClinicResult<Appointment> {
        for attempt in 1..=self.retry.max_attempts {
            let current = self.load_appointment(appointment_id).await?;
            if !self.guard.can_manage_appointment(actor, &current) {
                return Err(ClinicError::Forbidden(format!(
                    "Actor {} may not manage appointment {}",
                    actor.user_id, appointment_id
                )));
            }
            validate_transition(current.status, target)?;

            let mut next = current.clone();
            next.status = target;
            next.updated_at = Some(self.clock.now());
            if notes.is_some() {
                next.notes = notes.clone();
            }

            match self
                .store
                .commit_transition(&TransitionWrite::new(&current, next))
                .await?
            {
                Commit::Applied(appointment) => {
                    info!("Appointment {} is now {}", appointment_id, target);
                    return Ok(appointment);
                }
                Commit::Stale => {
                    warn!(
                        "Appointment {} changed during transition to {}, retrying attempt {}/{}",
                        appointment_id, target, attempt, self.retry.max_attempts
                    );
                    self.retry.wait(attempt).await;
                }
            }
        }
        Err(self.busy("Appointment", appointment_id))
    }

    pub async fn get_appointment(&self, actor: &Actor, appointment_id: Uuid) -> ClinicResult<Appointment> {
        let appointment = self.load_appointment(appointment_id).await?;
        if appointment.patient_id != actor.user_id
            && !self.guard.can_manage_appointment(actor, &appointment)
        {
            return Err(ClinicError::Forbidden(format!(
                "Actor {} may not view appointment {}",
                actor.user_id, appointment_id
            )));
        }
        Ok(appointment)
    }

    pub async fn list_patient_appointments(
        &self,
        actor: &Actor,
        patient_id: Uuid,
    ) -> ClinicResult<Vec<Appointment>> {
        if !self.guard.can_book_for(actor, patient_id) {
            return Err(ClinicError::Forbidden(format!(
                "Actor {} may not view appointments of patient {}",
                actor.user_id, patient_id
            )));
        }
        self.store.list_patient_appointments(patient_id).await
    }

    /// Appointments across one schedule, for its provider or an admin.
    pub async fn list_schedule_appointments(
        &self,
        actor: &Actor,
        schedule_id: Uuid,
    ) -> ClinicResult<Vec<Appointment>> {
        let schedule = self.store.get_schedule(schedule_id).await?.ok_or_else(|| {
            ClinicError::NotFound(format!("Schedule with ID {} not found", schedule_id))
        })?;
        if !self.guard.can_manage_schedule(actor, schedule.provider_id) {
            return Err(ClinicError::Forbidden(format!(
                "Actor {} may not view appointments of schedule {}",
                actor.user_id, schedule_id
            )));
        }
        self.store.list_schedule_appointments(schedule_id).await
    }
}
