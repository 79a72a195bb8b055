#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use slotbook_core::{
    auth::{Actor, AuthorizationGuard, RoleGuard},
    clock::FixedClock,
    errors::ClinicResult,
    ledger::{BalanceLedger, MemoryLedger},
    models::{
        appointment::{Appointment, ReserveRequest},
        schedule::{CascadeSummary, CreateScheduleRequest, DeletePolicy, Schedule, ScheduleWithSlots},
        time_slot::{SlotWrite, TimeSlot},
    },
    services::{AvailabilityQuery, BookingCoordinator, RetryPolicy, ScheduleService, ScheduleSettings},
    store::{Commit, MemoryStore, SchedulingStore, TransitionWrite},
};
use uuid::Uuid;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

pub fn work_day() -> NaiveDate {
    date(2025, 6, 1)
}

pub fn create_request(start: NaiveTime, end: NaiveTime, slot_minutes: i32) -> CreateScheduleRequest {
    CreateScheduleRequest {
        work_date: work_day(),
        start_time: start,
        end_time: end,
        slot_minutes: Some(slot_minutes),
        location: Some("Room 4".to_string()),
        publish: None,
    }
}

pub fn reserve_request(patient_id: Uuid, time_slot_id: Uuid) -> ReserveRequest {
    ReserveRequest {
        patient_id,
        time_slot_id,
        reason: Some("Check-up".to_string()),
        points: 0,
    }
}

pub struct Fixture {
    pub store: Arc<dyn SchedulingStore>,
    pub schedules: ScheduleService,
    pub bookings: BookingCoordinator,
    pub availability: AvailabilityQuery,
    pub provider_id: Uuid,
    pub admin: Actor,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_ledger(Arc::new(MemoryLedger::new()))
    }

    pub fn with_ledger(ledger: Arc<dyn BalanceLedger>) -> Self {
        Self::build(Arc::new(MemoryStore::default()), ledger, Arc::new(RoleGuard), ScheduleSettings::default())
    }

    pub fn build(
        store: Arc<dyn SchedulingStore>,
        ledger: Arc<dyn BalanceLedger>,
        guard: Arc<dyn AuthorizationGuard>,
        settings: ScheduleSettings,
    ) -> Self {
        let clock = Arc::new(FixedClock(Utc.with_ymd_and_hms(2025, 5, 20, 8, 0, 0).unwrap()));
        Self {
            schedules: ScheduleService::new(store.clone(), guard.clone(), clock.clone(), settings),
            bookings: BookingCoordinator::new(
                store.clone(),
                guard,
                ledger,
                clock,
                RetryPolicy::default(),
            ),
            availability: AvailabilityQuery::new(store.clone()),
            store,
            provider_id: Uuid::new_v4(),
            admin: Actor::admin(Uuid::new_v4()),
        }
    }

    pub fn provider(&self) -> Actor {
        Actor::provider(self.provider_id)
    }

    /// 09:00-09:45 in 15 minute slots on 2025-06-01.
    pub async fn morning(&self) -> ScheduleWithSlots {
        self.schedules
            .create_schedule(&self.provider(), self.provider_id, create_request(time(9, 0), time(9, 45), 15))
            .await
            .unwrap()
    }

    pub async fn set_capacity(&self, slot_id: Uuid, capacity: i32) -> TimeSlot {
        let slot = self.store.get_time_slot(slot_id).await.unwrap().unwrap();
        let mut next = slot.clone();
        next.capacity = capacity;
        next.status = next.derived_status();
        match self.store.update_time_slot(&SlotWrite::new(&slot, next)).await.unwrap() {
            Commit::Applied(slot) => slot,
            Commit::Stale => panic!("slot changed while setting capacity"),
        }
    }

    pub async fn reserve(&self, patient_id: Uuid, slot_id: Uuid) -> ClinicResult<Appointment> {
        self.bookings
            .reserve(&Actor::patient(patient_id), reserve_request(patient_id, slot_id))
            .await
    }

    pub async fn slot(&self, slot_id: Uuid) -> TimeSlot {
        self.store.get_time_slot(slot_id).await.unwrap().unwrap()
    }
}

/// Delegates to a [`MemoryStore`] but reports every reservation as having
/// lost its race.
#[derive(Default)]
pub struct AlwaysStaleStore {
    inner: MemoryStore,
}

#[async_trait]
impl SchedulingStore for AlwaysStaleStore {
    async fn insert_schedule(&self, schedule: &Schedule, slots: &[TimeSlot]) -> ClinicResult<()> {
        self.inner.insert_schedule(schedule, slots).await
    }

    async fn get_schedule(&self, id: Uuid) -> ClinicResult<Option<Schedule>> {
        self.inner.get_schedule(id).await
    }

    async fn find_schedule_for_day(&self, provider_id: Uuid, work_date: NaiveDate) -> ClinicResult<Option<Schedule>> {
        self.inner.find_schedule_for_day(provider_id, work_date).await
    }

    async fn list_schedules(
        &self,
        provider_id: Uuid,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> ClinicResult<Vec<Schedule>> {
        self.inner.list_schedules(provider_id, from, to).await
    }

    async fn set_published(&self, id: Uuid, published: bool) -> ClinicResult<Option<Schedule>> {
        self.inner.set_published(id, published).await
    }

    async fn delete_schedule(&self, id: Uuid, policy: DeletePolicy) -> ClinicResult<Option<CascadeSummary>> {
        self.inner.delete_schedule(id, policy).await
    }

    async fn get_time_slot(&self, id: Uuid) -> ClinicResult<Option<TimeSlot>> {
        self.inner.get_time_slot(id).await
    }

    async fn list_time_slots(&self, schedule_id: Uuid) -> ClinicResult<Vec<TimeSlot>> {
        self.inner.list_time_slots(schedule_id).await
    }

    async fn update_time_slot(&self, write: &SlotWrite) -> ClinicResult<Commit<TimeSlot>> {
        self.inner.update_time_slot(write).await
    }

    async fn list_published_slots(&self, provider_id: Uuid, date: NaiveDate) -> ClinicResult<Vec<TimeSlot>> {
        self.inner.list_published_slots(provider_id, date).await
    }

    async fn providers_with_open_slots(&self, date: NaiveDate) -> ClinicResult<Vec<Uuid>> {
        self.inner.providers_with_open_slots(date).await
    }

    async fn get_appointment(&self, id: Uuid) -> ClinicResult<Option<Appointment>> {
        self.inner.get_appointment(id).await
    }

    async fn find_active_appointment(&self, patient_id: Uuid, time_slot_id: Uuid) -> ClinicResult<Option<Appointment>> {
        self.inner.find_active_appointment(patient_id, time_slot_id).await
    }

    async fn list_patient_appointments(&self, patient_id: Uuid) -> ClinicResult<Vec<Appointment>> {
        self.inner.list_patient_appointments(patient_id).await
    }

    async fn list_schedule_appointments(&self, schedule_id: Uuid) -> ClinicResult<Vec<Appointment>> {
        self.inner.list_schedule_appointments(schedule_id).await
    }

    async fn commit_reservation(&self, _slot: &SlotWrite, _appointment: &Appointment) -> ClinicResult<Commit<TimeSlot>> {
        Ok(Commit::Stale)
    }

    async fn discard_reservation(&self, appointment_id: Uuid) -> ClinicResult<bool> {
        self.inner.discard_reservation(appointment_id).await
    }

    async fn commit_transition(&self, write: &TransitionWrite) -> ClinicResult<Commit<Appointment>> {
        self.inner.commit_transition(write).await
    }
}

/// A [`MemoryLedger`] whose debits or credits park until [`GatedLedger::open`]
/// is called, so a test can act while a ledger call is in flight.
#[derive(Default)]
pub struct GatedLedger {
    pub inner: MemoryLedger,
    gate: Notify,
    hold_debits: bool,
    hold_credits: bool,
    fail_debits: bool,
}

impl GatedLedger {
    pub fn holding_debits() -> Self {
        Self { hold_debits: true, ..Self::default() }
    }

    /// Parks each debit and then fails it.
    pub fn failing_debits() -> Self {
        Self { hold_debits: true, fail_debits: true, ..Self::default() }
    }

    pub fn holding_credits() -> Self {
        Self { hold_credits: true, ..Self::default() }
    }

    pub fn open(&self) {
        self.gate.notify_one();
    }
}

#[async_trait]
impl BalanceLedger for GatedLedger {
    async fn debit(&self, user_id: Uuid, points: i32) -> eyre::Result<()> {
        if self.hold_debits {
            self.gate.notified().await;
        }
        if self.fail_debits {
            return Err(eyre::eyre!("ledger unreachable"));
        }
        self.inner.debit(user_id, points).await
    }

    async fn credit(&self, user_id: Uuid, points: i32) -> eyre::Result<()> {
        if self.hold_credits {
            self.gate.notified().await;
        }
        self.inner.credit(user_id, points).await
    }
}

/// Polls the store until `check` accepts the appointment row.
pub async fn wait_for_appointment(
    store: &Arc<dyn SchedulingStore>,
    patient_id: Uuid,
    time_slot_id: Uuid,
    check: impl Fn(&Appointment) -> bool,
) -> Appointment {
    for _ in 0..500 {
        if let Some(found) = store.find_active_appointment(patient_id, time_slot_id).await.unwrap() {
            if check(&found) {
                return found;
            }
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("appointment for patient {} never reached the expected state", patient_id);
}
