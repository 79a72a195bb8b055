//! Schedule lifecycle: creation with generated slots, publication, deletion
//! and administrative slot closing.

use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::RetryPolicy;
use crate::auth::{Actor, AuthorizationGuard};
use crate::clock::Clock;
use crate::errors::{ClinicError, ClinicResult};
use crate::lifecycle::normalize_text;
use crate::models::{
    schedule::{
        CascadeSummary, CreateScheduleRequest, DEFAULT_SLOT_MINUTES, DeletePolicy,
        MAX_LOCATION_LEN, PreviewSlotsRequest, Schedule, ScheduleWithSlots,
    },
    time_slot::{SlotWrite, TimeSlot},
};
use crate::slot_generator;
use crate::store::{Commit, SchedulingStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleSettings {
    /// Used when a create request leaves `slot_minutes` out.
    pub default_slot_minutes: i32,
    pub delete_policy: DeletePolicy,
    pub retry: RetryPolicy,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            default_slot_minutes: DEFAULT_SLOT_MINUTES,
            delete_policy: DeletePolicy::Cascade,
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Clone)]
pub struct ScheduleService {
    store: Arc<dyn SchedulingStore>,
    guard: Arc<dyn AuthorizationGuard>,
    clock: Arc<dyn Clock>,
    settings: ScheduleSettings,
}

impl ScheduleService {
    pub fn new(
        store: Arc<dyn SchedulingStore>,
        guard: Arc<dyn AuthorizationGuard>,
        clock: Arc<dyn Clock>,
        settings: ScheduleSettings,
    ) -> Self {
        Self {
            store,
            guard,
            clock,
            settings,
        }
    }

    fn authorize(&self, actor: &Actor, provider_id: Uuid) -> ClinicResult<()> {
        if self.guard.can_manage_schedule(actor, provider_id) {
            Ok(())
        } else {
            Err(ClinicError::Forbidden(format!(
                "Actor {} may not manage schedules of provider {}",
                actor.user_id, provider_id
            )))
        }
    }

    async fn load_schedule(&self, id: Uuid) -> ClinicResult<Schedule> {
        self.store
            .get_schedule(id)
            .await?
            .ok_or_else(|| ClinicError::NotFound(format!("Schedule with ID {} not found", id)))
    }

    /// Creates a schedule and its full slot grid as one unit.
    #[instrument(skip(self, request), fields(actor = %actor.user_id))]
    pub async fn create_schedule(
        &self,
        actor: &Actor,
        provider_id: Uuid,
        request: CreateScheduleRequest,
    ) -> ClinicResult<ScheduleWithSlots> {
        self.authorize(actor, provider_id)?;

        let slot_minutes = request
            .slot_minutes
            .unwrap_or(self.settings.default_slot_minutes);
        let location = normalize_text("location", request.location.as_deref(), MAX_LOCATION_LEN)?;

        let schedule = Schedule {
            id: Uuid::new_v4(),
            provider_id,
            work_date: request.work_date,
            start_time: request.start_time,
            end_time: request.end_time,
            slot_minutes,
            location,
            published: request.publish.unwrap_or(true),
            created_at: self.clock.now(),
        };
        let time_slots = slot_generator::generate(
            schedule.id,
            schedule.start_time,
            schedule.end_time,
            schedule.slot_minutes,
        )?;

        if self
            .store
            .find_schedule_for_day(provider_id, schedule.work_date)
            .await?
            .is_some()
        {
            return Err(ClinicError::Conflict(format!(
                "Schedule already exists for provider {} on {}",
                provider_id, schedule.work_date
            )));
        }

        self.store.insert_schedule(&schedule, &time_slots).await?;
        info!(
            "Created schedule {} for provider {} on {} with {} slots",
            schedule.id,
            provider_id,
            schedule.work_date,
            time_slots.len()
        );

        Ok(ScheduleWithSlots {
            schedule,
            time_slots,
        })
    }

    /// Runs the slot generator without storing anything.
    pub fn preview_slots(&self, request: &PreviewSlotsRequest) -> ClinicResult<Vec<TimeSlot>> {
        slot_generator::generate(
            Uuid::nil(),
            request.start_time,
            request.end_time,
            request
                .slot_minutes
                .unwrap_or(self.settings.default_slot_minutes),
        )
    }

    pub async fn publish(&self, actor: &Actor, id: Uuid) -> ClinicResult<Schedule> {
        self.set_published(actor, id, true).await
    }

    pub async fn unpublish(&self, actor: &Actor, id: Uuid) -> ClinicResult<Schedule> {
        self.set_published(actor, id, false).await
    }

    async fn set_published(&self, actor: &Actor, id: Uuid, published: bool) -> ClinicResult<Schedule> {
        let schedule = self.load_schedule(id).await?;
        self.authorize(actor, schedule.provider_id)?;
        if schedule.published == published {
            return Ok(schedule);
        }
        let schedule = self
            .store
            .set_published(id, published)
            .await?
            .ok_or_else(|| ClinicError::NotFound(format!("Schedule with ID {} not found", id)))?;
        info!("Schedule {} published={}", id, published);
        Ok(schedule)
    }

    /// Deletes a schedule with its slots and appointments, subject to the
    /// configured [`DeletePolicy`].
    #[instrument(skip(self), fields(actor = %actor.user_id))]
    pub async fn delete_schedule(&self, actor: &Actor, id: Uuid) -> ClinicResult<CascadeSummary> {
        let schedule = self.load_schedule(id).await?;
        self.authorize(actor, schedule.provider_id)?;

        let summary = self
            .store
            .delete_schedule(id, self.settings.delete_policy)
            .await?
            .ok_or_else(|| ClinicError::NotFound(format!("Schedule with ID {} not found", id)))?;

        if summary.appointments_removed > 0 {
            warn!(
                "Deleting schedule {} discarded {} appointments",
                id, summary.appointments_removed
            );
        }
        info!(
            "Deleted schedule {} and {} time slots",
            id, summary.time_slots_removed
        );
        Ok(summary)
    }

    pub async fn get_schedule(&self, id: Uuid) -> ClinicResult<ScheduleWithSlots> {
        let schedule = self.load_schedule(id).await?;
        let time_slots = self.store.list_time_slots(id).await?;
        Ok(ScheduleWithSlots {
            schedule,
            time_slots,
        })
    }

    pub async fn list_schedules(
        &self,
        provider_id: Uuid,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> ClinicResult<Vec<Schedule>> {
        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                return Err(ClinicError::InvalidRange(format!(
                    "from {} is after to {}",
                    from, to
                )));
            }
        }
        self.store.list_schedules(provider_id, from, to).await
    }

    pub async fn get_time_slot(&self, id: Uuid) -> ClinicResult<TimeSlot> {
        self.store
            .get_time_slot(id)
            .await?
            .ok_or_else(|| ClinicError::NotFound(format!("Time slot with ID {} not found", id)))
    }

    /// Takes a slot out of booking regardless of its count. Existing
    /// appointments are kept.
    pub async fn close_slot(&self, actor: &Actor, id: Uuid) -> ClinicResult<TimeSlot> {
        self.update_slot(actor, id, TimeSlot::closed).await
    }

    /// Lifts an administrative close; the slot becomes Open or Full from its count.
    pub async fn reopen_slot(&self, actor: &Actor, id: Uuid) -> ClinicResult<TimeSlot> {
        self.update_slot(actor, id, TimeSlot::reopened).await
    }

    async fn update_slot(
        &self,
        actor: &Actor,
        id: Uuid,
        change: fn(&TimeSlot) -> TimeSlot,
    ) -> ClinicResult<TimeSlot> {
        let retry = self.settings.retry;
        for attempt in 1..=retry.max_attempts {
            let slot = self.get_time_slot(id).await?;
            let schedule = self.load_schedule(slot.schedule_id).await?;
            self.authorize(actor, schedule.provider_id)?;

            let next = change(&slot);
            if next == slot {
                return Ok(slot);
            }
            match self.store.update_time_slot(&SlotWrite::new(&slot, next)).await? {
                Commit::Applied(updated) => {
                    info!("Time slot {} is now {}", id, updated.status);
                    return Ok(updated);
                }
                Commit::Stale => {
                    warn!(
                        "Time slot {} changed concurrently, retrying attempt {}/{}",
                        id, attempt, retry.max_attempts
                    );
                    retry.wait(attempt).await;
                }
            }
        }
        Err(ClinicError::Busy(format!(
            "Time slot {} is under contention, try again",
            id
        )))
    }
}
