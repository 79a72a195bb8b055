use chrono::NaiveDate;
use std::sync::Arc;
use uuid::Uuid;

use crate::errors::ClinicResult;
use crate::models::time_slot::TimeSlot;
use crate::store::SchedulingStore;

/// Read-only views patients use to find something to book. Only published
/// schedules are ever visible here.
#[derive(Clone)]
pub struct AvailabilityQuery {
    store: Arc<dyn SchedulingStore>,
}

impl AvailabilityQuery {
    pub fn new(store: Arc<dyn SchedulingStore>) -> Self {
        Self { store }
    }

    /// Every slot of the provider's published schedule on `date`, whatever its status.
    pub async fn provider_slots(&self, provider_id: Uuid, date: NaiveDate) -> ClinicResult<Vec<TimeSlot>> {
        self.store.list_published_slots(provider_id, date).await
    }

    /// Slots on `date` that are Open with capacity left.
    pub async fn open_slots(&self, provider_id: Uuid, date: NaiveDate) -> ClinicResult<Vec<TimeSlot>> {
        let slots = self.store.list_published_slots(provider_id, date).await?;
        Ok(slots.into_iter().filter(TimeSlot::is_bookable).collect())
    }

    pub async fn providers_with_open_slots(&self, date: NaiveDate) -> ClinicResult<Vec<Uuid>> {
        self.store.providers_with_open_slots(date).await
    }
}
