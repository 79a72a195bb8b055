use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::NaiveDate;
use serde::Deserialize;
use slotbook_core::models::{
    appointment::Appointment,
    schedule::{CascadeSummary, CreateScheduleRequest, PreviewSlotsRequest, Schedule, ScheduleWithSlots},
    time_slot::TimeSlot,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    ApiState,
    middleware::{auth::CurrentActor, error_handling::AppError},
};

#[derive(Debug, Deserialize)]
pub struct ScheduleRangeQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[axum::debug_handler]
pub async fn create_schedule(
    State(state): State<Arc<ApiState>>,
    CurrentActor(actor): CurrentActor,
    Path(provider_id): Path<Uuid>,
    Json(payload): Json<CreateScheduleRequest>,
) -> Result<(StatusCode, Json<ScheduleWithSlots>), AppError> {
    let created = state
        .schedules
        .create_schedule(&actor, provider_id, payload)
        .await?;

    Ok((StatusCode::CREATED, Json(created)))
}

#[axum::debug_handler]
pub async fn list_schedules(
    State(state): State<Arc<ApiState>>,
    Path(provider_id): Path<Uuid>,
    Query(range): Query<ScheduleRangeQuery>,
) -> Result<Json<Vec<Schedule>>, AppError> {
    let schedules = state
        .schedules
        .list_schedules(provider_id, range.from, range.to)
        .await?;

    Ok(Json(schedules))
}

#[axum::debug_handler]
pub async fn get_schedule(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ScheduleWithSlots>, AppError> {
    Ok(Json(state.schedules.get_schedule(id).await?))
}

/// Removes the schedule with its slots and their appointments.
#[axum::debug_handler]
pub async fn delete_schedule(
    State(state): State<Arc<ApiState>>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<Json<CascadeSummary>, AppError> {
    Ok(Json(state.schedules.delete_schedule(&actor, id).await?))
}

#[axum::debug_handler]
pub async fn publish_schedule(
    State(state): State<Arc<ApiState>>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<Json<Schedule>, AppError> {
    Ok(Json(state.schedules.publish(&actor, id).await?))
}

#[axum::debug_handler]
pub async fn unpublish_schedule(
    State(state): State<Arc<ApiState>>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<Json<Schedule>, AppError> {
    Ok(Json(state.schedules.unpublish(&actor, id).await?))
}

/// Shows the slots a window would produce, without storing anything.
#[axum::debug_handler]
pub async fn preview_slots(
    State(state): State<Arc<ApiState>>,
    Json(payload): Json<PreviewSlotsRequest>,
) -> Result<Json<Vec<TimeSlot>>, AppError> {
    Ok(Json(state.schedules.preview_slots(&payload)?))
}

#[axum::debug_handler]
pub async fn list_schedule_appointments(
    State(state): State<Arc<ApiState>>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Appointment>>, AppError> {
    Ok(Json(state.bookings.list_schedule_appointments(&actor, id).await?))
}
