use axum::{
    Json,
    extract::{Path, State},
};
use slotbook_core::models::time_slot::TimeSlot;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    ApiState,
    middleware::{auth::CurrentActor, error_handling::AppError},
};

#[axum::debug_handler]
pub async fn get_time_slot(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<TimeSlot>, AppError> {
    Ok(Json(state.schedules.get_time_slot(id).await?))
}

#[axum::debug_handler]
pub async fn close_time_slot(
    State(state): State<Arc<ApiState>>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<Json<TimeSlot>, AppError> {
    Ok(Json(state.schedules.close_slot(&actor, id).await?))
}

#[axum::debug_handler]
pub async fn reopen_time_slot(
    State(state): State<Arc<ApiState>>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<Json<TimeSlot>, AppError> {
    Ok(Json(state.schedules.reopen_slot(&actor, id).await?))
}
