use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use slotbook_core::models::appointment::{
    Appointment, CancelAppointmentRequest, CompleteAppointmentRequest, ReserveRequest,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    ApiState,
    middleware::{auth::CurrentActor, error_handling::AppError},
};

#[axum::debug_handler]
pub async fn reserve(
    State(state): State<Arc<ApiState>>,
    CurrentActor(actor): CurrentActor,
    Json(payload): Json<ReserveRequest>,
) -> Result<(StatusCode, Json<Appointment>), AppError> {
    let appointment = state.bookings.reserve(&actor, payload).await?;
    Ok((StatusCode::CREATED, Json(appointment)))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<ApiState>>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<Json<Appointment>, AppError> {
    Ok(Json(state.bookings.get_appointment(&actor, id).await?))
}

#[axum::debug_handler]
pub async fn list_patient_appointments(
    State(state): State<Arc<ApiState>>,
    CurrentActor(actor): CurrentActor,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Vec<Appointment>>, AppError> {
    Ok(Json(
        state
            .bookings
            .list_patient_appointments(&actor, patient_id)
            .await?,
    ))
}

#[axum::debug_handler]
pub async fn cancel(
    State(state): State<Arc<ApiState>>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
    Json(payload): Json<CancelAppointmentRequest>,
) -> Result<Json<Appointment>, AppError> {
    Ok(Json(state.bookings.cancel(&actor, id, &payload.reason).await?))
}

#[axum::debug_handler]
pub async fn check_in(
    State(state): State<Arc<ApiState>>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<Json<Appointment>, AppError> {
    Ok(Json(state.bookings.check_in(&actor, id).await?))
}

/// The body is optional; without it the appointment completes with no notes.
#[axum::debug_handler]
pub async fn complete(
    State(state): State<Arc<ApiState>>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
    payload: Option<Json<CompleteAppointmentRequest>>,
) -> Result<Json<Appointment>, AppError> {
    let request = payload.map(|Json(body)| body).unwrap_or_default();
    Ok(Json(
        state
            .bookings
            .complete(&actor, id, request.notes.as_deref())
            .await?,
    ))
}

#[axum::debug_handler]
pub async fn mark_no_show(
    State(state): State<Arc<ApiState>>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<Json<Appointment>, AppError> {
    Ok(Json(state.bookings.mark_no_show(&actor, id).await?))
}
