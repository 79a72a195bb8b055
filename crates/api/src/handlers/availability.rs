//! # Availability Handlers
//!
//! Read-only views patients use to find something to book. Only published
//! schedules are visible; unpublished days look empty rather than missing.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use slotbook_core::models::time_slot::TimeSlot;
use std::sync::Arc;
use uuid::Uuid;

use crate::{ApiState, middleware::error_handling::AppError};

/// Query parameters for the provider slot listing
#[derive(Debug, Deserialize)]
pub struct SlotsQuery {
    pub date: NaiveDate,

    /// Only slots that can still take a booking
    #[serde(default)]
    pub open_only: bool,
}

#[derive(Debug, Deserialize)]
pub struct DateQuery {
    pub date: NaiveDate,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AvailableProvidersResponse {
    pub date: NaiveDate,
    pub provider_ids: Vec<Uuid>,
}

#[axum::debug_handler]
pub async fn provider_slots(
    State(state): State<Arc<ApiState>>,
    Path(provider_id): Path<Uuid>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<Vec<TimeSlot>>, AppError> {
    let slots = if query.open_only {
        state.availability.open_slots(provider_id, query.date).await?
    } else {
        state.availability.provider_slots(provider_id, query.date).await?
    };

    Ok(Json(slots))
}

#[axum::debug_handler]
pub async fn available_providers(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<DateQuery>,
) -> Result<Json<AvailableProvidersResponse>, AppError> {
    let provider_ids = state
        .availability
        .providers_with_open_slots(query.date)
        .await?;

    Ok(Json(AvailableProvidersResponse {
        date: query.date,
        provider_ids,
    }))
}
