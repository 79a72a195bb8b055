use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;

use crate::{ApiState, handlers};

pub fn routes() -> Router<Arc<ApiState>> {
    Router::new()
        .route("/api/appointments", post(handlers::appointment::reserve))
        .route(
            "/api/appointments/:id",
            get(handlers::appointment::get_appointment),
        )
        .route(
            "/api/appointments/:id/cancel",
            post(handlers::appointment::cancel),
        )
        .route(
            "/api/appointments/:id/check-in",
            post(handlers::appointment::check_in),
        )
        .route(
            "/api/appointments/:id/complete",
            post(handlers::appointment::complete),
        )
        .route(
            "/api/appointments/:id/no-show",
            post(handlers::appointment::mark_no_show),
        )
        .route(
            "/api/patients/:patient_id/appointments",
            get(handlers::appointment::list_patient_appointments),
        )
}
