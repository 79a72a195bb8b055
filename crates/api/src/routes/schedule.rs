use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;

use crate::{ApiState, handlers};

pub fn routes() -> Router<Arc<ApiState>> {
    Router::new()
        .route(
            "/api/providers/:provider_id/schedules",
            post(handlers::schedule::create_schedule).get(handlers::schedule::list_schedules),
        )
        .route("/api/schedules/preview", post(handlers::schedule::preview_slots))
        .route(
            "/api/schedules/:id",
            get(handlers::schedule::get_schedule).delete(handlers::schedule::delete_schedule),
        )
        .route(
            "/api/schedules/:id/publish",
            post(handlers::schedule::publish_schedule),
        )
        .route(
            "/api/schedules/:id/unpublish",
            post(handlers::schedule::unpublish_schedule),
        )
        .route(
            "/api/schedules/:id/appointments",
            get(handlers::schedule::list_schedule_appointments),
        )
}
