use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;

use crate::{ApiState, handlers};

pub fn routes() -> Router<Arc<ApiState>> {
    Router::new()
        .route("/api/time-slots/:id", get(handlers::time_slot::get_time_slot))
        .route(
            "/api/time-slots/:id/close",
            post(handlers::time_slot::close_time_slot),
        )
        .route(
            "/api/time-slots/:id/reopen",
            post(handlers::time_slot::reopen_time_slot),
        )
}
