use axum::{Router, routing::get};
use std::sync::Arc;

use crate::{ApiState, handlers};

pub fn routes() -> Router<Arc<ApiState>> {
    Router::new()
        .route(
            "/api/providers/available",
            get(handlers::availability::available_providers),
        )
        .route(
            "/api/providers/:provider_id/slots",
            get(handlers::availability::provider_slots),
        )
}
