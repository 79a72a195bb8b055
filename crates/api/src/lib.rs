//! # SlotBook API
//!
//! The API crate provides the web server for the SlotBook scheduling service.
//! It exposes RESTful endpoints for provider schedules, time slots,
//! availability and patient appointments.
//!
//! ## Architecture
//!
//! This crate follows a layered architecture:
//!
//! - **Routes**: Define API endpoints and URL structure
//! - **Handlers**: Translate requests into calls on the core services
//! - **Middleware**: Actor extraction and error-to-status mapping
//! - **Config**: Handle environment and application configuration
//!
//! The API uses Axum as the web framework. Storage is whatever
//! [`SchedulingStore`] the binary wires in.

/// Configuration module for API settings
pub mod config;
/// Request handlers that call into the core services
pub mod handlers;
/// Middleware for actor extraction and error handling
pub mod middleware;
/// Route definitions and API endpoint structure
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    http::{HeaderName, HeaderValue, Method, header},
};
use eyre::Result;
use slotbook_core::{
    auth::AuthorizationGuard,
    clock::Clock,
    ledger::BalanceLedger,
    services::{AvailabilityQuery, BookingCoordinator, ScheduleService, ScheduleSettings},
    store::SchedulingStore,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

use middleware::auth::{ACTOR_ID_HEADER, ACTOR_ROLE_HEADER};

/// Shared application state that is accessible to all request handlers
///
/// All three services share one store, so a booking made through
/// `bookings` is immediately visible to `availability`.
pub struct ApiState {
    pub schedules: ScheduleService,
    pub bookings: BookingCoordinator,
    pub availability: AvailabilityQuery,

    /// Reported by `/health`, e.g. "memory" or "postgres"
    pub store_backend: &'static str,
}

impl ApiState {
    pub fn new(
        store: Arc<dyn SchedulingStore>,
        ledger: Arc<dyn BalanceLedger>,
        guard: Arc<dyn AuthorizationGuard>,
        clock: Arc<dyn Clock>,
        settings: ScheduleSettings,
        store_backend: &'static str,
    ) -> Self {
        Self {
            schedules: ScheduleService::new(store.clone(), guard.clone(), clock.clone(), settings),
            bookings: BookingCoordinator::new(store.clone(), guard, ledger, clock, settings.retry),
            availability: AvailabilityQuery::new(store),
            store_backend,
        }
    }
}

/// Builds the application router with every route and the shared state.
pub fn build_router(state: Arc<ApiState>) -> Router {
    Router::new()
        // Health check endpoints
        .merge(routes::health::routes())
        // Schedule management endpoints
        .merge(routes::schedule::routes())
        // Time slot endpoints
        .merge(routes::time_slot::routes())
        // Availability endpoints
        .merge(routes::availability::routes())
        // Booking endpoints
        .merge(routes::appointment::routes())
        .with_state(state)
}

/// Installs the global fmt subscriber.
pub fn init_tracing(level: Level) -> Result<()> {
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring invalid CORS origin {:?}: {}", origin, e);
                None
            }
        })
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static(ACTOR_ID_HEADER),
            HeaderName::from_static(ACTOR_ROLE_HEADER),
        ])
        .allow_origin(allowed)
        .allow_credentials(true)
}

/// Starts the API server with the provided configuration and state
///
/// Tracing must already be initialized; see [`init_tracing`].
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use slotbook_api::{ApiState, config::ApiConfig, start_server};
/// use slotbook_core::{
///     auth::RoleGuard, clock::SystemClock, ledger::MemoryLedger, store::MemoryStore,
/// };
///
/// async fn example() -> eyre::Result<()> {
///     let config = ApiConfig::from_env()?;
///     let state = ApiState::new(
///         Arc::new(MemoryStore::new(Duration::from_millis(500))),
///         Arc::new(MemoryLedger::new()),
///         Arc::new(RoleGuard),
///         Arc::new(SystemClock),
///         config.schedule_settings(),
///         "memory",
///     );
///     start_server(&config, Arc::new(state)).await
/// }
/// ```
pub async fn start_server(config: &config::ApiConfig, state: Arc<ApiState>) -> Result<()> {
    let app = build_router(state);

    // Apply CORS configuration if origins are specified
    let app = match &config.cors_origins {
        Some(origins) => app.layer(cors_layer(origins)),
        None => app,
    };

    // Request tracing and timeout
    let app = app.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout))),
    );

    let addr = config.server_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
