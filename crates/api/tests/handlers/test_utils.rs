#![allow(dead_code)]

use axum::http::{HeaderName, HeaderValue};
use axum_test::{TestRequest, TestServer};
use serde_json::{Value, json};
use slotbook_api::{
    ApiState, build_router,
    middleware::auth::{ACTOR_ID_HEADER, ACTOR_ROLE_HEADER},
};
use slotbook_core::{
    auth::{Actor, Role, RoleGuard},
    clock::SystemClock,
    ledger::MemoryLedger,
    models::schedule::ScheduleWithSlots,
    services::ScheduleSettings,
    store::MemoryStore,
};
use std::sync::Arc;
use uuid::Uuid;

pub const WORK_DATE: &str = "2025-06-01";

pub struct TestApp {
    pub server: TestServer,
    pub ledger: Arc<MemoryLedger>,
    pub provider: Actor,
    pub admin: Actor,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_settings(ScheduleSettings::default())
    }

    pub fn with_settings(settings: ScheduleSettings) -> Self {
        let ledger = Arc::new(MemoryLedger::new());
        let state = ApiState::new(
            Arc::new(MemoryStore::default()),
            ledger.clone(),
            Arc::new(RoleGuard),
            Arc::new(SystemClock),
            settings,
            "memory",
        );
        let server = TestServer::new(build_router(Arc::new(state))).unwrap();

        Self {
            server,
            ledger,
            provider: Actor::provider(Uuid::new_v4()),
            admin: Actor::admin(Uuid::new_v4()),
        }
    }

    /// Creates a published 09:00-10:00 schedule of 15 minute slots for `self.provider`.
    pub async fn published_schedule(&self) -> ScheduleWithSlots {
        self.create_schedule(json!({
            "work_date": WORK_DATE,
            "start_time": "09:00:00",
            "end_time": "10:00:00",
            "slot_minutes": 15,
            "location": "Room 4",
            "publish": true,
        }))
        .await
    }

    pub async fn create_schedule(&self, body: Value) -> ScheduleWithSlots {
        let path = format!("/api/providers/{}/schedules", self.provider.user_id);
        let response = as_actor(self.server.post(&path), &self.provider)
            .json(&body)
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        response.json::<ScheduleWithSlots>()
    }
}

pub fn role_name(role: Role) -> &'static str {
    match role {
        Role::Admin => "admin",
        Role::Provider => "provider",
        Role::Patient => "patient",
    }
}

/// Attaches the gateway identity headers for `actor`.
pub fn as_actor(request: TestRequest, actor: &Actor) -> TestRequest {
    request
        .add_header(
            HeaderName::from_static(ACTOR_ID_HEADER),
            HeaderValue::from_str(&actor.user_id.to_string()).unwrap(),
        )
        .add_header(
            HeaderName::from_static(ACTOR_ROLE_HEADER),
            HeaderValue::from_static(role_name(actor.role)),
        )
}
