use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::json;
use slotbook_api::handlers::availability::AvailableProvidersResponse;
use slotbook_core::{
    auth::Actor,
    models::time_slot::{TimeSlot, TimeSlotStatus},
};
use uuid::Uuid;

use crate::test_utils::{TestApp, WORK_DATE, as_actor};

#[tokio::test]
async fn test_provider_slots_lists_every_slot_in_order() {
    let app = TestApp::new();
    let schedule = app.published_schedule().await;

    let response = app
        .server
        .get(&format!("/api/providers/{}/slots", app.provider.user_id))
        .add_query_param("date", WORK_DATE)
        .await;

    response.assert_status_ok();
    let slots = response.json::<Vec<TimeSlot>>();
    assert_eq!(slots, schedule.time_slots);
}

#[tokio::test]
async fn test_open_only_hides_full_and_closed_slots() {
    let app = TestApp::new();
    let schedule = app.published_schedule().await;
    let patient = Actor::patient(Uuid::new_v4());

    as_actor(app.server.post("/api/appointments"), &patient)
        .json(&json!({
            "patient_id": patient.user_id,
            "time_slot_id": schedule.time_slots[0].id,
        }))
        .await
        .assert_status(StatusCode::CREATED);
    as_actor(
        app.server
            .post(&format!("/api/time-slots/{}/close", schedule.time_slots[1].id)),
        &app.provider,
    )
    .await
    .assert_status_ok();

    let open = app
        .server
        .get(&format!("/api/providers/{}/slots", app.provider.user_id))
        .add_query_param("date", WORK_DATE)
        .add_query_param("open_only", true)
        .await
        .json::<Vec<TimeSlot>>();

    let ids: Vec<Uuid> = open.iter().map(|slot| slot.id).collect();
    assert_eq!(ids, vec![schedule.time_slots[2].id, schedule.time_slots[3].id]);
    assert!(open.iter().all(|slot| slot.status == TimeSlotStatus::Open));
}

#[tokio::test]
async fn test_unpublished_schedule_is_invisible() {
    let app = TestApp::new();
    app.create_schedule(json!({
        "work_date": WORK_DATE,
        "start_time": "09:00:00",
        "end_time": "10:00:00",
    }))
    .await;

    let slots = app
        .server
        .get(&format!("/api/providers/{}/slots", app.provider.user_id))
        .add_query_param("date", WORK_DATE)
        .await
        .json::<Vec<TimeSlot>>();
    assert!(slots.is_empty());

    let available = app
        .server
        .get("/api/providers/available")
        .add_query_param("date", WORK_DATE)
        .await
        .json::<AvailableProvidersResponse>();
    assert!(available.provider_ids.is_empty());
}

#[tokio::test]
async fn test_available_providers() {
    let app = TestApp::new();
    app.published_schedule().await;

    let response = app
        .server
        .get("/api/providers/available")
        .add_query_param("date", WORK_DATE)
        .await;

    response.assert_status_ok();
    let available = response.json::<AvailableProvidersResponse>();
    assert_eq!(available.date.to_string(), WORK_DATE);
    assert_eq!(available.provider_ids, vec![app.provider.user_id]);

    let other_day = app
        .server
        .get("/api/providers/available")
        .add_query_param("date", "2025-06-02")
        .await
        .json::<AvailableProvidersResponse>();
    assert!(other_day.provider_ids.is_empty());
}

#[tokio::test]
async fn test_missing_date_is_bad_request() {
    let app = TestApp::new();

    app.server
        .get(&format!("/api/providers/{}/slots", app.provider.user_id))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}
