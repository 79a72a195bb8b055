use axum::http::{StatusCode, header};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use slotbook_core::{
    auth::Actor,
    ledger::BalanceLedger,
    models::{
        appointment::{Appointment, AppointmentStatus, PaymentStatus},
        time_slot::{TimeSlot, TimeSlotStatus},
    },
};
use uuid::Uuid;

use crate::test_utils::{TestApp, as_actor};

async fn reserve(app: &TestApp, patient: &Actor, time_slot_id: Uuid, points: i32) -> Appointment {
    let response = as_actor(app.server.post("/api/appointments"), patient)
        .json(&json!({
            "patient_id": patient.user_id,
            "time_slot_id": time_slot_id,
            "reason": "  Annual check-up  ",
            "points": points,
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json::<Appointment>()
}

async fn slot(app: &TestApp, id: Uuid) -> TimeSlot {
    app.server
        .get(&format!("/api/time-slots/{}", id))
        .await
        .json::<TimeSlot>()
}

#[tokio::test]
async fn test_reserve_books_slot() {
    let app = TestApp::new();
    let schedule = app.published_schedule().await;
    let patient = Actor::patient(Uuid::new_v4());
    let slot_id = schedule.time_slots[0].id;

    let appointment = reserve(&app, &patient, slot_id, 0).await;

    assert_eq!(appointment.status, AppointmentStatus::Booked);
    assert_eq!(appointment.doctor_id, app.provider.user_id);
    assert_eq!(appointment.reason.as_deref(), Some("Annual check-up"));
    assert_eq!(appointment.payment_status, PaymentStatus::Unpaid);

    let booked = slot(&app, slot_id).await;
    assert_eq!(booked.booked_count, 1);
    assert_eq!(booked.status, TimeSlotStatus::Full);
}

#[tokio::test]
async fn test_reserve_twice_is_duplicate() {
    let app = TestApp::new();
    let schedule = app.published_schedule().await;
    let patient = Actor::patient(Uuid::new_v4());
    let slot_id = schedule.time_slots[0].id;
    reserve(&app, &patient, slot_id, 0).await;

    let response = as_actor(app.server.post("/api/appointments"), &patient)
        .json(&json!({ "patient_id": patient.user_id, "time_slot_id": slot_id }))
        .await;

    response.assert_status(StatusCode::CONFLICT);
    assert_eq!(response.json::<Value>()["kind"], "duplicate_booking");
}

#[tokio::test]
async fn test_reserve_full_slot_is_unavailable() {
    let app = TestApp::new();
    let schedule = app.published_schedule().await;
    let slot_id = schedule.time_slots[0].id;
    reserve(&app, &Actor::patient(Uuid::new_v4()), slot_id, 0).await;

    let second = Actor::patient(Uuid::new_v4());
    let response = as_actor(app.server.post("/api/appointments"), &second)
        .json(&json!({ "patient_id": second.user_id, "time_slot_id": slot_id }))
        .await;

    response.assert_status(StatusCode::CONFLICT);
    assert_eq!(response.json::<Value>()["kind"], "slot_unavailable");
}

#[tokio::test]
async fn test_reserve_unknown_slot_is_not_found() {
    let app = TestApp::new();
    let patient = Actor::patient(Uuid::new_v4());

    let response = as_actor(app.server.post("/api/appointments"), &patient)
        .json(&json!({ "patient_id": patient.user_id, "time_slot_id": Uuid::new_v4() }))
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_patient_cannot_book_for_someone_else() {
    let app = TestApp::new();
    let schedule = app.published_schedule().await;
    let patient = Actor::patient(Uuid::new_v4());

    let response = as_actor(app.server.post("/api/appointments"), &patient)
        .json(&json!({
            "patient_id": Uuid::new_v4(),
            "time_slot_id": schedule.time_slots[0].id,
        }))
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_negative_points_are_rejected() {
    let app = TestApp::new();
    let schedule = app.published_schedule().await;
    let patient = Actor::patient(Uuid::new_v4());

    let response = as_actor(app.server.post("/api/appointments"), &patient)
        .json(&json!({
            "patient_id": patient.user_id,
            "time_slot_id": schedule.time_slots[0].id,
            "points": -5,
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["kind"], "invalid_parameter");
}

#[test_log::test(tokio::test)]
async fn test_cancel_releases_slot_and_refunds_points() {
    let app = TestApp::new();
    let schedule = app.published_schedule().await;
    let patient = Actor::patient(Uuid::new_v4());
    let slot_id = schedule.time_slots[1].id;
    app.ledger.credit(patient.user_id, 50).await.unwrap();

    let appointment = reserve(&app, &patient, slot_id, 30).await;
    assert_eq!(appointment.payment_status, PaymentStatus::Paid);
    assert_eq!(app.ledger.balance(patient.user_id).await, 20);

    let response = as_actor(
        app.server
            .post(&format!("/api/appointments/{}/cancel", appointment.id)),
        &patient,
    )
    .json(&json!({ "reason": "Feeling better" }))
    .await;

    response.assert_status_ok();
    let cancelled = response.json::<Appointment>();
    assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
    assert_eq!(cancelled.cancellation_reason.as_deref(), Some("Feeling better"));
    assert_eq!(cancelled.payment_status, PaymentStatus::Refunded);
    assert_eq!(app.ledger.balance(patient.user_id).await, 50);

    let released = slot(&app, slot_id).await;
    assert_eq!(released.booked_count, 0);
    assert_eq!(released.status, TimeSlotStatus::Open);

    // The same patient may book the slot again once cancelled.
    reserve(&app, &patient, slot_id, 0).await;
}

#[test_log::test(tokio::test)]
async fn test_reserve_without_enough_points_fails_and_keeps_slot_open() {
    let app = TestApp::new();
    let schedule = app.published_schedule().await;
    let patient = Actor::patient(Uuid::new_v4());
    let slot_id = schedule.time_slots[2].id;

    let response = as_actor(app.server.post("/api/appointments"), &patient)
        .json(&json!({
            "patient_id": patient.user_id,
            "time_slot_id": slot_id,
            "points": 10,
        }))
        .await;

    response.assert_status(StatusCode::BAD_GATEWAY);
    assert_eq!(response.json::<Value>()["kind"], "dependency_failure");

    let untouched = slot(&app, slot_id).await;
    assert_eq!(untouched.booked_count, 0);
    assert_eq!(untouched.status, TimeSlotStatus::Open);
}

#[test_log::test(tokio::test)]
async fn test_provider_walks_appointment_to_completion() {
    let app = TestApp::new();
    let schedule = app.published_schedule().await;
    let patient = Actor::patient(Uuid::new_v4());
    let appointment = reserve(&app, &patient, schedule.time_slots[0].id, 0).await;

    let checked_in = as_actor(
        app.server
            .post(&format!("/api/appointments/{}/check-in", appointment.id)),
        &app.provider,
    )
    .await
    .json::<Appointment>();
    assert_eq!(checked_in.status, AppointmentStatus::CheckedIn);

    let completed = as_actor(
        app.server
            .post(&format!("/api/appointments/{}/complete", appointment.id)),
        &app.provider,
    )
    .json(&json!({ "notes": "Bloodwork ordered" }))
    .await
    .json::<Appointment>();
    assert_eq!(completed.status, AppointmentStatus::Completed);
    assert_eq!(completed.notes.as_deref(), Some("Bloodwork ordered"));

    let response = as_actor(
        app.server
            .post(&format!("/api/appointments/{}/cancel", appointment.id)),
        &app.provider,
    )
    .json(&json!({ "reason": "Too late" }))
    .await;
    response.assert_status(StatusCode::CONFLICT);
    assert_eq!(response.json::<Value>()["kind"], "invalid_transition");
}

#[tokio::test]
async fn test_complete_without_body() {
    let app = TestApp::new();
    let schedule = app.published_schedule().await;
    let patient = Actor::patient(Uuid::new_v4());
    let appointment = reserve(&app, &patient, schedule.time_slots[0].id, 0).await;

    as_actor(
        app.server
            .post(&format!("/api/appointments/{}/check-in", appointment.id)),
        &app.admin,
    )
    .await
    .assert_status_ok();

    let response = as_actor(
        app.server
            .post(&format!("/api/appointments/{}/complete", appointment.id)),
        &app.admin,
    )
    .await;

    response.assert_status_ok();
    let completed = response.json::<Appointment>();
    assert_eq!(completed.status, AppointmentStatus::Completed);
    assert_eq!(completed.notes, None);
}

#[tokio::test]
async fn test_no_show_from_booked() {
    let app = TestApp::new();
    let schedule = app.published_schedule().await;
    let patient = Actor::patient(Uuid::new_v4());
    let appointment = reserve(&app, &patient, schedule.time_slots[3].id, 0).await;

    let response = as_actor(
        app.server
            .post(&format!("/api/appointments/{}/no-show", appointment.id)),
        &app.provider,
    )
    .await;

    response.assert_status_ok();
    assert_eq!(response.json::<Appointment>().status, AppointmentStatus::NoShow);
}

#[tokio::test]
async fn test_patient_cannot_check_in() {
    let app = TestApp::new();
    let schedule = app.published_schedule().await;
    let patient = Actor::patient(Uuid::new_v4());
    let appointment = reserve(&app, &patient, schedule.time_slots[0].id, 0).await;

    as_actor(
        app.server
            .post(&format!("/api/appointments/{}/check-in", appointment.id)),
        &patient,
    )
    .await
    .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_get_and_list_appointments() {
    let app = TestApp::new();
    let schedule = app.published_schedule().await;
    let patient = Actor::patient(Uuid::new_v4());
    let first = reserve(&app, &patient, schedule.time_slots[0].id, 0).await;
    let second = reserve(&app, &patient, schedule.time_slots[1].id, 0).await;

    let fetched = as_actor(
        app.server.get(&format!("/api/appointments/{}", first.id)),
        &patient,
    )
    .await
    .json::<Appointment>();
    assert_eq!(fetched, first);

    let mine = as_actor(
        app.server
            .get(&format!("/api/patients/{}/appointments", patient.user_id)),
        &patient,
    )
    .await
    .json::<Vec<Appointment>>();
    let mut ids: Vec<Uuid> = mine.iter().map(|a| a.id).collect();
    ids.sort();
    let mut expected = vec![first.id, second.id];
    expected.sort();
    assert_eq!(ids, expected);

    let for_schedule = as_actor(
        app.server
            .get(&format!("/api/schedules/{}/appointments", schedule.schedule.id)),
        &app.provider,
    )
    .await
    .json::<Vec<Appointment>>();
    let ordered: Vec<Uuid> = for_schedule.iter().map(|a| a.id).collect();
    assert_eq!(ordered, vec![first.id, second.id]);
}

#[tokio::test]
async fn test_other_patient_cannot_list_appointments() {
    let app = TestApp::new();
    let patient = Actor::patient(Uuid::new_v4());
    let stranger = Actor::patient(Uuid::new_v4());

    as_actor(
        app.server
            .get(&format!("/api/patients/{}/appointments", patient.user_id)),
        &stranger,
    )
    .await
    .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_bad_role_header_is_unauthenticated() {
    let app = TestApp::new();

    let response = app
        .server
        .get(&format!("/api/appointments/{}", Uuid::new_v4()))
        .add_header(
            header::HeaderName::from_static("x-actor-id"),
            header::HeaderValue::from_str(&Uuid::new_v4().to_string()).unwrap(),
        )
        .add_header(
            header::HeaderName::from_static("x-actor-role"),
            header::HeaderValue::from_static("janitor"),
        )
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["kind"], "unauthenticated");
}
