use axum::{
    body::to_bytes,
    http::{StatusCode, header},
};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::Value;
use slotbook_api::middleware::error_handling::{AppError, RETRY_AFTER_SECONDS, map_error, status_for};
use slotbook_core::{errors::ClinicError, models::appointment::AppointmentStatus};

use crate::test_utils::TestApp;

#[rstest]
#[case(ClinicError::NotFound("missing".into()), StatusCode::NOT_FOUND)]
#[case(ClinicError::Conflict("taken".into()), StatusCode::CONFLICT)]
#[case(ClinicError::DuplicateBooking("again".into()), StatusCode::CONFLICT)]
#[case(ClinicError::SlotUnavailable("full".into()), StatusCode::CONFLICT)]
#[case(
    ClinicError::InvalidTransition {
        from: AppointmentStatus::Completed,
        to: AppointmentStatus::Cancelled,
    },
    StatusCode::CONFLICT
)]
#[case(ClinicError::InvalidRange("backwards".into()), StatusCode::BAD_REQUEST)]
#[case(ClinicError::InvalidParameter("bad".into()), StatusCode::BAD_REQUEST)]
#[case(ClinicError::Forbidden("no".into()), StatusCode::FORBIDDEN)]
#[case(ClinicError::Busy("contended".into()), StatusCode::SERVICE_UNAVAILABLE)]
#[case(ClinicError::DependencyFailure("ledger".into()), StatusCode::BAD_GATEWAY)]
#[case(ClinicError::Database(eyre::eyre!("down")), StatusCode::INTERNAL_SERVER_ERROR)]
fn test_status_mapping(#[case] error: ClinicError, #[case] expected: StatusCode) {
    assert_eq!(status_for(&error), expected);
}

#[tokio::test]
async fn test_error_body_carries_kind_and_message() {
    let response = map_error(ClinicError::NotFound("Schedule with ID 1 not found".into()));

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["kind"], "not_found");
    assert_eq!(body["error"], "Resource not found: Schedule with ID 1 not found");
}

#[tokio::test]
async fn test_busy_sets_retry_after() {
    let response = map_error(ClinicError::Busy("slot".into()));

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        response.headers().get(header::RETRY_AFTER).unwrap(),
        RETRY_AFTER_SECONDS.to_string().as_str()
    );
}

#[tokio::test]
async fn test_conflict_has_no_retry_after() {
    let response = map_error(ClinicError::Conflict("taken".into()));

    assert!(response.headers().get(header::RETRY_AFTER).is_none());
}

#[test]
fn test_eyre_report_maps_to_database() {
    let err: AppError = eyre::eyre!("connection reset").into();

    assert_eq!(err.0.kind(), "database");
}

#[tokio::test]
async fn test_health_reports_store_backend() {
    let app = TestApp::new();

    let response = app.server.get("/health").await;

    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["store"], "memory");
}

#[tokio::test]
async fn test_version() {
    let app = TestApp::new();

    let body = app.server.get("/version").await.json::<Value>();

    assert_eq!(body["name"], "slotbook-api");
    assert!(body["version"].is_string());
}
