use crate::models::DbAppointment;
use eyre::Result;
use slotbook_core::models::appointment::{Appointment, AppointmentStatus, PaymentStatus};
use sqlx::PgExecutor;
use uuid::Uuid;

const APPOINTMENT_COLUMNS: &str = "id, doctor_id, patient_id, time_slot_id, status, reason, notes, \
     cancellation_reason, points_used, payment_status, created_at, updated_at";

pub async fn insert_appointment<'e, E: PgExecutor<'e>>(
    executor: E,
    appointment: &Appointment,
) -> Result<()> {
    sqlx::query(&format!(
        r#"
        INSERT INTO appointments ({APPOINTMENT_COLUMNS})
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        "#
    ))
    .bind(appointment.id)
    .bind(appointment.doctor_id)
    .bind(appointment.patient_id)
    .bind(appointment.time_slot_id)
    .bind(appointment.status.as_str())
    .bind(appointment.reason.as_deref())
    .bind(appointment.notes.as_deref())
    .bind(appointment.cancellation_reason.as_deref())
    .bind(appointment.points_used)
    .bind(appointment.payment_status.as_str())
    .bind(appointment.created_at)
    .bind(appointment.updated_at)
    .execute(executor)
    .await?;

    Ok(())
}

pub async fn get_appointment_by_id<'e, E: PgExecutor<'e>>(
    executor: E,
    id: Uuid,
) -> Result<Option<DbAppointment>> {
    let appointment = sqlx::query_as::<_, DbAppointment>(&format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(appointment)
}

pub async fn find_active_appointment<'e, E: PgExecutor<'e>>(
    executor: E,
    patient_id: Uuid,
    time_slot_id: Uuid,
) -> Result<Option<DbAppointment>> {
    let appointment = sqlx::query_as::<_, DbAppointment>(&format!(
        r#"
        SELECT {APPOINTMENT_COLUMNS}
        FROM appointments
        WHERE patient_id = $1 AND time_slot_id = $2 AND status <> 'Cancelled'
        "#
    ))
    .bind(patient_id)
    .bind(time_slot_id)
    .fetch_optional(executor)
    .await?;

    Ok(appointment)
}

pub async fn get_appointments_by_patient_id<'e, E: PgExecutor<'e>>(
    executor: E,
    patient_id: Uuid,
) -> Result<Vec<DbAppointment>> {
    let appointments = sqlx::query_as::<_, DbAppointment>(&format!(
        r#"
        SELECT {APPOINTMENT_COLUMNS}
        FROM appointments
        WHERE patient_id = $1
        ORDER BY created_at DESC
        "#
    ))
    .bind(patient_id)
    .fetch_all(executor)
    .await?;

    Ok(appointments)
}

pub async fn get_appointments_by_schedule_id<'e, E: PgExecutor<'e>>(
    executor: E,
    schedule_id: Uuid,
) -> Result<Vec<DbAppointment>> {
    let appointments = sqlx::query_as::<_, DbAppointment>(
        r#"
        SELECT a.id, a.doctor_id, a.patient_id, a.time_slot_id, a.status, a.reason, a.notes,
               a.cancellation_reason, a.points_used, a.payment_status, a.created_at, a.updated_at
        FROM appointments a
        JOIN time_slots ts ON ts.id = a.time_slot_id
        WHERE ts.schedule_id = $1
        ORDER BY ts.start_time ASC, a.created_at ASC
        "#,
    )
    .bind(schedule_id)
    .fetch_all(executor)
    .await?;

    Ok(appointments)
}

/// Writes the mutable columns of `appointment` if the stored status and
/// payment status are still the expected ones.
pub async fn update_appointment_if_unchanged<'e, E: PgExecutor<'e>>(
    executor: E,
    appointment: &Appointment,
    expected_status: AppointmentStatus,
    expected_payment: PaymentStatus,
) -> Result<Option<DbAppointment>> {
    let updated = sqlx::query_as::<_, DbAppointment>(&format!(
        r#"
        UPDATE appointments
        SET status = $3, notes = $4, cancellation_reason = $5,
            payment_status = $6, updated_at = $7
        WHERE id = $1 AND status = $2 AND payment_status = $8
        RETURNING {APPOINTMENT_COLUMNS}
        "#
    ))
    .bind(appointment.id)
    .bind(expected_status.as_str())
    .bind(appointment.status.as_str())
    .bind(appointment.notes.as_deref())
    .bind(appointment.cancellation_reason.as_deref())
    .bind(appointment.payment_status.as_str())
    .bind(appointment.updated_at)
    .bind(expected_payment.as_str())
    .fetch_optional(executor)
    .await?;

    Ok(updated)
}

/// Deletes an active appointment whose payment never settled.
pub async fn delete_unsettled_appointment<'e, E: PgExecutor<'e>>(
    executor: E,
    id: Uuid,
) -> Result<Option<DbAppointment>> {
    let deleted = sqlx::query_as::<_, DbAppointment>(&format!(
        r#"
        DELETE FROM appointments
        WHERE id = $1 AND status <> 'Cancelled' AND payment_status = 'Pending'
        RETURNING {APPOINTMENT_COLUMNS}
        "#
    ))
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(deleted)
}

/// Records a failed debit on an appointment that was cancelled before it settled.
pub async fn mark_cancelled_payment_failed<'e, E: PgExecutor<'e>>(
    executor: E,
    id: Uuid,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE appointments
        SET payment_status = 'Failed'
        WHERE id = $1 AND status = 'Cancelled' AND payment_status = 'Pending'
        "#,
    )
    .bind(id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn count_for_schedule<'e, E: PgExecutor<'e>>(
    executor: E,
    schedule_id: Uuid,
    pending_only: bool,
) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM appointments a
        JOIN time_slots ts ON ts.id = a.time_slot_id
        WHERE ts.schedule_id = $1
          AND (NOT $2 OR a.status IN ('Booked', 'CheckedIn'))
        "#,
    )
    .bind(schedule_id)
    .bind(pending_only)
    .fetch_one(executor)
    .await?;

    Ok(count)
}
