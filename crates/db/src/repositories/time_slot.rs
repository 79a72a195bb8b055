use crate::models::DbTimeSlot;
use chrono::NaiveDate;
use eyre::Result;
use slotbook_core::models::time_slot::{SlotWrite, TimeSlot};
use sqlx::PgExecutor;
use uuid::Uuid;

const TIME_SLOT_COLUMNS: &str =
    "id, schedule_id, start_time, end_time, capacity, booked_count, status, version";

pub async fn insert_time_slot<'e, E: PgExecutor<'e>>(executor: E, slot: &TimeSlot) -> Result<()> {
    sqlx::query(&format!(
        r#"
        INSERT INTO time_slots ({TIME_SLOT_COLUMNS})
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#
    ))
    .bind(slot.id)
    .bind(slot.schedule_id)
    .bind(slot.start_time)
    .bind(slot.end_time)
    .bind(slot.capacity)
    .bind(slot.booked_count)
    .bind(slot.status.as_str())
    .bind(slot.version)
    .execute(executor)
    .await?;

    Ok(())
}

pub async fn get_time_slot_by_id<'e, E: PgExecutor<'e>>(
    executor: E,
    id: Uuid,
) -> Result<Option<DbTimeSlot>> {
    let time_slot = sqlx::query_as::<_, DbTimeSlot>(&format!(
        "SELECT {TIME_SLOT_COLUMNS} FROM time_slots WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(time_slot)
}

pub async fn get_time_slots_by_schedule_id<'e, E: PgExecutor<'e>>(
    executor: E,
    schedule_id: Uuid,
) -> Result<Vec<DbTimeSlot>> {
    let time_slots = sqlx::query_as::<_, DbTimeSlot>(&format!(
        r#"
        SELECT {TIME_SLOT_COLUMNS}
        FROM time_slots
        WHERE schedule_id = $1
        ORDER BY start_time ASC
        "#
    ))
    .bind(schedule_id)
    .fetch_all(executor)
    .await?;

    Ok(time_slots)
}

/// Applies `write` only if the row still carries `expected_version`.
/// Returns `None` when the row is missing or has moved on.
pub async fn update_time_slot_versioned<'e, E: PgExecutor<'e>>(
    executor: E,
    write: &SlotWrite,
) -> Result<Option<DbTimeSlot>> {
    let time_slot = sqlx::query_as::<_, DbTimeSlot>(&format!(
        r#"
        UPDATE time_slots
        SET capacity = $3, booked_count = $4, status = $5, version = version + 1
        WHERE id = $1 AND version = $2
        RETURNING {TIME_SLOT_COLUMNS}
        "#
    ))
    .bind(write.slot.id)
    .bind(write.expected_version)
    .bind(write.slot.capacity)
    .bind(write.slot.booked_count)
    .bind(write.slot.status.as_str())
    .fetch_optional(executor)
    .await?;

    Ok(time_slot)
}

/// Hands one unit back without a version check; used to undo a reservation
/// inside the transaction that removes it.
pub async fn release_booking<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE time_slots
        SET booked_count = GREATEST(booked_count - 1, 0),
            status = CASE WHEN status = 'Closed' THEN 'Closed' ELSE 'Open' END,
            version = version + 1
        WHERE id = $1
        "#,
    )
    .bind(id)
    .execute(executor)
    .await?;

    Ok(())
}

pub async fn list_published_slots<'e, E: PgExecutor<'e>>(
    executor: E,
    provider_id: Uuid,
    date: NaiveDate,
) -> Result<Vec<DbTimeSlot>> {
    let time_slots = sqlx::query_as::<_, DbTimeSlot>(
        r#"
        SELECT ts.id, ts.schedule_id, ts.start_time, ts.end_time,
               ts.capacity, ts.booked_count, ts.status, ts.version
        FROM time_slots ts
        JOIN schedules s ON s.id = ts.schedule_id
        WHERE s.provider_id = $1 AND s.work_date = $2 AND s.published
        ORDER BY ts.start_time ASC
        "#,
    )
    .bind(provider_id)
    .bind(date)
    .fetch_all(executor)
    .await?;

    Ok(time_slots)
}

pub async fn providers_with_open_slots<'e, E: PgExecutor<'e>>(
    executor: E,
    date: NaiveDate,
) -> Result<Vec<Uuid>> {
    let providers = sqlx::query_scalar::<_, Uuid>(
        r#"
        SELECT DISTINCT s.provider_id
        FROM schedules s
        JOIN time_slots ts ON ts.schedule_id = s.id
        WHERE s.work_date = $1
          AND s.published
          AND ts.status = 'Open'
          AND ts.booked_count < ts.capacity
        ORDER BY s.provider_id
        "#,
    )
    .bind(date)
    .fetch_all(executor)
    .await?;

    Ok(providers)
}

pub async fn count_time_slots<'e, E: PgExecutor<'e>>(executor: E, schedule_id: Uuid) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM time_slots WHERE schedule_id = $1")
        .bind(schedule_id)
        .fetch_one(executor)
        .await?;

    Ok(count)
}
