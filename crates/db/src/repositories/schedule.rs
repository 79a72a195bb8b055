use crate::models::DbSchedule;
use chrono::NaiveDate;
use eyre::Result;
use slotbook_core::models::schedule::Schedule;
use sqlx::PgExecutor;
use uuid::Uuid;

const SCHEDULE_COLUMNS: &str =
    "id, provider_id, work_date, start_time, end_time, slot_minutes, location, published, created_at";

pub async fn insert_schedule<'e, E: PgExecutor<'e>>(
    executor: E,
    schedule: &Schedule,
) -> Result<DbSchedule> {
    tracing::debug!(
        "Creating schedule: id={}, provider_id={}, work_date={}",
        schedule.id, schedule.provider_id, schedule.work_date
    );

    let row = sqlx::query_as::<_, DbSchedule>(&format!(
        r#"
        INSERT INTO schedules ({SCHEDULE_COLUMNS})
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING {SCHEDULE_COLUMNS}
        "#
    ))
    .bind(schedule.id)
    .bind(schedule.provider_id)
    .bind(schedule.work_date)
    .bind(schedule.start_time)
    .bind(schedule.end_time)
    .bind(schedule.slot_minutes)
    .bind(schedule.location.as_deref())
    .bind(schedule.published)
    .bind(schedule.created_at)
    .fetch_one(executor)
    .await?;

    Ok(row)
}

pub async fn get_schedule_by_id<'e, E: PgExecutor<'e>>(
    executor: E,
    id: Uuid,
) -> Result<Option<DbSchedule>> {
    let schedule = sqlx::query_as::<_, DbSchedule>(&format!(
        "SELECT {SCHEDULE_COLUMNS} FROM schedules WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await?;

    if schedule.is_none() {
        tracing::debug!("Schedule not found: id={}", id);
    }
    Ok(schedule)
}

/// Row-locks the schedule for the rest of the transaction.
pub async fn lock_schedule<'e, E: PgExecutor<'e>>(
    executor: E,
    id: Uuid,
) -> Result<Option<DbSchedule>> {
    let schedule = sqlx::query_as::<_, DbSchedule>(&format!(
        "SELECT {SCHEDULE_COLUMNS} FROM schedules WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(schedule)
}

pub async fn find_schedule_for_day<'e, E: PgExecutor<'e>>(
    executor: E,
    provider_id: Uuid,
    work_date: NaiveDate,
) -> Result<Option<DbSchedule>> {
    let schedule = sqlx::query_as::<_, DbSchedule>(&format!(
        "SELECT {SCHEDULE_COLUMNS} FROM schedules WHERE provider_id = $1 AND work_date = $2"
    ))
    .bind(provider_id)
    .bind(work_date)
    .fetch_optional(executor)
    .await?;

    Ok(schedule)
}

pub async fn list_schedules<'e, E: PgExecutor<'e>>(
    executor: E,
    provider_id: Uuid,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<Vec<DbSchedule>> {
    let schedules = sqlx::query_as::<_, DbSchedule>(&format!(
        r#"
        SELECT {SCHEDULE_COLUMNS}
        FROM schedules
        WHERE provider_id = $1
          AND ($2::date IS NULL OR work_date >= $2)
          AND ($3::date IS NULL OR work_date <= $3)
        ORDER BY work_date ASC
        "#
    ))
    .bind(provider_id)
    .bind(from)
    .bind(to)
    .fetch_all(executor)
    .await?;

    Ok(schedules)
}

pub async fn set_published<'e, E: PgExecutor<'e>>(
    executor: E,
    id: Uuid,
    published: bool,
) -> Result<Option<DbSchedule>> {
    let schedule = sqlx::query_as::<_, DbSchedule>(&format!(
        r#"
        UPDATE schedules
        SET published = $2
        WHERE id = $1
        RETURNING {SCHEDULE_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(published)
    .fetch_optional(executor)
    .await?;

    Ok(schedule)
}

/// Slots and appointments go with it through `ON DELETE CASCADE`.
pub async fn delete_schedule<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<u64> {
    let result = sqlx::query("DELETE FROM schedules WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected())
}
