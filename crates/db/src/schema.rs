use eyre::Result;
use sqlx::{Pool, Postgres};
use tracing::info;

/// Name of the partial unique index that allows one live appointment per
/// (patient, slot) pair.
pub const ACTIVE_APPOINTMENT_INDEX: &str = "ux_appointments_patient_slot_active";

pub async fn initialize_database(pool: &Pool<Postgres>) -> Result<()> {
    info!("Initializing database schema...");

    // Create schedules table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schedules (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            provider_id UUID NOT NULL,
            work_date DATE NOT NULL,
            start_time TIME NOT NULL,
            end_time TIME NOT NULL,
            slot_minutes INTEGER NOT NULL,
            location VARCHAR(120) NULL,
            published BOOLEAN NOT NULL DEFAULT TRUE,
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
            CONSTRAINT schedules_provider_day UNIQUE (provider_id, work_date),
            CONSTRAINT valid_time_range CHECK (end_time > start_time),
            CONSTRAINT positive_slot_minutes CHECK (slot_minutes > 0)
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create time_slots table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS time_slots (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            schedule_id UUID NOT NULL REFERENCES schedules(id) ON DELETE CASCADE,
            start_time TIME NOT NULL,
            end_time TIME NOT NULL,
            capacity INTEGER NOT NULL DEFAULT 1,
            booked_count INTEGER NOT NULL DEFAULT 0,
            status VARCHAR(16) NOT NULL DEFAULT 'Open',
            version BIGINT NOT NULL DEFAULT 0,
            CONSTRAINT valid_time_range CHECK (end_time > start_time),
            CONSTRAINT booked_within_capacity CHECK (capacity >= 1 AND booked_count BETWEEN 0 AND capacity),
            CONSTRAINT known_slot_status CHECK (status IN ('Open', 'Full', 'Closed')),
            CONSTRAINT time_slots_schedule_window UNIQUE (schedule_id, start_time, end_time)
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create appointments table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS appointments (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            doctor_id UUID NOT NULL,
            patient_id UUID NOT NULL,
            time_slot_id UUID NOT NULL REFERENCES time_slots(id) ON DELETE CASCADE,
            status VARCHAR(16) NOT NULL DEFAULT 'Booked',
            reason VARCHAR(200) NULL,
            notes VARCHAR(2000) NULL,
            cancellation_reason VARCHAR(500) NULL,
            points_used INTEGER NOT NULL DEFAULT 0,
            payment_status VARCHAR(16) NOT NULL DEFAULT 'Unpaid',
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMP WITH TIME ZONE NULL,
            CONSTRAINT known_appointment_status
                CHECK (status IN ('Booked', 'CheckedIn', 'Completed', 'Cancelled', 'NoShow')),
            CONSTRAINT non_negative_points CHECK (points_used >= 0)
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create point_balances table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS point_balances (
            user_id UUID PRIMARY KEY,
            balance INTEGER NOT NULL DEFAULT 0,
            updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
            CONSTRAINT non_negative_balance CHECK (balance >= 0)
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes, one statement each
    let indexes = [
        "CREATE INDEX IF NOT EXISTS idx_schedules_work_date ON schedules(work_date)",
        "CREATE INDEX IF NOT EXISTS idx_time_slots_schedule_id ON time_slots(schedule_id)",
        "CREATE INDEX IF NOT EXISTS idx_appointments_patient_id ON appointments(patient_id)",
        "CREATE INDEX IF NOT EXISTS idx_appointments_time_slot_id ON appointments(time_slot_id)",
        "CREATE UNIQUE INDEX IF NOT EXISTS ux_appointments_patient_slot_active \
         ON appointments(patient_id, time_slot_id) WHERE status <> 'Cancelled'",
    ];
    for statement in indexes {
        sqlx::query(statement).execute(pool).await?;
    }

    info!("Database schema initialized successfully.");
    Ok(())
}
