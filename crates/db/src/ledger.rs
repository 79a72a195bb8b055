use async_trait::async_trait;
use eyre::{Result, eyre};
use slotbook_core::ledger::BalanceLedger;
use uuid::Uuid;

use crate::DbPool;

/// Points balances kept in the `point_balances` table.
#[derive(Debug, Clone)]
pub struct PgPointsLedger {
    pool: DbPool,
}

impl PgPointsLedger {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BalanceLedger for PgPointsLedger {
    async fn debit(&self, user_id: Uuid, points: i32) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE point_balances
            SET balance = balance - $2, updated_at = NOW()
            WHERE user_id = $1 AND balance >= $2
            "#,
        )
        .bind(user_id)
        .bind(points)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(eyre!("insufficient points for user {}", user_id));
        }
        tracing::debug!("Debited {} points from {}", points, user_id);
        Ok(())
    }

    async fn credit(&self, user_id: Uuid, points: i32) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO point_balances (user_id, balance, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (user_id)
            DO UPDATE SET balance = point_balances.balance + EXCLUDED.balance, updated_at = NOW()
            "#,
        )
        .bind(user_id)
        .bind(points)
        .execute(&self.pool)
        .await?;

        tracing::debug!("Credited {} points to {}", points, user_id);
        Ok(())
    }
}
