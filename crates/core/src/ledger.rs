use async_trait::async_trait;
use eyre::{eyre, Result};
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Loyalty-points balance kept outside the scheduling store.
#[async_trait]
pub trait BalanceLedger: Send + Sync {
    /// Fails when the balance cannot cover `points`.
    async fn debit(&self, user_id: Uuid, points: i32) -> Result<()>;

    async fn credit(&self, user_id: Uuid, points: i32) -> Result<()>;
}

/// Process-local balances, used when no database is configured and in tests.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    balances: Mutex<HashMap<Uuid, i32>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn balance(&self, user_id: Uuid) -> i32 {
        self.balances.lock().await.get(&user_id).copied().unwrap_or(0)
    }
}

#[async_trait]
impl BalanceLedger for MemoryLedger {
    async fn debit(&self, user_id: Uuid, points: i32) -> Result<()> {
        let mut balances = self.balances.lock().await;
        let balance = balances.entry(user_id).or_insert(0);
        if *balance < points {
            return Err(eyre!(
                "insufficient points: balance {} is below {}",
                balance,
                points
            ));
        }
        *balance -= points;
        Ok(())
    }

    async fn credit(&self, user_id: Uuid, points: i32) -> Result<()> {
        let mut balances = self.balances.lock().await;
        *balances.entry(user_id).or_insert(0) += points;
        Ok(())
    }
}
