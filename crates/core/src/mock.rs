use async_trait::async_trait;
use mockall::mock;
use uuid::Uuid;

use crate::auth::{Actor, AuthorizationGuard};
use crate::ledger::BalanceLedger;
use crate::models::appointment::Appointment;

// Mock collaborators for testing
mock! {
    pub Ledger {}

    #[async_trait]
    impl BalanceLedger for Ledger {
        async fn debit(&self, user_id: Uuid, points: i32) -> eyre::Result<()>;
        async fn credit(&self, user_id: Uuid, points: i32) -> eyre::Result<()>;
    }
}

mock! {
    pub Guard {}

    impl AuthorizationGuard for Guard {
        fn can_manage_schedule(&self, actor: &Actor, provider_id: Uuid) -> bool;
        fn can_manage_appointment(&self, actor: &Actor, appointment: &Appointment) -> bool;
        fn can_cancel_appointment(&self, actor: &Actor, appointment: &Appointment) -> bool;
        fn can_book_for(&self, actor: &Actor, patient_id: Uuid) -> bool;
    }
}
