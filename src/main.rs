use color_eyre::eyre::Result;
use dotenv::dotenv;
use slotbook_api::{ApiState, config::ApiConfig, init_tracing, start_server};
use slotbook_core::{
    auth::RoleGuard,
    clock::SystemClock,
    ledger::MemoryLedger,
    store::MemoryStore,
};
use slotbook_db::{PgPointsLedger, PgStore, create_pool, schema::initialize_database};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Load environment variables
    dotenv().ok();

    // Load configuration
    let config = ApiConfig::from_env()?;
    init_tracing(config.log_level)?;

    let settings = config.schedule_settings();
    let state = match &config.database_url {
        Some(database_url) => {
            let db_pool = create_pool(database_url).await?;
            initialize_database(&db_pool).await?;
            info!("Using PostgreSQL store");

            ApiState::new(
                Arc::new(PgStore::new(db_pool.clone(), config.lock_wait())),
                Arc::new(PgPointsLedger::new(db_pool)),
                Arc::new(RoleGuard),
                Arc::new(SystemClock),
                settings,
                "postgres",
            )
        }
        None => {
            warn!("DATABASE_URL is not set, data is kept in memory only");

            ApiState::new(
                Arc::new(MemoryStore::new(config.lock_wait())),
                Arc::new(MemoryLedger::new()),
                Arc::new(RoleGuard),
                Arc::new(SystemClock),
                settings,
                "memory",
            )
        }
    };

    start_server(&config, Arc::new(state)).await?;

    Ok(())
}
