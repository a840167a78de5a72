//! Storage and service construction shared by the server and the tests.

use std::sync::Arc;

use scentrack_infra::{
    db, AppConfig, FragranceCatalog, InventoryLedger, ServiceResult, SweepConfig, SweepScheduler,
    UsageStats, WearRecorder,
};
use scentrack_inventory::Estimator;

#[derive(Debug)]
pub struct AppServices {
    pub config: AppConfig,
    pub catalog: FragranceCatalog,
    pub ledger: Arc<InventoryLedger>,
    pub wear: WearRecorder,
    pub stats: UsageStats,
    pub scheduler: SweepScheduler,
}

/// Open the database (creating the schema) and wire every service to it.
///
/// The scheduler is constructed but not started.
pub async fn build_services(config: &AppConfig) -> ServiceResult<AppServices> {
    let pool = db::connect(&config.database_url).await?;

    let estimator = Estimator::new(config.usage_window_days);
    let catalog = FragranceCatalog::new(pool.clone());
    let ledger = Arc::new(InventoryLedger::new(pool.clone(), estimator));
    let wear = WearRecorder::new(pool.clone(), catalog.clone(), ledger.clone());
    let stats = UsageStats::new(pool, config.usage_window_days);
    let scheduler = SweepScheduler::new(ledger.clone(), SweepConfig::default());

    Ok(AppServices {
        config: config.clone(),
        catalog,
        ledger,
        wear,
        stats,
        scheduler,
    })
}
