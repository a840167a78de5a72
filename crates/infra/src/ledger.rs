//! Inventory ledger: persistent fill-level state and its mutation API.
//!
//! Every mutation of one fragrance's record runs under that fragrance's lock
//! and inside a single SQLite transaction, so a usage update can never be lost
//! to a concurrent edit or usage update of the same bottle.

use chrono::{NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, instrument};

use scentrack_core::{DomainError, FragranceId, UserId};
use scentrack_inventory::{
    Estimator, InventoryPatch, InventoryRecord, LowStockAlert, NewInventory, NewUsage, UsageApplied,
    UsageEvent, collect_low_stock,
};

use crate::db;
use crate::error::{ServiceError, ServiceResult, unique_as_exists};
use crate::locks::KeyedLocks;
use crate::store;

#[derive(Debug)]
pub struct InventoryLedger {
    pool: SqlitePool,
    estimator: Estimator,
    locks: KeyedLocks<FragranceId>,
}

impl InventoryLedger {
    pub fn new(pool: SqlitePool, estimator: Estimator) -> Self {
        Self {
            pool,
            estimator,
            locks: KeyedLocks::new(),
        }
    }

    /// Start tracking a bottle. Fails with `AlreadyExists` if one is tracked.
    #[instrument(skip(self, input), fields(fragrance_id = %input.fragrance_id))]
    pub async fn create(&self, input: NewInventory, today: NaiveDate) -> ServiceResult<InventoryRecord> {
        let mut record = input.into_record(Utc::now())?;
        let fragrance_id = record.fragrance_id;

        let _guard = self.locks.lock(fragrance_id).await;
        let mut tx = db::begin_write(&self.pool).await?;

        if store::fragrances::find(&mut tx, fragrance_id).await?.is_none() {
            return Err(ServiceError::not_found("fragrance"));
        }
        if store::inventory::find(&mut tx, fragrance_id).await?.is_some() {
            return Err(DomainError::already_exists("inventory record for fragrance").into());
        }

        let events =
            store::usage::list_in_window(&mut tx, fragrance_id, self.estimator.window(today)).await?;
        record.estimated_days_remaining = self.estimator.estimate(&record, &events, today);

        store::inventory::insert(&mut tx, &record)
            .await
            .map_err(|e| unique_as_exists(e, "inventory record for fragrance"))?;
        tx.commit().await?;

        info!(
            bottle_size_ml = record.bottle_size_ml,
            level = record.current_level_percent,
            "inventory record created"
        );
        Ok(record)
    }

    /// `None` means the fragrance is simply not tracked.
    pub async fn get(&self, fragrance_id: FragranceId) -> ServiceResult<Option<InventoryRecord>> {
        let mut conn = self.pool.acquire().await?;
        Ok(store::inventory::find(&mut conn, fragrance_id).await?)
    }

    /// Stored record, or the implicit full-bottle view for an untracked
    /// fragrance. `NotFound` only when the fragrance itself is unknown.
    pub async fn get_or_default(&self, fragrance_id: FragranceId) -> ServiceResult<InventoryRecord> {
        let mut conn = self.pool.acquire().await?;
        if let Some(record) = store::inventory::find(&mut conn, fragrance_id).await? {
            return Ok(record);
        }
        if store::fragrances::find(&mut conn, fragrance_id).await?.is_none() {
            return Err(ServiceError::not_found("fragrance"));
        }
        Ok(InventoryRecord::untracked_default(fragrance_id, Utc::now()))
    }

    /// Subtract consumed millilitres and refresh the estimate.
    ///
    /// A no-op (returning the unchanged record) when tracking is disabled.
    #[instrument(skip(self))]
    pub async fn apply_usage(
        &self,
        fragrance_id: FragranceId,
        usage_ml: f64,
        today: NaiveDate,
    ) -> ServiceResult<InventoryRecord> {
        let _guard = self.locks.lock(fragrance_id).await;
        let mut tx = db::begin_write(&self.pool).await?;
        let record = self.apply_usage_in(&mut tx, fragrance_id, usage_ml, today).await?;
        tx.commit().await?;
        Ok(record)
    }

    /// Direct usage path: append the event and apply it atomically.
    ///
    /// Unlike wear recording, a missing inventory record is an error here and
    /// nothing is written.
    #[instrument(skip(self, usage), fields(fragrance_id = %usage.fragrance_id))]
    pub async fn record_usage(
        &self,
        usage: NewUsage,
        today: NaiveDate,
    ) -> ServiceResult<(UsageEvent, InventoryRecord)> {
        let event = usage.into_event(Utc::now())?;
        let fragrance_id = event.fragrance_id;

        let _guard = self.locks.lock(fragrance_id).await;
        let mut tx = db::begin_write(&self.pool).await?;

        if store::fragrances::find(&mut tx, fragrance_id).await?.is_none() {
            return Err(ServiceError::not_found("fragrance"));
        }
        store::usage::insert(&mut tx, &event).await?;
        let record = self
            .apply_usage_in(&mut tx, fragrance_id, event.usage_ml(), today)
            .await?;
        tx.commit().await?;

        Ok((event, record))
    }

    async fn apply_usage_in(
        &self,
        conn: &mut SqliteConnection,
        fragrance_id: FragranceId,
        usage_ml: f64,
        today: NaiveDate,
    ) -> ServiceResult<InventoryRecord> {
        let mut record = store::inventory::find(&mut *conn, fragrance_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("inventory record"))?;

        match record.apply_usage(usage_ml, Utc::now())? {
            UsageApplied::Skipped => {
                debug!(%fragrance_id, "usage tracking disabled; level unchanged");
                return Ok(record);
            }
            UsageApplied::Applied { percent_delta } => {
                debug!(%fragrance_id, percent_delta, level = record.current_level_percent, "usage applied");
            }
        }

        let events =
            store::usage::list_in_window(&mut *conn, fragrance_id, self.estimator.window(today)).await?;
        record.estimated_days_remaining = self.estimator.estimate(&record, &events, today);
        store::inventory::update(conn, &record).await?;
        Ok(record)
    }

    /// Explicit correction. Changing the level or bottle size re-estimates
    /// before the write.
    #[instrument(skip(self, patch))]
    pub async fn edit(
        &self,
        fragrance_id: FragranceId,
        patch: InventoryPatch,
        today: NaiveDate,
    ) -> ServiceResult<InventoryRecord> {
        patch.validate()?;

        let _guard = self.locks.lock(fragrance_id).await;
        let mut tx = db::begin_write(&self.pool).await?;

        let mut record = store::inventory::find(&mut tx, fragrance_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("inventory record"))?;
        patch.apply_to(&mut record, Utc::now())?;

        if patch.affects_estimate() {
            let events =
                store::usage::list_in_window(&mut tx, fragrance_id, self.estimator.window(today)).await?;
            record.estimated_days_remaining = self.estimator.estimate(&record, &events, today);
        }

        store::inventory::update(&mut tx, &record).await?;
        tx.commit().await?;

        info!(level = record.current_level_percent, "inventory record edited");
        Ok(record)
    }

    /// Recompute and persist the cached estimate for one record.
    pub async fn estimate(&self, fragrance_id: FragranceId, today: NaiveDate) -> ServiceResult<InventoryRecord> {
        let _guard = self.locks.lock(fragrance_id).await;
        let mut tx = db::begin_write(&self.pool).await?;

        let mut record = store::inventory::find(&mut tx, fragrance_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("inventory record"))?;
        let events =
            store::usage::list_in_window(&mut tx, fragrance_id, self.estimator.window(today)).await?;
        record.estimated_days_remaining = self.estimator.estimate(&record, &events, today);

        store::inventory::update_estimate(&mut tx, fragrance_id, record.estimated_days_remaining).await?;
        tx.commit().await?;
        Ok(record)
    }

    /// Owned bottles of `owner` at or below their threshold, most urgent first.
    pub async fn list_low_stock(&self, owner: UserId) -> ServiceResult<Vec<LowStockAlert>> {
        let mut conn = self.pool.acquire().await?;
        let rows = store::inventory::list_low_stock(&mut conn, owner).await?;
        Ok(collect_low_stock(rows))
    }

    /// Every tracked fragrance across all owners.
    pub async fn tracked_fragrances(&self) -> ServiceResult<Vec<FragranceId>> {
        let mut conn = self.pool.acquire().await?;
        Ok(store::inventory::list_tracked(&mut conn).await?)
    }
}
