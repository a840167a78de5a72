//! Daily wear recorder.
//!
//! Recording what was worn is the primary operation; inventory bookkeeping is
//! secondary. Once the wear is committed, failures while logging usage or
//! applying it to the ledger are logged and returned as warnings.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{info, warn};

use scentrack_core::{DomainError, FragranceId, UserId, WearRecordId};
use scentrack_inventory::{NewUsage, NewWear, UsageEvent, WearRecord};

use crate::catalog::FragranceCatalog;
use crate::db;
use crate::error::{ServiceError, ServiceResult};
use crate::ledger::InventoryLedger;
use crate::store;

/// Inventory bookkeeping that did not happen for one worn fragrance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventoryWarning {
    pub fragrance_id: FragranceId,
    pub message: String,
}

impl InventoryWarning {
    fn new(fragrance_id: FragranceId, err: &ServiceError) -> Self {
        Self {
            fragrance_id,
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WearOutcome {
    pub wear: WearRecord,
    pub usage_events: Vec<UsageEvent>,
    pub warnings: Vec<InventoryWarning>,
}

#[derive(Debug, Clone)]
pub struct WearRecorder {
    pool: SqlitePool,
    catalog: FragranceCatalog,
    ledger: Arc<InventoryLedger>,
}

impl WearRecorder {
    pub fn new(pool: SqlitePool, catalog: FragranceCatalog, ledger: Arc<InventoryLedger>) -> Self {
        Self { pool, catalog, ledger }
    }

    pub async fn record(&self, input: NewWear, today: NaiveDate) -> ServiceResult<WearOutcome> {
        input.validate()?;
        let owner = input.owner_user_id;

        for entry in &input.entries {
            match self.catalog.lookup(entry.fragrance_id).await? {
                Some(f) if f.owner_user_id == owner => {}
                _ => {
                    return Err(ServiceError::not_found(format!(
                        "fragrance {}",
                        entry.fragrance_id
                    )));
                }
            }
        }

        let wear_id = self.write_wear(&input).await?;
        info!(%wear_id, date = %input.date, entries = input.entries.len(), "wear recorded");

        let mut usage_events = Vec::new();
        let mut warnings = Vec::new();
        for usage in input.usage_requests() {
            let fragrance_id = usage.fragrance_id;
            let event = match self.append_usage(usage).await {
                Ok(event) => event,
                Err(e) => {
                    warn!(%fragrance_id, error = %e, "usage event not logged for worn fragrance");
                    warnings.push(InventoryWarning::new(fragrance_id, &e));
                    continue;
                }
            };
            let usage_ml = event.usage_ml();
            usage_events.push(event);

            if let Err(e) = self.ledger.apply_usage(fragrance_id, usage_ml, today).await {
                warn!(%fragrance_id, error = %e, "inventory update after wear failed");
                warnings.push(InventoryWarning::new(fragrance_id, &e));
            }
        }

        let wear = self
            .get(owner, input.date)
            .await?
            .ok_or_else(|| ServiceError::not_found("wear record"))?;

        Ok(WearOutcome {
            wear,
            usage_events,
            warnings,
        })
    }

    /// Insert the day's record (or extend the existing one) in one transaction.
    async fn write_wear(&self, input: &NewWear) -> ServiceResult<WearRecordId> {
        let mut tx = db::begin_write(&self.pool).await?;

        let wear_id = match store::wear::find_header(&mut tx, input.owner_user_id, input.date).await? {
            Some(existing) => {
                if let Some(note) = input.note.as_deref() {
                    store::wear::update_note(&mut tx, existing.id, note).await?;
                }
                existing.id
            }
            None => {
                let header = WearRecord {
                    id: WearRecordId::new(),
                    owner_user_id: input.owner_user_id,
                    date: input.date,
                    note: input.note.clone(),
                    entries: Vec::new(),
                    created_at: Utc::now(),
                };
                store::wear::insert_header(&mut tx, &header).await?;
                header.id
            }
        };

        let start = store::wear::count_entries(&mut tx, wear_id).await?;
        for (offset, entry) in input.entries.iter().enumerate() {
            store::wear::upsert_entry(&mut tx, wear_id, entry, start + offset as i64).await?;
        }

        tx.commit().await?;
        Ok(wear_id)
    }

    async fn append_usage(&self, usage: NewUsage) -> ServiceResult<UsageEvent> {
        let event = usage.into_event(Utc::now())?;
        let mut conn = self.pool.acquire().await?;
        store::usage::insert(&mut conn, &event).await?;
        Ok(event)
    }

    pub async fn get(&self, owner: UserId, date: NaiveDate) -> ServiceResult<Option<WearRecord>> {
        let mut conn = self.pool.acquire().await?;
        Ok(store::wear::find_by_date(&mut conn, owner, date).await?)
    }

    pub async fn list(&self, owner: UserId, from: NaiveDate, to: NaiveDate) -> ServiceResult<Vec<WearRecord>> {
        if from > to {
            return Err(DomainError::validation("from must not be after to").into());
        }
        let mut conn = self.pool.acquire().await?;
        Ok(store::wear::list_range(&mut conn, owner, from, to).await?)
    }
}
