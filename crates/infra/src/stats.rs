//! Usage statistics over the append-only usage log.

use std::collections::HashMap;

use chrono::NaiveDate;
use sqlx::SqlitePool;

use scentrack_core::{DomainError, FragranceId, UserId};
use scentrack_inventory::{CollectionStats, ListType, UsageEvent, UsageSummary, UsageWindow};

use crate::error::{ServiceError, ServiceResult};
use crate::store;

const MAX_WINDOW_DAYS: u32 = 3650;

#[derive(Debug, Clone)]
pub struct UsageStats {
    pool: SqlitePool,
    default_window_days: u32,
}

impl UsageStats {
    pub fn new(pool: SqlitePool, default_window_days: u32) -> Self {
        Self {
            pool,
            default_window_days,
        }
    }

    fn window(&self, today: NaiveDate, window_days: Option<u32>) -> ServiceResult<UsageWindow> {
        let days = window_days.unwrap_or(self.default_window_days);
        if days == 0 || days > MAX_WINDOW_DAYS {
            return Err(DomainError::validation(format!(
                "window_days must be between 1 and {MAX_WINDOW_DAYS}"
            ))
            .into());
        }
        Ok(UsageWindow::trailing(today, days))
    }

    /// Usage log of one fragrance, oldest first.
    pub async fn list_usage(
        &self,
        fragrance_id: FragranceId,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> ServiceResult<Vec<UsageEvent>> {
        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                return Err(DomainError::validation("from must not be after to").into());
            }
        }
        let mut conn = self.pool.acquire().await?;
        if store::fragrances::find(&mut conn, fragrance_id).await?.is_none() {
            return Err(ServiceError::not_found("fragrance"));
        }
        Ok(store::usage::list_for_fragrance(&mut conn, fragrance_id, from, to).await?)
    }

    pub async fn summary(
        &self,
        fragrance_id: FragranceId,
        today: NaiveDate,
        window_days: Option<u32>,
    ) -> ServiceResult<UsageSummary> {
        let window = self.window(today, window_days)?;
        let mut conn = self.pool.acquire().await?;
        if store::fragrances::find(&mut conn, fragrance_id).await?.is_none() {
            return Err(ServiceError::not_found("fragrance"));
        }
        let events = store::usage::list_in_window(&mut conn, fragrance_id, window).await?;
        Ok(UsageSummary::from_events(fragrance_id, window, &events))
    }

    /// Usage across the owner's owned fragrances.
    pub async fn collection(
        &self,
        owner: UserId,
        today: NaiveDate,
        window_days: Option<u32>,
    ) -> ServiceResult<CollectionStats> {
        let window = self.window(today, window_days)?;
        let mut conn = self.pool.acquire().await?;

        let fragrances = store::fragrances::list_by_owner(&mut conn, owner, Some(ListType::Owned)).await?;
        let mut by_fragrance: HashMap<FragranceId, Vec<UsageEvent>> = HashMap::new();
        for event in store::usage::list_for_owner(&mut conn, owner, window).await? {
            by_fragrance.entry(event.fragrance_id).or_default().push(event);
        }

        let items = fragrances.into_iter().map(|f| {
            let events = by_fragrance.remove(&f.id).unwrap_or_default();
            (f, events)
        });
        Ok(CollectionStats::build(window, items))
    }
}
