use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use scentrack_core::{DomainError, DomainResult, FragranceId, InventoryRecordId};

use crate::estimate::DaysRemaining;

pub const DEFAULT_LEVEL_PERCENT: f64 = 100.0;
pub const DEFAULT_LOW_THRESHOLD_PERCENT: f64 = 20.0;

/// Ledger entry for one fragrance bottle.
///
/// `current_level_percent` stays within `[0, 100]`. It only decreases through
/// [`InventoryRecord::apply_usage`]; [`InventoryPatch`] is the explicit
/// correction path that may set it to any valid value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub id: InventoryRecordId,
    pub fragrance_id: FragranceId,
    pub bottle_size_ml: f64,
    pub current_level_percent: f64,
    pub usage_tracking_enabled: bool,
    pub low_threshold_percent: f64,
    pub estimated_days_remaining: DaysRemaining,
    pub purchase_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Outcome of applying consumed millilitres to a record.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum UsageApplied {
    /// Tracking is disabled; the level was left untouched.
    Skipped,
    /// The level moved down by `percent_delta` (before clamping at zero).
    Applied { percent_delta: f64 },
}

impl InventoryRecord {
    /// Implicit view of a fragrance nobody has started tracking yet: a full
    /// bottle of unknown size. Never persisted.
    pub fn untracked_default(fragrance_id: FragranceId, now: DateTime<Utc>) -> Self {
        Self {
            id: InventoryRecordId::new(),
            fragrance_id,
            bottle_size_ml: 0.0,
            current_level_percent: DEFAULT_LEVEL_PERCENT,
            usage_tracking_enabled: true,
            low_threshold_percent: DEFAULT_LOW_THRESHOLD_PERCENT,
            estimated_days_remaining: DaysRemaining::Unbounded,
            purchase_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn remaining_ml(&self) -> f64 {
        self.current_level_percent / 100.0 * self.bottle_size_ml
    }

    pub fn is_low(&self) -> bool {
        self.current_level_percent <= self.low_threshold_percent
    }

    /// Subtract `usage_ml` from the fill level.
    ///
    /// The caller is responsible for re-estimating and persisting afterwards.
    pub fn apply_usage(&mut self, usage_ml: f64, now: DateTime<Utc>) -> DomainResult<UsageApplied> {
        if !usage_ml.is_finite() || usage_ml < 0.0 {
            return Err(DomainError::validation("usage ml must be a non-negative number"));
        }
        if !self.usage_tracking_enabled {
            return Ok(UsageApplied::Skipped);
        }

        let percent_delta = usage_ml / self.bottle_size_ml * 100.0;
        self.current_level_percent = (self.current_level_percent - percent_delta).clamp(0.0, 100.0);
        self.updated_at = now;

        Ok(UsageApplied::Applied { percent_delta })
    }
}

/// Input for explicit record creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewInventory {
    pub fragrance_id: FragranceId,
    pub bottle_size_ml: f64,
    pub purchase_date: Option<NaiveDate>,
    pub current_level_percent: Option<f64>,
    pub usage_tracking_enabled: Option<bool>,
    pub low_threshold_percent: Option<f64>,
}

impl NewInventory {
    pub fn new(fragrance_id: FragranceId, bottle_size_ml: f64) -> Self {
        Self {
            fragrance_id,
            bottle_size_ml,
            purchase_date: None,
            current_level_percent: None,
            usage_tracking_enabled: None,
            low_threshold_percent: None,
        }
    }

    pub fn with_level(mut self, level_percent: f64) -> Self {
        self.current_level_percent = Some(level_percent);
        self
    }

    pub fn with_threshold(mut self, threshold_percent: f64) -> Self {
        self.low_threshold_percent = Some(threshold_percent);
        self
    }

    pub fn with_tracking(mut self, enabled: bool) -> Self {
        self.usage_tracking_enabled = Some(enabled);
        self
    }

    /// Validate and apply defaults. The estimate starts out unbounded until the
    /// ledger computes it.
    pub fn into_record(self, now: DateTime<Utc>) -> DomainResult<InventoryRecord> {
        validate_bottle_size(self.bottle_size_ml)?;
        let level = self.current_level_percent.unwrap_or(DEFAULT_LEVEL_PERCENT);
        validate_percent("current_level_percent", level)?;
        let threshold = self
            .low_threshold_percent
            .unwrap_or(DEFAULT_LOW_THRESHOLD_PERCENT);
        validate_percent("low_threshold_percent", threshold)?;

        Ok(InventoryRecord {
            id: InventoryRecordId::new(),
            fragrance_id: self.fragrance_id,
            bottle_size_ml: self.bottle_size_ml,
            current_level_percent: level,
            usage_tracking_enabled: self.usage_tracking_enabled.unwrap_or(true),
            low_threshold_percent: threshold,
            estimated_days_remaining: DaysRemaining::Unbounded,
            purchase_date: self.purchase_date,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Partial corrective update of a record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InventoryPatch {
    pub bottle_size_ml: Option<f64>,
    pub current_level_percent: Option<f64>,
    pub low_threshold_percent: Option<f64>,
    pub usage_tracking_enabled: Option<bool>,
    pub purchase_date: Option<NaiveDate>,
}

impl InventoryPatch {
    pub fn is_empty(&self) -> bool {
        self.bottle_size_ml.is_none()
            && self.current_level_percent.is_none()
            && self.low_threshold_percent.is_none()
            && self.usage_tracking_enabled.is_none()
            && self.purchase_date.is_none()
    }

    /// Whether applying this patch invalidates the cached estimate.
    pub fn affects_estimate(&self) -> bool {
        self.current_level_percent.is_some() || self.bottle_size_ml.is_some()
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.is_empty() {
            return Err(DomainError::validation("no fields to update"));
        }
        if let Some(size) = self.bottle_size_ml {
            validate_bottle_size(size)?;
        }
        if let Some(level) = self.current_level_percent {
            validate_percent("current_level_percent", level)?;
        }
        if let Some(threshold) = self.low_threshold_percent {
            validate_percent("low_threshold_percent", threshold)?;
        }
        Ok(())
    }

    /// Validate, then overwrite the given fields. Nothing is written on error.
    pub fn apply_to(&self, record: &mut InventoryRecord, now: DateTime<Utc>) -> DomainResult<()> {
        self.validate()?;

        if let Some(size) = self.bottle_size_ml {
            record.bottle_size_ml = size;
        }
        if let Some(level) = self.current_level_percent {
            record.current_level_percent = level;
        }
        if let Some(threshold) = self.low_threshold_percent {
            record.low_threshold_percent = threshold;
        }
        if let Some(enabled) = self.usage_tracking_enabled {
            record.usage_tracking_enabled = enabled;
        }
        if let Some(date) = self.purchase_date {
            record.purchase_date = Some(date);
        }
        record.updated_at = now;
        Ok(())
    }
}

pub fn validate_bottle_size(size_ml: f64) -> DomainResult<()> {
    if !size_ml.is_finite() || size_ml <= 0.0 {
        return Err(DomainError::validation("bottle_size_ml must be a positive number"));
    }
    Ok(())
}

pub fn validate_percent(field: &str, value: f64) -> DomainResult<()> {
    if !value.is_finite() || !(0.0..=100.0).contains(&value) {
        return Err(DomainError::validation(format!(
            "{field} must be between 0 and 100"
        )));
    }
    Ok(())
}
