//! Remaining-days projection.
//!
//! Model:
//! - Empty bottle: zero days.
//! - No usage in the trailing window: assume a baseline of 0.5 ml/day.
//! - Otherwise divide remaining ml by the average ml per day *of use*
//!   (days with at least one event, not calendar days).

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::record::InventoryRecord;
use crate::usage::{UsageEvent, UsageTotals};

pub const DEFAULT_WINDOW_DAYS: u32 = 30;
pub const BASELINE_DAILY_USAGE_ML: f64 = 0.5;

// Absorbs binary rounding of decimal ml amounts before flooring.
const FLOOR_EPSILON: f64 = 1e-9;

/// Cached advisory projection. Serialized as a number, or `null` when unbounded.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<u32>", into = "Option<u32>")]
pub enum DaysRemaining {
    Days(u32),
    /// No measurable consumption; the bottle effectively never runs out.
    Unbounded,
}

impl DaysRemaining {
    pub fn days(&self) -> Option<u32> {
        match self {
            DaysRemaining::Days(d) => Some(*d),
            DaysRemaining::Unbounded => None,
        }
    }
}

impl From<Option<u32>> for DaysRemaining {
    fn from(value: Option<u32>) -> Self {
        value.map_or(DaysRemaining::Unbounded, DaysRemaining::Days)
    }
}

impl From<DaysRemaining> for Option<u32> {
    fn from(value: DaysRemaining) -> Self {
        value.days()
    }
}

/// Inclusive date range `[start, end]`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl UsageWindow {
    /// The `days` days before `today` through `today` itself.
    pub fn trailing(today: NaiveDate, days: u32) -> Self {
        let start = today
            .checked_sub_days(Days::new(u64::from(days)))
            .unwrap_or(NaiveDate::MIN);
        Self { start, end: today }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Stateless remaining-days estimator.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Estimator {
    window_days: u32,
}

impl Default for Estimator {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_WINDOW_DAYS,
        }
    }
}

impl Estimator {
    pub fn new(window_days: u32) -> Self {
        Self { window_days }
    }

    pub fn window(&self, today: NaiveDate) -> UsageWindow {
        UsageWindow::trailing(today, self.window_days)
    }

    /// Project days until the bottle is empty.
    ///
    /// `events` may contain entries outside the window; they are ignored.
    pub fn estimate(
        &self,
        record: &InventoryRecord,
        events: &[UsageEvent],
        today: NaiveDate,
    ) -> DaysRemaining {
        if record.current_level_percent <= 0.0 {
            return DaysRemaining::Days(0);
        }

        let remaining_ml = record.remaining_ml();
        let window = self.window(today);
        let totals = UsageTotals::from_events(events.iter().filter(|e| window.contains(e.date)));

        if totals.distinct_days == 0 {
            return floor_days(remaining_ml / BASELINE_DAILY_USAGE_ML);
        }

        let average = totals.average_daily_usage_ml();
        if average <= 0.0 {
            return DaysRemaining::Unbounded;
        }

        floor_days(remaining_ml / average)
    }
}

fn floor_days(raw: f64) -> DaysRemaining {
    let days = (raw + FLOOR_EPSILON).floor().max(0.0);
    if days >= f64::from(u32::MAX) {
        DaysRemaining::Days(u32::MAX)
    } else {
        DaysRemaining::Days(days as u32)
    }
}
