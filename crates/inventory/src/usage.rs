use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use scentrack_core::{DomainError, DomainResult, FragranceId, UsageEventId};

/// Millilitres assumed per spray when no explicit amount is recorded.
pub const ML_PER_SPRAY: f64 = 0.1;

const MAX_NOTE_LEN: usize = 500;

pub fn spray_ml(spray_count: u32) -> f64 {
    f64::from(spray_count) * ML_PER_SPRAY
}

/// One dated entry of the append-only usage log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageEvent {
    pub id: UsageEventId,
    pub fragrance_id: FragranceId,
    pub date: NaiveDate,
    pub spray_count: u32,
    pub estimated_usage_ml: Option<f64>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl UsageEvent {
    /// Consumed millilitres, falling back to the per-spray estimate.
    pub fn usage_ml(&self) -> f64 {
        self.estimated_usage_ml
            .unwrap_or_else(|| spray_ml(self.spray_count))
    }
}

/// Request to append a usage event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewUsage {
    pub fragrance_id: FragranceId,
    pub date: NaiveDate,
    pub spray_count: u32,
    pub estimated_usage_ml: Option<f64>,
    pub note: Option<String>,
}

impl NewUsage {
    pub fn sprays(fragrance_id: FragranceId, date: NaiveDate, spray_count: u32) -> Self {
        Self {
            fragrance_id,
            date,
            spray_count,
            estimated_usage_ml: None,
            note: None,
        }
    }

    pub fn with_usage_ml(mut self, ml: f64) -> Self {
        self.estimated_usage_ml = Some(ml);
        self
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.spray_count == 0 {
            return Err(DomainError::validation("spray_count must be positive"));
        }
        if let Some(ml) = self.estimated_usage_ml {
            if !ml.is_finite() || ml < 0.0 {
                return Err(DomainError::validation(
                    "estimated_usage_ml must be a non-negative number",
                ));
            }
        }
        if self.note.as_ref().is_some_and(|n| n.len() > MAX_NOTE_LEN) {
            return Err(DomainError::validation(format!(
                "note must be at most {MAX_NOTE_LEN} characters"
            )));
        }
        Ok(())
    }

    /// Validate and materialize the event. A missing ml amount is derived from
    /// the spray count so the stored row is self-describing.
    pub fn into_event(self, now: DateTime<Utc>) -> DomainResult<UsageEvent> {
        self.validate()?;
        let estimated = self
            .estimated_usage_ml
            .unwrap_or_else(|| spray_ml(self.spray_count));
        Ok(UsageEvent {
            id: UsageEventId::new(),
            fragrance_id: self.fragrance_id,
            date: self.date,
            spray_count: self.spray_count,
            estimated_usage_ml: Some(estimated),
            note: self.note.filter(|n| !n.trim().is_empty()),
            created_at: now,
        })
    }
}

/// Aggregates over a set of usage events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageTotals {
    pub total_sprays: u64,
    pub total_usage_ml: f64,
    /// Calendar days with at least one event.
    pub distinct_days: u32,
    pub last_used: Option<NaiveDate>,
}

impl UsageTotals {
    pub fn from_events<'a>(events: impl IntoIterator<Item = &'a UsageEvent>) -> Self {
        let mut days = BTreeSet::new();
        let mut totals = UsageTotals::default();
        for event in events {
            totals.total_sprays += u64::from(event.spray_count);
            totals.total_usage_ml += event.usage_ml();
            days.insert(event.date);
        }
        totals.distinct_days = u32::try_from(days.len()).unwrap_or(u32::MAX);
        totals.last_used = days.last().copied();
        totals
    }

    /// Average ml per day of use (not per calendar day).
    pub fn average_daily_usage_ml(&self) -> f64 {
        self.total_usage_ml / f64::from(self.distinct_days.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn missing_ml_is_derived_from_sprays() {
        let event = NewUsage::sprays(FragranceId::new(), day(1), 5)
            .into_event(Utc::now())
            .unwrap();
        assert!((event.estimated_usage_ml.unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn explicit_ml_wins_over_sprays() {
        let event = NewUsage::sprays(FragranceId::new(), day(1), 5)
            .with_usage_ml(1.2)
            .into_event(Utc::now())
            .unwrap();
        assert_eq!(event.usage_ml(), 1.2);
    }

    #[test]
    fn zero_sprays_and_negative_ml_are_invalid() {
        assert!(NewUsage::sprays(FragranceId::new(), day(1), 0).validate().is_err());
        assert!(
            NewUsage::sprays(FragranceId::new(), day(1), 2)
                .with_usage_ml(-0.1)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn totals_count_distinct_days_only() {
        let id = FragranceId::new();
        let events: Vec<_> = [(1, 3), (1, 2), (4, 5)]
            .into_iter()
            .map(|(d, sprays)| {
                NewUsage::sprays(id, day(d), sprays)
                    .into_event(Utc::now())
                    .unwrap()
            })
            .collect();

        let totals = UsageTotals::from_events(&events);
        assert_eq!(totals.total_sprays, 10);
        assert_eq!(totals.distinct_days, 2);
        assert_eq!(totals.last_used, Some(day(4)));
        assert!((totals.average_daily_usage_ml() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn legacy_rows_without_ml_fall_back_to_sprays() {
        let event = UsageEvent {
            id: UsageEventId::new(),
            fragrance_id: FragranceId::new(),
            date: day(2),
            spray_count: 4,
            estimated_usage_ml: None,
            note: None,
            created_at: Utc::now(),
        };
        assert!((event.usage_ml() - 0.4).abs() < 1e-12);
    }
}
