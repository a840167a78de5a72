use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use scentrack_core::FragranceId;

use crate::estimate::UsageWindow;
use crate::fragrance::Fragrance;
use crate::usage::{UsageEvent, UsageTotals};

/// Usage of one fragrance over a trailing window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageSummary {
    pub fragrance_id: FragranceId,
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    pub total_sprays: u64,
    pub total_usage_ml: f64,
    pub distinct_days: u32,
    pub average_daily_usage_ml: f64,
    pub last_used: Option<NaiveDate>,
}

impl UsageSummary {
    pub fn from_events(fragrance_id: FragranceId, window: UsageWindow, events: &[UsageEvent]) -> Self {
        let totals = UsageTotals::from_events(events.iter().filter(|e| window.contains(e.date)));
        let average = if totals.distinct_days == 0 {
            0.0
        } else {
            totals.average_daily_usage_ml()
        };
        Self {
            fragrance_id,
            window_start: window.start,
            window_end: window.end,
            total_sprays: totals.total_sprays,
            total_usage_ml: totals.total_usage_ml,
            distinct_days: totals.distinct_days,
            average_daily_usage_ml: average,
            last_used: totals.last_used,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FragranceUsage {
    pub name: String,
    pub brand: Option<String>,
    #[serde(flatten)]
    pub summary: UsageSummary,
}

/// Collection-wide usage, heaviest-used fragrance first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionStats {
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    pub total_sprays: u64,
    pub total_usage_ml: f64,
    pub fragrances: Vec<FragranceUsage>,
}

impl CollectionStats {
    pub fn build<I>(window: UsageWindow, items: I) -> Self
    where
        I: IntoIterator<Item = (Fragrance, Vec<UsageEvent>)>,
    {
        let mut fragrances: Vec<FragranceUsage> = items
            .into_iter()
            .map(|(f, events)| FragranceUsage {
                summary: UsageSummary::from_events(f.id, window, &events),
                name: f.name,
                brand: f.brand,
            })
            .collect();
        fragrances.sort_by(|a, b| {
            b.summary
                .total_usage_ml
                .total_cmp(&a.summary.total_usage_ml)
                .then_with(|| a.name.cmp(&b.name))
        });

        Self {
            window_start: window.start,
            window_end: window.end,
            total_sprays: fragrances.iter().map(|f| f.summary.total_sprays).sum(),
            total_usage_ml: fragrances.iter().map(|f| f.summary.total_usage_ml).sum(),
            fragrances,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use scentrack_core::UserId;

    use crate::fragrance::{ListType, NewFragrance};
    use crate::usage::NewUsage;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn fragrance(name: &str) -> Fragrance {
        NewFragrance {
            owner_user_id: UserId::new(),
            name: name.into(),
            brand: None,
            list_type: ListType::Owned,
        }
        .into_fragrance(Utc::now())
        .unwrap()
    }

    fn events(f: &Fragrance, entries: &[(u32, u32)]) -> Vec<UsageEvent> {
        entries
            .iter()
            .map(|(d, sprays)| NewUsage::sprays(f.id, day(*d), *sprays).into_event(Utc::now()).unwrap())
            .collect()
    }

    #[test]
    fn summary_ignores_events_outside_window() {
        let f = fragrance("Santal");
        let window = UsageWindow::trailing(day(20), 5);
        let evs = events(&f, &[(1, 10), (16, 2), (20, 4)]);
        let summary = UsageSummary::from_events(f.id, window, &evs);
        assert_eq!(summary.total_sprays, 6);
        assert_eq!(summary.distinct_days, 2);
        assert_eq!(summary.last_used, Some(day(20)));
    }

    #[test]
    fn empty_summary_has_zero_average() {
        let f = fragrance("Unused");
        let summary = UsageSummary::from_events(f.id, UsageWindow::trailing(day(20), 30), &[]);
        assert_eq!(summary.average_daily_usage_ml, 0.0);
        assert_eq!(summary.last_used, None);
    }

    #[test]
    fn collection_is_sorted_by_usage_descending() {
        let light = fragrance("Light");
        let heavy = fragrance("Heavy");
        let window = UsageWindow::trailing(day(20), 30);
        let light_events = events(&light, &[(10, 1)]);
        let heavy_events = events(&heavy, &[(10, 8), (11, 8)]);

        let stats = CollectionStats::build(window, vec![(light, light_events), (heavy, heavy_events)]);
        assert_eq!(stats.fragrances[0].name, "Heavy");
        assert_eq!(stats.total_sprays, 17);
    }
}
