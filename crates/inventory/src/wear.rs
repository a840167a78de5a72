use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use scentrack_core::{DomainError, DomainResult, FragranceId, UserId, WearRecordId};

use crate::usage::NewUsage;

const MAX_ENTRIES: usize = 20;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WearEntry {
    pub fragrance_id: FragranceId,
    /// Zero means "worn, sprays not counted"; such entries do not touch the ledger.
    pub spray_count: u32,
}

/// What a user wore on one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WearRecord {
    pub id: WearRecordId,
    pub owner_user_id: UserId,
    pub date: NaiveDate,
    pub note: Option<String>,
    pub entries: Vec<WearEntry>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewWear {
    pub owner_user_id: UserId,
    pub date: NaiveDate,
    pub note: Option<String>,
    pub entries: Vec<WearEntry>,
}

impl NewWear {
    pub fn validate(&self) -> DomainResult<()> {
        if self.entries.is_empty() {
            return Err(DomainError::validation("at least one fragrance entry is required"));
        }
        if self.entries.len() > MAX_ENTRIES {
            return Err(DomainError::validation(format!(
                "at most {MAX_ENTRIES} fragrances per day"
            )));
        }
        let mut seen = HashSet::new();
        for entry in &self.entries {
            if !seen.insert(entry.fragrance_id) {
                return Err(DomainError::validation(format!(
                    "fragrance {} listed more than once",
                    entry.fragrance_id
                )));
            }
        }
        Ok(())
    }

    /// Usage events implied by this wear: one per entry with counted sprays.
    pub fn usage_requests(&self) -> Vec<NewUsage> {
        self.entries
            .iter()
            .filter(|e| e.spray_count > 0)
            .map(|e| NewUsage::sprays(e.fragrance_id, self.date, e.spray_count))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wear(entries: Vec<WearEntry>) -> NewWear {
        NewWear {
            owner_user_id: UserId::new(),
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            note: None,
            entries,
        }
    }

    #[test]
    fn duplicate_and_empty_entries_are_rejected() {
        assert!(wear(vec![]).validate().is_err());
        let id = FragranceId::new();
        let dup = wear(vec![
            WearEntry { fragrance_id: id, spray_count: 2 },
            WearEntry { fragrance_id: id, spray_count: 3 },
        ]);
        assert!(dup.validate().is_err());
    }

    #[test]
    fn uncounted_entries_produce_no_usage() {
        let w = wear(vec![
            WearEntry { fragrance_id: FragranceId::new(), spray_count: 0 },
            WearEntry { fragrance_id: FragranceId::new(), spray_count: 4 },
        ]);
        w.validate().unwrap();
        let usage = w.usage_requests();
        assert_eq!(usage.len(), 1);
        assert_eq!(usage[0].spray_count, 4);
        assert_eq!(usage[0].date, w.date);
    }
}
