use serde::{Deserialize, Serialize};

use scentrack_core::FragranceId;

use crate::estimate::DaysRemaining;
use crate::fragrance::{Fragrance, ListType};
use crate::record::InventoryRecord;

/// A tracked, owned bottle at or below its low-stock threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LowStockAlert {
    pub fragrance_id: FragranceId,
    pub name: String,
    pub brand: Option<String>,
    pub current_level_percent: f64,
    pub low_threshold_percent: f64,
    pub estimated_days_remaining: DaysRemaining,
}

/// Keep owned bottles with `level <= threshold`, most urgent first.
///
/// The sort is stable, so equal levels keep their input order.
pub fn collect_low_stock<I>(items: I) -> Vec<LowStockAlert>
where
    I: IntoIterator<Item = (Fragrance, InventoryRecord)>,
{
    let mut alerts: Vec<LowStockAlert> = items
        .into_iter()
        .filter(|(f, r)| f.list_type == ListType::Owned && r.is_low())
        .map(|(f, r)| LowStockAlert {
            fragrance_id: f.id,
            name: f.name,
            brand: f.brand,
            current_level_percent: r.current_level_percent,
            low_threshold_percent: r.low_threshold_percent,
            estimated_days_remaining: r.estimated_days_remaining,
        })
        .collect();

    alerts.sort_by(|a, b| a.current_level_percent.total_cmp(&b.current_level_percent));
    alerts
}
