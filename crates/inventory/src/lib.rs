//! Inventory/usage accounting domain.
//!
//! Business rules for fill-level tracking, usage logging, remaining-days
//! estimation, daily wear and usage statistics, implemented as deterministic
//! domain logic (no IO, no HTTP, no storage). Callers pass "today" explicitly.

pub mod estimate;
pub mod fragrance;
pub mod low_stock;
pub mod record;
pub mod stats;
pub mod usage;
pub mod wear;

pub use estimate::{DaysRemaining, Estimator, UsageWindow};
pub use fragrance::{Fragrance, FragranceRef, ListType, NewFragrance};
pub use low_stock::{LowStockAlert, collect_low_stock};
pub use record::{InventoryPatch, InventoryRecord, NewInventory, UsageApplied};
pub use stats::{CollectionStats, FragranceUsage, UsageSummary};
pub use usage::{NewUsage, UsageEvent, UsageTotals};
pub use wear::{NewWear, WearEntry, WearRecord};
