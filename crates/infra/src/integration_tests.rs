//! Service-level tests against private SQLite databases, in memory or on a
//! temporary WAL file.
//!
//! Covers the ledger, catalog, wear recorder, statistics and sweep working
//! together on real storage.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use chrono::{Days, NaiveDate};
use sqlx::SqlitePool;
use tempfile::TempDir;

use scentrack_core::{DomainError, FragranceId, UserId};
use scentrack_inventory::{
    DaysRemaining, Estimator, InventoryPatch, ListType, NewFragrance, NewInventory, NewUsage,
    NewWear, WearEntry,
};

use crate::catalog::FragranceCatalog;
use crate::db;
use crate::error::ServiceError;
use crate::ledger::InventoryLedger;
use crate::stats::UsageStats;
use crate::sweep::SweepJob;
use crate::wear::WearRecorder;

struct Harness {
    catalog: FragranceCatalog,
    ledger: Arc<InventoryLedger>,
    wear: WearRecorder,
    stats: UsageStats,
}

async fn harness() -> Harness {
    harness_on(db::connect("sqlite::memory:").await.unwrap())
}

/// Harness on a WAL database file with a multi-connection pool. Keep the
/// returned directory alive for the duration of the test.
async fn file_harness() -> (Harness, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("scentrack.db").display());
    (harness_on(db::connect(&url).await.unwrap()), dir)
}

fn harness_on(pool: SqlitePool) -> Harness {
    let catalog = FragranceCatalog::new(pool.clone());
    let ledger = Arc::new(InventoryLedger::new(pool.clone(), Estimator::default()));
    let wear = WearRecorder::new(pool.clone(), catalog.clone(), ledger.clone());
    let stats = UsageStats::new(pool, 30);
    Harness {
        catalog,
        ledger,
        wear,
        stats,
    }
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
}

fn days_ago(n: u64) -> NaiveDate {
    today().checked_sub_days(Days::new(n)).unwrap()
}

async fn add_fragrance(h: &Harness, owner: UserId, name: &str, list_type: ListType) -> FragranceId {
    h.catalog
        .create(NewFragrance {
            owner_user_id: owner,
            name: name.to_string(),
            brand: Some("Maison Test".to_string()),
            list_type,
        })
        .await
        .unwrap()
        .id
}

async fn owned_bottle(h: &Harness, owner: UserId, name: &str, level: f64) -> FragranceId {
    let id = add_fragrance(h, owner, name, ListType::Owned).await;
    h.ledger
        .create(NewInventory::new(id, 100.0).with_level(level), today())
        .await
        .unwrap();
    id
}

#[tokio::test]
async fn five_sprays_take_half_a_percent_from_a_100ml_bottle() {
    let h = harness().await;
    let id = owned_bottle(&h, UserId::new(), "Vetiver", 80.0).await;

    let (event, record) = h
        .ledger
        .record_usage(NewUsage::sprays(id, today(), 5), today())
        .await
        .unwrap();

    assert!((event.usage_ml() - 0.5).abs() < 1e-9);
    assert!((record.current_level_percent - 79.5).abs() < 1e-9);

    let stored = h.ledger.get(id).await.unwrap().unwrap();
    assert!((stored.current_level_percent - 79.5).abs() < 1e-9);
}

#[tokio::test]
async fn estimate_uses_average_over_days_of_use() {
    let h = harness().await;
    let id = owned_bottle(&h, UserId::new(), "Iris", 60.0).await;

    for (date, sprays) in [(days_ago(2), 3), (days_ago(9), 5)] {
        h.ledger
            .record_usage(NewUsage::sprays(id, date, sprays), today())
            .await
            .unwrap();
    }
    // Correcting the level re-estimates from the logged history.
    let record = h
        .ledger
        .edit(
            id,
            InventoryPatch {
                current_level_percent: Some(50.0),
                ..Default::default()
            },
            today(),
        )
        .await
        .unwrap();
    assert_eq!(record.estimated_days_remaining, DaysRemaining::Days(125));

    let refreshed = h.ledger.estimate(id, today()).await.unwrap();
    assert_eq!(refreshed.estimated_days_remaining, DaysRemaining::Days(125));
    let stored = h.ledger.get(id).await.unwrap().unwrap();
    assert_eq!(stored.estimated_days_remaining, DaysRemaining::Days(125));
}

#[tokio::test]
async fn no_recent_usage_falls_back_to_baseline() {
    let h = harness().await;
    let id = add_fragrance(&h, UserId::new(), "Oud", ListType::Owned).await;

    let record = h
        .ledger
        .create(NewInventory::new(id, 100.0).with_level(50.0), today())
        .await
        .unwrap();
    assert_eq!(record.estimated_days_remaining, DaysRemaining::Days(100));
}

#[tokio::test]
async fn second_inventory_record_is_rejected_without_mutation() {
    let h = harness().await;
    let id = owned_bottle(&h, UserId::new(), "Neroli", 60.0).await;

    let err = h
        .ledger
        .create(NewInventory::new(id, 50.0).with_level(10.0), today())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Domain(DomainError::AlreadyExists(_))));

    let stored = h.ledger.get(id).await.unwrap().unwrap();
    assert_eq!(stored.bottle_size_ml, 100.0);
    assert_eq!(stored.current_level_percent, 60.0);
}

#[tokio::test]
async fn low_stock_lists_only_bottles_at_or_below_threshold() {
    let h = harness().await;
    let owner = UserId::new();
    let low = owned_bottle(&h, owner, "Almost Gone", 10.0).await;
    owned_bottle(&h, owner, "Half Full", 50.0).await;
    owned_bottle(&h, UserId::new(), "Someone Else", 5.0).await;

    let alerts = h.ledger.list_low_stock(owner).await.unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].fragrance_id, low);
    assert_eq!(alerts[0].name, "Almost Gone");
}

#[tokio::test]
async fn inventory_for_unknown_fragrance_is_not_found() {
    let h = harness().await;
    let err = h
        .ledger
        .create(NewInventory::new(FragranceId::new(), 100.0), today())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn untracked_fragrance_reads_as_full_bottle() {
    let h = harness().await;
    let id = add_fragrance(&h, UserId::new(), "Sample", ListType::Tried).await;

    assert!(h.ledger.get(id).await.unwrap().is_none());
    let view = h.ledger.get_or_default(id).await.unwrap();
    assert_eq!(view.current_level_percent, 100.0);
    assert_eq!(view.fragrance_id, id);
    // Reading the default does not create a record.
    assert!(h.ledger.get(id).await.unwrap().is_none());
}

#[tokio::test]
async fn disabled_tracking_logs_usage_but_keeps_level() {
    let h = harness().await;
    let id = add_fragrance(&h, UserId::new(), "Decant", ListType::Owned).await;
    h.ledger
        .create(NewInventory::new(id, 10.0).with_level(70.0).with_tracking(false), today())
        .await
        .unwrap();

    let (_, record) = h
        .ledger
        .record_usage(NewUsage::sprays(id, today(), 4), today())
        .await
        .unwrap();
    assert_eq!(record.current_level_percent, 70.0);

    let log = h.stats.list_usage(id, None, None).await.unwrap();
    assert_eq!(log.len(), 1);
}

#[tokio::test]
async fn direct_usage_without_inventory_writes_nothing() {
    let h = harness().await;
    let id = add_fragrance(&h, UserId::new(), "Wishful", ListType::Wishlist).await;

    let err = h
        .ledger
        .record_usage(NewUsage::sprays(id, today(), 2), today())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(h.stats.list_usage(id, None, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn edit_rejects_out_of_range_level_and_keeps_record() {
    let h = harness().await;
    let id = owned_bottle(&h, UserId::new(), "Amber", 40.0).await;

    let err = h
        .ledger
        .edit(
            id,
            InventoryPatch {
                current_level_percent: Some(120.0),
                ..Default::default()
            },
            today(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Domain(DomainError::Validation(_))));
    assert_eq!(h.ledger.get(id).await.unwrap().unwrap().current_level_percent, 40.0);
}

#[tokio::test]
async fn wear_without_inventory_is_kept_with_a_warning() {
    let h = harness().await;
    let owner = UserId::new();
    let tracked = owned_bottle(&h, owner, "Tracked", 80.0).await;
    let untracked = add_fragrance(&h, owner, "Untracked", ListType::Owned).await;

    let outcome = h
        .wear
        .record(
            NewWear {
                owner_user_id: owner,
                date: today(),
                note: Some("office".to_string()),
                entries: vec![
                    WearEntry {
                        fragrance_id: tracked,
                        spray_count: 5,
                    },
                    WearEntry {
                        fragrance_id: untracked,
                        spray_count: 3,
                    },
                ],
            },
            today(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.wear.entries.len(), 2);
    assert_eq!(outcome.usage_events.len(), 2);
    assert_eq!(outcome.warnings.len(), 1);
    assert_eq!(outcome.warnings[0].fragrance_id, untracked);

    let level = h.ledger.get(tracked).await.unwrap().unwrap().current_level_percent;
    assert!((level - 79.5).abs() < 1e-9);
}

#[tokio::test]
async fn wearing_again_on_the_same_day_adds_sprays() {
    let h = harness().await;
    let owner = UserId::new();
    let id = owned_bottle(&h, owner, "Citrus", 90.0).await;

    let wear = |sprays| NewWear {
        owner_user_id: owner,
        date: today(),
        note: None,
        entries: vec![WearEntry {
            fragrance_id: id,
            spray_count: sprays,
        }],
    };
    h.wear.record(wear(2), today()).await.unwrap();
    let outcome = h.wear.record(wear(3), today()).await.unwrap();

    assert_eq!(outcome.wear.entries.len(), 1);
    assert_eq!(outcome.wear.entries[0].spray_count, 5);
    let level = h.ledger.get(id).await.unwrap().unwrap().current_level_percent;
    assert!((level - 89.5).abs() < 1e-9);
}

#[tokio::test]
async fn wear_of_someone_elses_fragrance_is_not_found() {
    let h = harness().await;
    let other = add_fragrance(&h, UserId::new(), "Theirs", ListType::Owned).await;

    let err = h
        .wear
        .record(
            NewWear {
                owner_user_id: UserId::new(),
                date: today(),
                note: None,
                entries: vec![WearEntry {
                    fragrance_id: other,
                    spray_count: 1,
                }],
            },
            today(),
        )
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn deleting_a_fragrance_removes_its_inventory_and_usage() {
    let h = harness().await;
    let owner = UserId::new();
    let id = owned_bottle(&h, owner, "Gone", 50.0).await;
    h.ledger
        .record_usage(NewUsage::sprays(id, today(), 1), today())
        .await
        .unwrap();

    h.catalog.delete(owner, id).await.unwrap();

    assert!(h.ledger.get(id).await.unwrap().is_none());
    assert!(h.stats.list_usage(id, None, None).await.unwrap_err().is_not_found());
    assert!(h.catalog.delete(owner, id).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn collection_stats_cover_owned_fragrances_in_window() {
    let h = harness().await;
    let owner = UserId::new();
    let heavy = owned_bottle(&h, owner, "Heavy", 100.0).await;
    let light = owned_bottle(&h, owner, "Light", 100.0).await;

    for (id, date, sprays) in [(heavy, today(), 6), (heavy, days_ago(1), 4), (light, today(), 1), (light, days_ago(45), 9)] {
        h.ledger
            .record_usage(NewUsage::sprays(id, date, sprays), today())
            .await
            .unwrap();
    }

    let stats = h.stats.collection(owner, today(), None).await.unwrap();
    assert_eq!(stats.total_sprays, 11);
    assert_eq!(stats.fragrances.len(), 2);
    assert_eq!(stats.fragrances[0].summary.fragrance_id, heavy);
    assert_eq!(stats.fragrances[0].summary.distinct_days, 2);

    let summary = h.stats.summary(light, today(), Some(60)).await.unwrap();
    assert_eq!(summary.total_sprays, 10);

    assert!(h.stats.summary(light, today(), Some(0)).await.is_err());
}

#[tokio::test]
async fn sweep_refreshes_tracked_records_of_every_owner() {
    let h = harness().await;
    let a = owned_bottle(&h, UserId::new(), "A", 50.0).await;
    let b = owned_bottle(&h, UserId::new(), "B", 50.0).await;
    let off = add_fragrance(&h, UserId::new(), "Off", ListType::Owned).await;
    h.ledger
        .create(NewInventory::new(off, 100.0).with_level(50.0).with_tracking(false), today())
        .await
        .unwrap();

    // A week later with no usage the baseline still applies.
    let later = today().checked_add_days(Days::new(7)).unwrap();
    let cancel = AtomicBool::new(false);
    let report = h.ledger.run(later, &cancel).await.unwrap();

    assert_eq!(report.processed, 2);
    assert_eq!(report.updated, 2);
    assert_eq!(report.failed, 0);
    assert!(!report.cancelled);
    for id in [a, b] {
        let record = h.ledger.get(id).await.unwrap().unwrap();
        assert_eq!(record.estimated_days_remaining, DaysRemaining::Days(100));
    }
}

#[tokio::test]
async fn cancelled_sweep_stops_before_processing() {
    let h = harness().await;
    owned_bottle(&h, UserId::new(), "A", 50.0).await;

    let cancel = AtomicBool::new(true);
    let report = h.ledger.run(today(), &cancel).await.unwrap();
    assert!(report.cancelled);
    assert_eq!(report.processed, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_usage_updates_are_not_lost() {
    let h = harness().await;
    let id = owned_bottle(&h, UserId::new(), "Busy", 100.0).await;

    let mut tasks = Vec::new();
    for _ in 0..20 {
        let ledger = h.ledger.clone();
        tasks.push(tokio::spawn(async move {
            ledger.apply_usage(id, 1.0, today()).await.unwrap();
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let level = h.ledger.get(id).await.unwrap().unwrap().current_level_percent;
    assert!((level - 80.0).abs() < 1e-9);
}

#[tokio::test]
async fn repeated_wear_spray_counts_saturate() {
    let h = harness().await;
    let owner = UserId::new();
    let id = add_fragrance(&h, owner, "Endless", ListType::Owned).await;

    let wear = NewWear {
        owner_user_id: owner,
        date: today(),
        note: None,
        entries: vec![WearEntry {
            fragrance_id: id,
            spray_count: u32::MAX,
        }],
    };
    h.wear.record(wear.clone(), today()).await.unwrap();
    let outcome = h.wear.record(wear, today()).await.unwrap();
    assert_eq!(outcome.wear.entries[0].spray_count, u32::MAX);

    let listed = h.wear.list(owner, today(), today()).await.unwrap();
    assert_eq!(listed[0].entries[0].spray_count, u32::MAX);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn file_database_serializes_usage_on_one_bottle() {
    let (h, _dir) = file_harness().await;
    let id = owned_bottle(&h, UserId::new(), "Shared", 100.0).await;

    let mut tasks = Vec::new();
    for _ in 0..20 {
        let ledger = h.ledger.clone();
        tasks.push(tokio::spawn(async move {
            ledger
                .record_usage(NewUsage::sprays(id, today(), 10), today())
                .await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    // 20 x 1 ml from a 100 ml bottle.
    let level = h.ledger.get(id).await.unwrap().unwrap().current_level_percent;
    assert!((level - 80.0).abs() < 1e-9);
    assert_eq!(h.stats.list_usage(id, None, None).await.unwrap().len(), 20);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn file_database_accepts_concurrent_usage_on_different_bottles() {
    let (h, _dir) = file_harness().await;
    let owner = UserId::new();
    let mut ids = Vec::new();
    for n in 0..8 {
        ids.push(owned_bottle(&h, owner, &format!("Bottle {n}"), 100.0).await);
    }

    let mut tasks = Vec::new();
    for &id in &ids {
        for _ in 0..10 {
            let ledger = h.ledger.clone();
            tasks.push(tokio::spawn(async move {
                ledger
                    .record_usage(NewUsage::sprays(id, today(), 5), today())
                    .await
            }));
        }
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    for id in ids {
        let level = h.ledger.get(id).await.unwrap().unwrap().current_level_percent;
        assert!((level - 95.0).abs() < 1e-9);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn file_database_sweep_runs_alongside_writes() {
    let (h, _dir) = file_harness().await;
    let owner = UserId::new();
    let mut ids = Vec::new();
    for n in 0..6 {
        ids.push(owned_bottle(&h, owner, &format!("Swept {n}"), 100.0).await);
    }

    let sweeps = {
        let ledger = h.ledger.clone();
        tokio::spawn(async move {
            let cancel = AtomicBool::new(false);
            let mut reports = Vec::new();
            for _ in 0..5 {
                reports.push(ledger.run(today(), &cancel).await.unwrap());
            }
            reports
        })
    };

    let mut writes = Vec::new();
    for &id in &ids {
        let ledger = h.ledger.clone();
        writes.push(tokio::spawn(async move {
            for _ in 0..5 {
                ledger
                    .record_usage(NewUsage::sprays(id, today(), 2), today())
                    .await?;
            }
            ledger
                .edit(
                    id,
                    InventoryPatch {
                        low_threshold_percent: Some(30.0),
                        ..Default::default()
                    },
                    today(),
                )
                .await
        }));
    }

    for task in writes {
        task.await.unwrap().unwrap();
    }
    for report in sweeps.await.unwrap() {
        assert_eq!(report.processed, 6);
        assert_eq!(report.failed, 0);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_wear_for_one_day_merges_into_one_record() {
    let (h, _dir) = file_harness().await;
    let owner = UserId::new();
    let first = owned_bottle(&h, owner, "Morning", 100.0).await;
    let second = owned_bottle(&h, owner, "Evening", 100.0).await;

    let mut tasks = Vec::new();
    for id in [first, second] {
        let recorder = h.wear.clone();
        tasks.push(tokio::spawn(async move {
            recorder
                .record(
                    NewWear {
                        owner_user_id: owner,
                        date: today(),
                        note: None,
                        entries: vec![WearEntry {
                            fragrance_id: id,
                            spray_count: 3,
                        }],
                    },
                    today(),
                )
                .await
        }));
    }
    for task in tasks {
        assert!(task.await.unwrap().unwrap().warnings.is_empty());
    }

    let wear = h.wear.get(owner, today()).await.unwrap().unwrap();
    assert_eq!(wear.entries.len(), 2);
}
