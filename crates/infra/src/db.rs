//! SQLite connection pool and schema.

use std::str::FromStr;
use std::time::Duration;

use sqlx::{Sqlite, SqlitePool, Transaction};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use tracing::info;

/// Idempotent schema, applied in order at start-up.
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS fragrances (
        id             TEXT PRIMARY KEY,
        owner_user_id  TEXT NOT NULL,
        name           TEXT NOT NULL,
        brand          TEXT NULL,
        list_type      TEXT NOT NULL CHECK (list_type IN ('owned', 'wishlist', 'tried')),
        created_at     TEXT NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_fragrances_owner
        ON fragrances (owner_user_id, list_type)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS inventory_records (
        id                        TEXT PRIMARY KEY,
        fragrance_id              TEXT NOT NULL UNIQUE
                                  REFERENCES fragrances (id) ON DELETE CASCADE,
        bottle_size_ml            REAL NOT NULL CHECK (bottle_size_ml > 0),
        current_level_percent     REAL NOT NULL
                                  CHECK (current_level_percent >= 0 AND current_level_percent <= 100),
        usage_tracking_enabled    INTEGER NOT NULL,
        low_threshold_percent     REAL NOT NULL
                                  CHECK (low_threshold_percent >= 0 AND low_threshold_percent <= 100),
        estimated_days_remaining  INTEGER NULL,
        purchase_date             TEXT NULL,
        created_at                TEXT NOT NULL,
        updated_at                TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS usage_events (
        id                  TEXT PRIMARY KEY,
        fragrance_id        TEXT NOT NULL REFERENCES fragrances (id) ON DELETE CASCADE,
        date                TEXT NOT NULL,
        spray_count         INTEGER NOT NULL CHECK (spray_count > 0),
        estimated_usage_ml  REAL NULL,
        note                TEXT NULL,
        created_at          TEXT NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_usage_events_fragrance_date
        ON usage_events (fragrance_id, date)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS wear_records (
        id             TEXT PRIMARY KEY,
        owner_user_id  TEXT NOT NULL,
        date           TEXT NOT NULL,
        note           TEXT NULL,
        created_at     TEXT NOT NULL,
        UNIQUE (owner_user_id, date)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS wear_entries (
        wear_id       TEXT NOT NULL REFERENCES wear_records (id) ON DELETE CASCADE,
        fragrance_id  TEXT NOT NULL REFERENCES fragrances (id) ON DELETE CASCADE,
        spray_count   INTEGER NOT NULL CHECK (spray_count >= 0),
        position      INTEGER NOT NULL,
        PRIMARY KEY (wear_id, fragrance_id)
    )
    "#,
];

/// Open the pool and apply the schema.
///
/// In-memory databases live as long as their connection, so they get a single
/// connection that is never recycled.
pub async fn connect(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let in_memory = database_url.contains(":memory:") || database_url.contains("mode=memory");

    let mut options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));
    if !in_memory {
        options = options.journal_mode(SqliteJournalMode::Wal);
    }

    let pool_options = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(8)
    };

    let pool = pool_options.connect_with(options).await?;
    migrate(&pool).await?;

    info!(in_memory, "database ready");
    Ok(pool)
}

/// Start a transaction that takes the database write lock up front.
///
/// A deferred transaction that reads before writing cannot wait for the lock
/// when another connection wrote in the meantime; SQLite fails it with
/// `SQLITE_BUSY` at once. `BEGIN IMMEDIATE` waits under the busy timeout.
pub async fn begin_write(pool: &SqlitePool) -> Result<Transaction<'static, Sqlite>, sqlx::Error> {
    pool.begin_with("BEGIN IMMEDIATE").await
}

pub async fn migrate(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}
