use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use scentrack_core::{FragranceId, UserId};
use scentrack_inventory::{DaysRemaining, Fragrance, InventoryRecord};

use super::fragrances::fragrance_from_row;
use super::{decode_count, decode_id};

const RECORD_COLUMNS: &str = r#"
    r.id AS id,
    r.fragrance_id AS fragrance_id,
    r.bottle_size_ml AS bottle_size_ml,
    r.current_level_percent AS current_level_percent,
    r.usage_tracking_enabled AS usage_tracking_enabled,
    r.low_threshold_percent AS low_threshold_percent,
    r.estimated_days_remaining AS estimated_days_remaining,
    r.purchase_date AS purchase_date,
    r.created_at AS created_at,
    r.updated_at AS updated_at
"#;

fn record_from_row(row: &SqliteRow) -> Result<InventoryRecord, sqlx::Error> {
    let estimate: Option<i64> = row.try_get("estimated_days_remaining")?;
    let estimated_days_remaining = match estimate {
        Some(_) => DaysRemaining::Days(decode_count(row, "estimated_days_remaining")?),
        None => DaysRemaining::Unbounded,
    };

    Ok(InventoryRecord {
        id: decode_id(row, "id")?,
        fragrance_id: decode_id(row, "fragrance_id")?,
        bottle_size_ml: row.try_get("bottle_size_ml")?,
        current_level_percent: row.try_get("current_level_percent")?,
        usage_tracking_enabled: row.try_get("usage_tracking_enabled")?,
        low_threshold_percent: row.try_get("low_threshold_percent")?,
        estimated_days_remaining,
        purchase_date: row.try_get("purchase_date")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn estimate_column(estimate: DaysRemaining) -> Option<i64> {
    estimate.days().map(i64::from)
}

pub async fn insert(conn: &mut SqliteConnection, record: &InventoryRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO inventory_records (
            id,
            fragrance_id,
            bottle_size_ml,
            current_level_percent,
            usage_tracking_enabled,
            low_threshold_percent,
            estimated_days_remaining,
            purchase_date,
            created_at,
            updated_at
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(record.id.to_string())
    .bind(record.fragrance_id.to_string())
    .bind(record.bottle_size_ml)
    .bind(record.current_level_percent)
    .bind(record.usage_tracking_enabled)
    .bind(record.low_threshold_percent)
    .bind(estimate_column(record.estimated_days_remaining))
    .bind(record.purchase_date)
    .bind(record.created_at)
    .bind(record.updated_at)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn find(
    conn: &mut SqliteConnection,
    fragrance_id: FragranceId,
) -> Result<Option<InventoryRecord>, sqlx::Error> {
    let sql = format!("SELECT {RECORD_COLUMNS} FROM inventory_records r WHERE r.fragrance_id = ?1");
    let row = sqlx::query(&sql)
        .bind(fragrance_id.to_string())
        .fetch_optional(conn)
        .await?;

    row.map(|r| record_from_row(&r)).transpose()
}

/// Write every mutable field of an existing record in place.
pub async fn update(conn: &mut SqliteConnection, record: &InventoryRecord) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE inventory_records
        SET bottle_size_ml = ?2,
            current_level_percent = ?3,
            usage_tracking_enabled = ?4,
            low_threshold_percent = ?5,
            estimated_days_remaining = ?6,
            purchase_date = ?7,
            updated_at = ?8
        WHERE fragrance_id = ?1
        "#,
    )
    .bind(record.fragrance_id.to_string())
    .bind(record.bottle_size_ml)
    .bind(record.current_level_percent)
    .bind(record.usage_tracking_enabled)
    .bind(record.low_threshold_percent)
    .bind(estimate_column(record.estimated_days_remaining))
    .bind(record.purchase_date)
    .bind(record.updated_at)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn update_estimate(
    conn: &mut SqliteConnection,
    fragrance_id: FragranceId,
    estimate: DaysRemaining,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE inventory_records
        SET estimated_days_remaining = ?2
        WHERE fragrance_id = ?1
        "#,
    )
    .bind(fragrance_id.to_string())
    .bind(estimate_column(estimate))
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Fragrances with usage tracking on, across all owners.
pub async fn list_tracked(conn: &mut SqliteConnection) -> Result<Vec<FragranceId>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT fragrance_id
        FROM inventory_records
        WHERE usage_tracking_enabled = 1
        ORDER BY fragrance_id
        "#,
    )
    .fetch_all(conn)
    .await?;

    rows.iter().map(|r| decode_id(r, "fragrance_id")).collect()
}

/// Owned fragrances of `owner` whose level is at or below their threshold.
pub async fn list_low_stock(
    conn: &mut SqliteConnection,
    owner: UserId,
) -> Result<Vec<(Fragrance, InventoryRecord)>, sqlx::Error> {
    let sql = format!(
        r#"
        SELECT {RECORD_COLUMNS},
               f.id AS f_id,
               f.owner_user_id AS f_owner_user_id,
               f.name AS f_name,
               f.brand AS f_brand,
               f.list_type AS f_list_type,
               f.created_at AS f_created_at
        FROM inventory_records r
        JOIN fragrances f ON f.id = r.fragrance_id
        WHERE f.owner_user_id = ?1
          AND f.list_type = 'owned'
          AND r.current_level_percent <= r.low_threshold_percent
        ORDER BY r.current_level_percent ASC, f.name COLLATE NOCASE
        "#
    );
    let rows = sqlx::query(&sql)
        .bind(owner.to_string())
        .fetch_all(conn)
        .await?;

    rows.iter()
        .map(|r| Ok((fragrance_from_row(r, "f_")?, record_from_row(r)?)))
        .collect()
}
