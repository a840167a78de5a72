use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use scentrack_core::{FragranceId, UserId};
use scentrack_inventory::{UsageEvent, UsageWindow};

use super::{decode_count, decode_id};

fn event_from_row(row: &SqliteRow) -> Result<UsageEvent, sqlx::Error> {
    Ok(UsageEvent {
        id: decode_id(row, "id")?,
        fragrance_id: decode_id(row, "fragrance_id")?,
        date: row.try_get("date")?,
        spray_count: decode_count(row, "spray_count")?,
        estimated_usage_ml: row.try_get("estimated_usage_ml")?,
        note: row.try_get("note")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Append one event. Events are never updated afterwards.
pub async fn insert(conn: &mut SqliteConnection, event: &UsageEvent) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO usage_events (
            id,
            fragrance_id,
            date,
            spray_count,
            estimated_usage_ml,
            note,
            created_at
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(event.id.to_string())
    .bind(event.fragrance_id.to_string())
    .bind(event.date)
    .bind(i64::from(event.spray_count))
    .bind(event.estimated_usage_ml)
    .bind(&event.note)
    .bind(event.created_at)
    .execute(conn)
    .await?;
    Ok(())
}

/// Events for one fragrance, optionally bounded (inclusive) on either side.
pub async fn list_for_fragrance(
    conn: &mut SqliteConnection,
    fragrance_id: FragranceId,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<Vec<UsageEvent>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT id, fragrance_id, date, spray_count, estimated_usage_ml, note, created_at
        FROM usage_events
        WHERE fragrance_id = ?1
          AND (?2 IS NULL OR date >= ?2)
          AND (?3 IS NULL OR date <= ?3)
        ORDER BY date, created_at
        "#,
    )
    .bind(fragrance_id.to_string())
    .bind(from)
    .bind(to)
    .fetch_all(conn)
    .await?;

    rows.iter().map(event_from_row).collect()
}

pub async fn list_in_window(
    conn: &mut SqliteConnection,
    fragrance_id: FragranceId,
    window: UsageWindow,
) -> Result<Vec<UsageEvent>, sqlx::Error> {
    list_for_fragrance(conn, fragrance_id, Some(window.start), Some(window.end)).await
}

/// Events in `window` for every fragrance `owner` has, any list.
pub async fn list_for_owner(
    conn: &mut SqliteConnection,
    owner: UserId,
    window: UsageWindow,
) -> Result<Vec<UsageEvent>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT e.id AS id,
               e.fragrance_id AS fragrance_id,
               e.date AS date,
               e.spray_count AS spray_count,
               e.estimated_usage_ml AS estimated_usage_ml,
               e.note AS note,
               e.created_at AS created_at
        FROM usage_events e
        JOIN fragrances f ON f.id = e.fragrance_id
        WHERE f.owner_user_id = ?1
          AND e.date >= ?2
          AND e.date <= ?3
        ORDER BY e.date, e.created_at
        "#,
    )
    .bind(owner.to_string())
    .bind(window.start)
    .bind(window.end)
    .fetch_all(conn)
    .await?;

    rows.iter().map(event_from_row).collect()
}
