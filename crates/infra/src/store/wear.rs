use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use scentrack_core::{UserId, WearRecordId};
use scentrack_inventory::{WearEntry, WearRecord};

use super::{decode_count, decode_id};

fn header_from_row(row: &SqliteRow) -> Result<WearRecord, sqlx::Error> {
    Ok(WearRecord {
        id: decode_id(row, "id")?,
        owner_user_id: decode_id(row, "owner_user_id")?,
        date: row.try_get("date")?,
        note: row.try_get("note")?,
        entries: Vec::new(),
        created_at: row.try_get("created_at")?,
    })
}

async fn load_entries(conn: &mut SqliteConnection, wear_id: WearRecordId) -> Result<Vec<WearEntry>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT fragrance_id, spray_count
        FROM wear_entries
        WHERE wear_id = ?1
        ORDER BY position
        "#,
    )
    .bind(wear_id.to_string())
    .fetch_all(conn)
    .await?;

    rows.iter()
        .map(|r| {
            Ok(WearEntry {
                fragrance_id: decode_id(r, "fragrance_id")?,
                spray_count: decode_count(r, "spray_count")?,
            })
        })
        .collect()
}

/// Record header only (no entries).
pub async fn find_header(
    conn: &mut SqliteConnection,
    owner: UserId,
    date: NaiveDate,
) -> Result<Option<WearRecord>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT id, owner_user_id, date, note, created_at
        FROM wear_records
        WHERE owner_user_id = ?1 AND date = ?2
        "#,
    )
    .bind(owner.to_string())
    .bind(date)
    .fetch_optional(conn)
    .await?;

    row.map(|r| header_from_row(&r)).transpose()
}

pub async fn find_by_date(
    conn: &mut SqliteConnection,
    owner: UserId,
    date: NaiveDate,
) -> Result<Option<WearRecord>, sqlx::Error> {
    let Some(mut record) = find_header(&mut *conn, owner, date).await? else {
        return Ok(None);
    };
    record.entries = load_entries(conn, record.id).await?;
    Ok(Some(record))
}

pub async fn list_range(
    conn: &mut SqliteConnection,
    owner: UserId,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<WearRecord>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT id, owner_user_id, date, note, created_at
        FROM wear_records
        WHERE owner_user_id = ?1 AND date >= ?2 AND date <= ?3
        ORDER BY date
        "#,
    )
    .bind(owner.to_string())
    .bind(from)
    .bind(to)
    .fetch_all(&mut *conn)
    .await?;

    let mut records = rows.iter().map(header_from_row).collect::<Result<Vec<_>, _>>()?;
    for record in &mut records {
        record.entries = load_entries(&mut *conn, record.id).await?;
    }
    Ok(records)
}

pub async fn insert_header(conn: &mut SqliteConnection, record: &WearRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO wear_records (id, owner_user_id, date, note, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(record.id.to_string())
    .bind(record.owner_user_id.to_string())
    .bind(record.date)
    .bind(&record.note)
    .bind(record.created_at)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn update_note(
    conn: &mut SqliteConnection,
    wear_id: WearRecordId,
    note: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE wear_records SET note = ?2 WHERE id = ?1")
        .bind(wear_id.to_string())
        .bind(note)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn count_entries(conn: &mut SqliteConnection, wear_id: WearRecordId) -> Result<i64, sqlx::Error> {
    let row = sqlx::query("SELECT COUNT(*) AS n FROM wear_entries WHERE wear_id = ?1")
        .bind(wear_id.to_string())
        .fetch_one(conn)
        .await?;
    row.try_get("n")
}

/// Add an entry; wearing the same fragrance again that day adds to its sprays,
/// saturating at `u32::MAX`.
pub async fn upsert_entry(
    conn: &mut SqliteConnection,
    wear_id: WearRecordId,
    entry: &WearEntry,
    position: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO wear_entries (wear_id, fragrance_id, spray_count, position)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT (wear_id, fragrance_id)
        DO UPDATE SET spray_count = MIN(wear_entries.spray_count + excluded.spray_count, 4294967295)
        "#,
    )
    .bind(wear_id.to_string())
    .bind(entry.fragrance_id.to_string())
    .bind(i64::from(entry.spray_count))
    .bind(position)
    .execute(conn)
    .await?;
    Ok(())
}
