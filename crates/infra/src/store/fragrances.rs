use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use scentrack_core::{DomainError, FragranceId, UserId};
use scentrack_inventory::{Fragrance, ListType};

use super::decode_id;

pub(crate) fn fragrance_from_row(row: &SqliteRow, prefix: &str) -> Result<Fragrance, sqlx::Error> {
    let col = |name: &str| format!("{prefix}{name}");
    let list_type: String = row.try_get(col("list_type").as_str())?;
    let list_type = list_type
        .parse::<ListType>()
        .map_err(|e: DomainError| sqlx::Error::ColumnDecode {
            index: col("list_type"),
            source: Box::new(e),
        })?;

    Ok(Fragrance {
        id: decode_id(row, &col("id"))?,
        owner_user_id: decode_id(row, &col("owner_user_id"))?,
        name: row.try_get(col("name").as_str())?,
        brand: row.try_get(col("brand").as_str())?,
        list_type,
        created_at: row.try_get(col("created_at").as_str())?,
    })
}

pub async fn insert(conn: &mut SqliteConnection, fragrance: &Fragrance) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO fragrances (id, owner_user_id, name, brand, list_type, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(fragrance.id.to_string())
    .bind(fragrance.owner_user_id.to_string())
    .bind(&fragrance.name)
    .bind(&fragrance.brand)
    .bind(fragrance.list_type.as_str())
    .bind(fragrance.created_at)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn find(conn: &mut SqliteConnection, id: FragranceId) -> Result<Option<Fragrance>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT id, owner_user_id, name, brand, list_type, created_at
        FROM fragrances
        WHERE id = ?1
        "#,
    )
    .bind(id.to_string())
    .fetch_optional(conn)
    .await?;

    row.map(|r| fragrance_from_row(&r, "")).transpose()
}

pub async fn list_by_owner(
    conn: &mut SqliteConnection,
    owner: UserId,
    list_type: Option<ListType>,
) -> Result<Vec<Fragrance>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT id, owner_user_id, name, brand, list_type, created_at
        FROM fragrances
        WHERE owner_user_id = ?1
          AND (?2 IS NULL OR list_type = ?2)
        ORDER BY name COLLATE NOCASE, created_at
        "#,
    )
    .bind(owner.to_string())
    .bind(list_type.map(|l| l.as_str()))
    .fetch_all(conn)
    .await?;

    rows.iter().map(|r| fragrance_from_row(r, "")).collect()
}

/// Delete a fragrance; inventory, usage and wear entries go with it.
pub async fn delete(conn: &mut SqliteConnection, id: FragranceId) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM fragrances WHERE id = ?1")
        .bind(id.to_string())
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}
