//! SQLite row mapping and queries.
//!
//! Functions take `&mut SqliteConnection` so callers can run them on a pooled
//! connection or inside a transaction.

pub mod fragrances;
pub mod inventory;
pub mod usage;
pub mod wear;

use std::str::FromStr;

use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use scentrack_core::DomainError;

/// Decode a TEXT column holding one of the typed identifiers.
pub(crate) fn decode_id<T>(row: &SqliteRow, column: &str) -> Result<T, sqlx::Error>
where
    T: FromStr<Err = DomainError>,
{
    let raw: String = row.try_get(column)?;
    raw.parse().map_err(|e: DomainError| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

/// Decode a non-negative INTEGER column into `u32`.
pub(crate) fn decode_count(row: &SqliteRow, column: &str) -> Result<u32, sqlx::Error> {
    let raw: i64 = row.try_get(column)?;
    u32::try_from(raw).map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}
