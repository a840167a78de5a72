//! Fragrance catalog: owner of fragrance identity.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

use scentrack_core::{FragranceId, UserId};
use scentrack_inventory::{Fragrance, FragranceRef, ListType, NewFragrance};

use crate::error::{ServiceError, ServiceResult};
use crate::store;

#[derive(Debug, Clone)]
pub struct FragranceCatalog {
    pool: SqlitePool,
}

impl FragranceCatalog {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, input: NewFragrance) -> ServiceResult<Fragrance> {
        let fragrance = input.into_fragrance(Utc::now())?;
        let mut conn = self.pool.acquire().await?;
        store::fragrances::insert(&mut conn, &fragrance).await?;
        info!(fragrance_id = %fragrance.id, list_type = fragrance.list_type.as_str(), "fragrance added");
        Ok(fragrance)
    }

    pub async fn get(&self, id: FragranceId) -> ServiceResult<Option<Fragrance>> {
        let mut conn = self.pool.acquire().await?;
        Ok(store::fragrances::find(&mut conn, id).await?)
    }

    /// The fragrance, if it exists and belongs to `owner`.
    pub async fn get_owned_by(&self, owner: UserId, id: FragranceId) -> ServiceResult<Fragrance> {
        match self.get(id).await? {
            Some(f) if f.owner_user_id == owner => Ok(f),
            _ => Err(ServiceError::not_found("fragrance")),
        }
    }

    pub async fn lookup(&self, id: FragranceId) -> ServiceResult<Option<FragranceRef>> {
        Ok(self.get(id).await?.as_ref().map(FragranceRef::from))
    }

    pub async fn list(&self, owner: UserId, list_type: Option<ListType>) -> ServiceResult<Vec<Fragrance>> {
        let mut conn = self.pool.acquire().await?;
        Ok(store::fragrances::list_by_owner(&mut conn, owner, list_type).await?)
    }

    /// Remove a fragrance of `owner` together with its inventory, usage and
    /// wear entries.
    pub async fn delete(&self, owner: UserId, id: FragranceId) -> ServiceResult<()> {
        self.get_owned_by(owner, id).await?;
        let mut conn = self.pool.acquire().await?;
        if !store::fragrances::delete(&mut conn, id).await? {
            return Err(ServiceError::not_found("fragrance"));
        }
        info!(fragrance_id = %id, "fragrance deleted");
        Ok(())
    }
}
