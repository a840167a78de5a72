//! Service-layer error model.

use thiserror::Error;

use scentrack_core::DomainError;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Underlying storage failure.
    #[error("persistence error: {0}")]
    Persistence(#[from] sqlx::Error),
}

impl ServiceError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::Domain(DomainError::not_found(what))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Domain(e) if e.is_not_found())
    }
}

/// Map a unique-constraint violation to `AlreadyExists`; pass anything else through.
pub(crate) fn unique_as_exists(err: sqlx::Error, what: &str) -> ServiceError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            ServiceError::Domain(DomainError::already_exists(what.to_string()))
        }
        _ => ServiceError::Persistence(err),
    }
}
