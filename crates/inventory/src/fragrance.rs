use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use scentrack_core::{DomainError, DomainResult, FragranceId, UserId};

const MAX_NAME_LEN: usize = 200;

/// Which list of the collection a fragrance sits on.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListType {
    Owned,
    Wishlist,
    Tried,
}

impl ListType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListType::Owned => "owned",
            ListType::Wishlist => "wishlist",
            ListType::Tried => "tried",
        }
    }
}

impl FromStr for ListType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "owned" => Ok(ListType::Owned),
            "wishlist" => Ok(ListType::Wishlist),
            "tried" => Ok(ListType::Tried),
            _ => Err(DomainError::validation(
                "list_type must be one of: owned, wishlist, tried",
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragrance {
    pub id: FragranceId,
    pub owner_user_id: UserId,
    pub name: String,
    pub brand: Option<String>,
    pub list_type: ListType,
    pub created_at: DateTime<Utc>,
}

/// Ownership facts the ledger needs about a fragrance.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FragranceRef {
    pub id: FragranceId,
    pub owner_user_id: UserId,
    pub list_type: ListType,
}

impl From<&Fragrance> for FragranceRef {
    fn from(f: &Fragrance) -> Self {
        Self {
            id: f.id,
            owner_user_id: f.owner_user_id,
            list_type: f.list_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFragrance {
    pub owner_user_id: UserId,
    pub name: String,
    pub brand: Option<String>,
    pub list_type: ListType,
}

impl NewFragrance {
    pub fn into_fragrance(self, now: DateTime<Utc>) -> DomainResult<Fragrance> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(DomainError::validation(format!(
                "name must be at most {MAX_NAME_LEN} characters"
            )));
        }
        let brand = self
            .brand
            .map(|b| b.trim().to_string())
            .filter(|b| !b.is_empty());

        Ok(Fragrance {
            id: FragranceId::new(),
            owner_user_id: self.owner_user_id,
            name,
            brand,
            list_type: self.list_type,
            created_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_type_parses_case_insensitively() {
        assert_eq!("Owned".parse::<ListType>().unwrap(), ListType::Owned);
        assert_eq!("wishlist".parse::<ListType>().unwrap(), ListType::Wishlist);
        assert!("sample".parse::<ListType>().is_err());
    }

    #[test]
    fn blank_name_is_rejected_and_brand_is_trimmed() {
        let blank = NewFragrance {
            owner_user_id: UserId::new(),
            name: "   ".into(),
            brand: None,
            list_type: ListType::Owned,
        };
        assert!(blank.into_fragrance(Utc::now()).is_err());

        let ok = NewFragrance {
            owner_user_id: UserId::new(),
            name: " Aventus ".into(),
            brand: Some("  ".into()),
            list_type: ListType::Owned,
        }
        .into_fragrance(Utc::now())
        .unwrap();
        assert_eq!(ok.name, "Aventus");
        assert_eq!(ok.brand, None);
    }
}
