//! City record belonging to a country.

use crate::model::kind::Kind;
use crate::model::validation::{require_non_blank, ValidationError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct City {
    pub id: String,
    pub name: String,
    pub country_code: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl City {
    pub fn new(name: impl Into<String>, country_code: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            country_code: country_code.into(),
            created_at: 0,
            updated_at: 0,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_blank(Kind::City, "name", &self.name)?;
        require_non_blank(Kind::City, "country_code", &self.country_code)
    }
}
