//! Amenity record, linked to places many-to-many through `Place::amenity_ids`.

use crate::model::kind::Kind;
use crate::model::validation::{require_non_blank, ValidationError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amenity {
    pub id: String,
    pub name: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Amenity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            created_at: 0,
            updated_at: 0,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_blank(Kind::Amenity, "name", &self.name)
    }
}
