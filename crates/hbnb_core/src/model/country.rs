//! Country record keyed by its ISO 3166-1 alpha-2 code.

use crate::model::kind::Kind;
use crate::model::validation::{require_non_blank, ValidationError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    /// Natural key, doubles as the record id.
    pub code: String,
    pub name: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Country {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            created_at: 0,
            updated_at: 0,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let well_formed =
            self.code.len() == 2 && self.code.bytes().all(|byte| byte.is_ascii_uppercase());
        if !well_formed {
            return Err(ValidationError::InvalidCountryCode(self.code.clone()));
        }
        require_non_blank(Kind::Country, "name", &self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::Country;

    #[test]
    fn code_must_be_two_uppercase_letters() {
        Country::new("UY", "Uruguay").validate().unwrap();
        for code in ["", "U", "uy", "URY", "U1"] {
            assert!(Country::new(code, "Uruguay").validate().is_err(), "{code}");
        }
    }
}
