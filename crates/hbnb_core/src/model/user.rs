//! User account record.
//!
//! # Invariants
//! - `email` is the unique, case-sensitive login key. Uniqueness is enforced
//!   by repositories, not here.
//! - `password_hash` holds a salted hash and is never exposed through
//!   `UserProfile`.

use crate::model::kind::Kind;
use crate::model::validation::{require_non_blank, ValidationError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

pub type UserId = String;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub is_admin: bool,
    /// Unix epoch milliseconds, set by the repository on save.
    pub created_at: i64,
    /// Unix epoch milliseconds, refreshed by the repository on every write.
    pub updated_at: i64,
}

/// Outward-facing user projection without credential material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_admin: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl User {
    /// Creates an unsaved, non-admin user. The repository assigns the id.
    pub fn new(
        email: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        Self {
            id: String::new(),
            email: email.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            password_hash: password_hash.into(),
            is_admin: false,
            created_at: 0,
            updated_at: 0,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !EMAIL_RE.is_match(self.email.as_str()) {
            return Err(ValidationError::InvalidEmail(self.email.clone()));
        }
        require_non_blank(Kind::User, "first_name", &self.first_name)?;
        require_non_blank(Kind::User, "last_name", &self.last_name)?;
        require_non_blank(Kind::User, "password_hash", &self.password_hash)?;
        Ok(())
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id.clone(),
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            is_admin: self.is_admin,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::User;
    use crate::model::validation::ValidationError;

    fn user(email: &str) -> User {
        User::new(email, "Ada", "Lovelace", "$2b$04$hash")
    }

    #[test]
    fn accepts_well_formed_user() {
        user("ada@example.com").validate().unwrap();
    }

    #[test]
    fn rejects_malformed_email() {
        for email in ["", "ada", "ada@", "ada @example.com", "@example.com"] {
            let err = user(email).validate().unwrap_err();
            assert!(matches!(err, ValidationError::InvalidEmail(_)), "{email}");
        }
    }

    #[test]
    fn rejects_blank_names() {
        let mut blank = user("ada@example.com");
        blank.last_name = "   ".to_string();
        let err = blank.validate().unwrap_err();
        assert!(matches!(
            err,
            ValidationError::BlankField {
                field: "last_name",
                ..
            }
        ));
    }

    #[test]
    fn profile_omits_password_hash() {
        let json = serde_json::to_string(&user("ada@example.com").profile()).unwrap();
        assert!(!json.contains("password"));
        assert!(json.contains("ada@example.com"));
    }
}
