//! Resource kind tags.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Closed set of resource kinds a repository can store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    User,
    Place,
    Review,
    Country,
    City,
    Amenity,
}

const USER_LOOKUP_FIELDS: &[&str] = &["id", "email", "first_name", "last_name"];
const PLACE_LOOKUP_FIELDS: &[&str] = &["id", "host_id", "name", "address", "city_id"];
const REVIEW_LOOKUP_FIELDS: &[&str] = &["id", "place_id", "user_id"];
const COUNTRY_LOOKUP_FIELDS: &[&str] = &["code", "name"];
const CITY_LOOKUP_FIELDS: &[&str] = &["id", "name", "country_code"];
const AMENITY_LOOKUP_FIELDS: &[&str] = &["id", "name"];

impl Kind {
    /// Every kind, in dependency order (referenced kinds first).
    pub const ALL: [Kind; 6] = [
        Kind::User,
        Kind::Country,
        Kind::City,
        Kind::Amenity,
        Kind::Place,
        Kind::Review,
    ];

    /// Stable lowercase name used by callers and storage.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Place => "place",
            Self::Review => "review",
            Self::Country => "country",
            Self::City => "city",
            Self::Amenity => "amenity",
        }
    }

    /// Resolves a caller-supplied kind name.
    ///
    /// Input is trimmed and lowercased. Unknown names return `None`; there is
    /// no fallback resolution.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "user" => Some(Self::User),
            "place" => Some(Self::Place),
            "review" => Some(Self::Review),
            "country" => Some(Self::Country),
            "city" => Some(Self::City),
            "amenity" => Some(Self::Amenity),
            _ => None,
        }
    }

    /// Text fields that `get_by_field` accepts for this kind.
    ///
    /// Both backends share this list so lookups behave the same everywhere.
    pub fn lookup_fields(self) -> &'static [&'static str] {
        match self {
            Self::User => USER_LOOKUP_FIELDS,
            Self::Place => PLACE_LOOKUP_FIELDS,
            Self::Review => REVIEW_LOOKUP_FIELDS,
            Self::Country => COUNTRY_LOOKUP_FIELDS,
            Self::City => CITY_LOOKUP_FIELDS,
            Self::Amenity => AMENITY_LOOKUP_FIELDS,
        }
    }

    pub fn supports_lookup(self, field: &str) -> bool {
        self.lookup_fields().contains(&field)
    }
}

impl Display for Kind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
