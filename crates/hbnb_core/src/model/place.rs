//! Place listing record.
//!
//! # Invariants
//! - `host_id` references an existing user and is set from the authenticated
//!   caller on creation, never from request payloads.
//! - `amenity_ids` is kept sorted and free of duplicates once normalized.

use crate::model::kind::Kind;
use crate::model::user::UserId;
use crate::model::validation::{require_non_blank, require_range, ValidationError};
use serde::{Deserialize, Serialize};

pub type PlaceId = String;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub id: PlaceId,
    pub host_id: UserId,
    pub name: String,
    pub description: String,
    pub address: String,
    pub city_id: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub number_of_rooms: u32,
    pub number_of_bathrooms: u32,
    pub price_per_night: f64,
    pub max_guests: u32,
    pub amenity_ids: Vec<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Place {
    /// Creates an unsaved place owned by `host_id`.
    pub fn new(host_id: impl Into<UserId>, name: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            host_id: host_id.into(),
            name: name.into(),
            description: String::new(),
            address: String::new(),
            city_id: None,
            latitude: 0.0,
            longitude: 0.0,
            number_of_rooms: 0,
            number_of_bathrooms: 0,
            price_per_night: 0.0,
            max_guests: 0,
            amenity_ids: Vec::new(),
            created_at: 0,
            updated_at: 0,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_blank(Kind::Place, "host_id", &self.host_id)?;
        require_non_blank(Kind::Place, "name", &self.name)?;
        require_range("latitude", self.latitude, -90.0, 90.0)?;
        require_range("longitude", self.longitude, -180.0, 180.0)?;
        require_range("price_per_night", self.price_per_night, 0.0, f64::MAX)?;
        if let Some(city_id) = &self.city_id {
            require_non_blank(Kind::Place, "city_id", city_id)?;
        }
        Ok(())
    }

    /// Sorts and deduplicates amenity links so stored order is canonical.
    pub fn normalize(&mut self) {
        self.amenity_ids.sort();
        self.amenity_ids.dedup();
    }
}

#[cfg(test)]
mod tests {
    use super::Place;
    use crate::model::validation::ValidationError;

    #[test]
    fn rejects_out_of_range_coordinates() {
        let mut place = Place::new("u1", "Loft");
        place.latitude = 91.0;
        assert!(matches!(
            place.validate().unwrap_err(),
            ValidationError::OutOfRange {
                field: "latitude",
                ..
            }
        ));

        place.latitude = 45.0;
        place.longitude = f64::NAN;
        assert!(matches!(
            place.validate().unwrap_err(),
            ValidationError::OutOfRange {
                field: "longitude",
                ..
            }
        ));
    }

    #[test]
    fn rejects_negative_price() {
        let mut place = Place::new("u1", "Loft");
        place.price_per_night = -1.0;
        assert!(place.validate().is_err());
    }

    #[test]
    fn normalize_sorts_and_dedups_amenities() {
        let mut place = Place::new("u1", "Loft");
        place.amenity_ids = vec!["wifi".into(), "pool".into(), "wifi".into()];
        place.normalize();
        assert_eq!(place.amenity_ids, vec!["pool".to_string(), "wifi".to_string()]);
    }
}
