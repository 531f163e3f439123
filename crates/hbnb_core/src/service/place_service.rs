//! Place listings.
//!
//! # Invariants
//! - The host of a new place is always the caller; payloads cannot name one.
//! - Updates and deletes follow the owner-or-admin policy.

use crate::auth::identity::Identity;
use crate::model::entity::Entity;
use crate::model::kind::Kind;
use crate::model::place::Place;
use crate::model::user::User;
use crate::repo::{Repository, TypedRepository};
use crate::service::error::{ServiceError, ServiceResult};
use crate::service::{authorize_owner, fetch, log_use_case, require_caller};
use serde::{Deserialize, Deserializer};

/// Creation payload. Unknown fields, including any host id, are ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PlaceDraft {
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
}

/// Partial update; `None` keeps the stored value.
///
/// `city_id` distinguishes an absent key (keep) from `null` (detach):
/// `Some(None)` clears the city.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PlaceChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub address: Option<String>,
    #[serde(deserialize_with = "present")]
    pub city_id: Option<Option<String>>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub number_of_rooms: Option<u32>,
    pub number_of_bathrooms: Option<u32>,
    pub price_per_night: Option<f64>,
    pub max_guests: Option<u32>,
    pub amenity_ids: Option<Vec<String>>,
}

pub struct PlaceService<R: Repository> {
    repo: R,
}

impl<R: Repository> PlaceService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn list(&self) -> ServiceResult<Vec<Place>> {
        Ok(self.repo.find_all::<Place>()?)
    }

    pub fn get(&self, id: &str) -> ServiceResult<Place> {
        fetch::<Place, _>(&self.repo, id)
    }

    /// Places hosted by `host_id`; an unknown host is `NotFound`.
    pub fn list_by_host(&self, host_id: &str) -> ServiceResult<Vec<Place>> {
        fetch::<User, _>(&self.repo, host_id)?;
        let places = self.repo.find_all::<Place>()?;
        Ok(places
            .into_iter()
            .filter(|place| place.host_id == host_id)
            .collect())
    }

    pub fn create(&self, identity: &Identity, draft: PlaceDraft) -> ServiceResult<Place> {
        let result = require_caller(identity).and_then(|caller| {
            let mut place = Place::new(caller.id.as_str(), draft.name);
            place.description = draft.description;
            place.address = draft.address;
            place.city_id = draft.city_id;
            place.latitude = draft.latitude;
            place.longitude = draft.longitude;
            place.number_of_rooms = draft.number_of_rooms;
            place.number_of_bathrooms = draft.number_of_bathrooms;
            place.price_per_night = draft.price_per_night;
            place.max_guests = draft.max_guests;
            place.amenity_ids = draft.amenity_ids;
            self.repo.insert(place).map_err(ServiceError::from)
        });
        log_use_case(Kind::Place, "create", &result);
        result
    }

    pub fn update(
        &self,
        identity: &Identity,
        id: &str,
        changes: PlaceChanges,
    ) -> ServiceResult<Place> {
        let result = authorize_owner::<Place, _>(&self.repo, identity, id).and_then(|mut place| {
            apply_changes(&mut place, changes);
            self.repo.store(place).map_err(ServiceError::from)
        });
        log_use_case(Kind::Place, "update", &result);
        result
    }

    /// Deletes the place together with its reviews and amenity links.
    pub fn delete(&self, identity: &Identity, id: &str) -> ServiceResult<()> {
        let result = authorize_owner::<Place, _>(&self.repo, identity, id).and_then(|place| {
            self.repo
                .delete(&Entity::from(place))
                .map(|_| ())
                .map_err(ServiceError::from)
        });
        log_use_case(Kind::Place, "delete", &result);
        result
    }
}

/// Maps a present key, `null` included, to `Some`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

fn apply_changes(place: &mut Place, changes: PlaceChanges) {
    if let Some(name) = changes.name {
        place.name = name;
    }
    if let Some(description) = changes.description {
        place.description = description;
    }
    if let Some(address) = changes.address {
        place.address = address;
    }
    if let Some(city_id) = changes.city_id {
        place.city_id = city_id;
    }
    if let Some(latitude) = changes.latitude {
        place.latitude = latitude;
    }
    if let Some(longitude) = changes.longitude {
        place.longitude = longitude;
    }
    if let Some(rooms) = changes.number_of_rooms {
        place.number_of_rooms = rooms;
    }
    if let Some(bathrooms) = changes.number_of_bathrooms {
        place.number_of_bathrooms = bathrooms;
    }
    if let Some(price) = changes.price_per_night {
        place.price_per_night = price;
    }
    if let Some(max_guests) = changes.max_guests {
        place.max_guests = max_guests;
    }
    if let Some(amenity_ids) = changes.amenity_ids {
        place.amenity_ids = amenity_ids;
    }
}
