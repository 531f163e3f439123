//! Closed union over every stored record.
//!
//! # Responsibility
//! - Give repositories one value type to store, regardless of kind.
//! - Expose per-kind identity, ownership, references and lookup fields
//!   through static dispatch.
//!
//! # Invariants
//! - `Entity::kind()` always matches the wrapped record type.
//! - Country ids are their natural code; every other kind gets a UUID v4
//!   string when saved without an id.

use crate::model::amenity::Amenity;
use crate::model::city::City;
use crate::model::country::Country;
use crate::model::kind::Kind;
use crate::model::place::Place;
use crate::model::review::Review;
use crate::model::user::User;
use crate::model::validation::ValidationError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Entity {
    User(User),
    Place(Place),
    Review(Review),
    Country(Country),
    City(City),
    Amenity(Amenity),
}

/// Typed view over one `Entity` variant.
pub trait Record: Sized + Into<Entity> {
    const KIND: Kind;

    /// Unwraps the matching variant, or returns `None` for any other kind.
    fn from_entity(entity: Entity) -> Option<Self>;
}

macro_rules! impl_record {
    ($record:ident) => {
        impl From<$record> for Entity {
            fn from(value: $record) -> Self {
                Entity::$record(value)
            }
        }

        impl Record for $record {
            const KIND: Kind = Kind::$record;

            fn from_entity(entity: Entity) -> Option<Self> {
                match entity {
                    Entity::$record(value) => Some(value),
                    _ => None,
                }
            }
        }
    };
}

impl_record!(User);
impl_record!(Place);
impl_record!(Review);
impl_record!(Country);
impl_record!(City);
impl_record!(Amenity);

impl Entity {
    pub fn kind(&self) -> Kind {
        match self {
            Self::User(_) => Kind::User,
            Self::Place(_) => Kind::Place,
            Self::Review(_) => Kind::Review,
            Self::Country(_) => Kind::Country,
            Self::City(_) => Kind::City,
            Self::Amenity(_) => Kind::Amenity,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::User(value) => &value.id,
            Self::Place(value) => &value.id,
            Self::Review(value) => &value.id,
            Self::Country(value) => &value.code,
            Self::City(value) => &value.id,
            Self::Amenity(value) => &value.id,
        }
    }

    pub fn created_at(&self) -> i64 {
        self.timestamps().0
    }

    pub fn updated_at(&self) -> i64 {
        self.timestamps().1
    }

    /// Id of the user who owns this record, if the kind has an owner.
    ///
    /// A user owns itself, a place is owned by its host and a review by its
    /// author. Countries, cities and amenities have no owner.
    pub fn owner_id(&self) -> Option<&str> {
        match self {
            Self::User(value) => Some(&value.id),
            Self::Place(value) => Some(&value.host_id),
            Self::Review(value) => Some(&value.user_id),
            Self::Country(_) | Self::City(_) | Self::Amenity(_) => None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::User(value) => value.validate(),
            Self::Place(value) => value.validate(),
            Self::Review(value) => value.validate(),
            Self::Country(value) => value.validate(),
            Self::City(value) => value.validate(),
            Self::Amenity(value) => value.validate(),
        }
    }

    /// Records this entity points at; each must exist before it is written.
    pub fn references(&self) -> Vec<(Kind, &str)> {
        match self {
            Self::Place(place) => {
                let mut refs = vec![(Kind::User, place.host_id.as_str())];
                if let Some(city_id) = &place.city_id {
                    refs.push((Kind::City, city_id.as_str()));
                }
                refs.extend(
                    place
                        .amenity_ids
                        .iter()
                        .map(|amenity_id| (Kind::Amenity, amenity_id.as_str())),
                );
                refs
            }
            Self::Review(review) => vec![
                (Kind::Place, review.place_id.as_str()),
                (Kind::User, review.user_id.as_str()),
            ],
            Self::City(city) => vec![(Kind::Country, city.country_code.as_str())],
            Self::User(_) | Self::Country(_) | Self::Amenity(_) => Vec::new(),
        }
    }

    /// Value of a lookup field listed in `Kind::lookup_fields`.
    ///
    /// Returns `None` for unsupported fields and for unset optional fields.
    pub fn lookup_value(&self, field: &str) -> Option<&str> {
        if !self.kind().supports_lookup(field) {
            return None;
        }
        match (self, field) {
            (Self::User(user), "id") => Some(&user.id),
            (Self::User(user), "email") => Some(&user.email),
            (Self::User(user), "first_name") => Some(&user.first_name),
            (Self::User(user), "last_name") => Some(&user.last_name),
            (Self::Place(place), "id") => Some(&place.id),
            (Self::Place(place), "host_id") => Some(&place.host_id),
            (Self::Place(place), "name") => Some(&place.name),
            (Self::Place(place), "address") => Some(&place.address),
            (Self::Place(place), "city_id") => place.city_id.as_deref(),
            (Self::Review(review), "id") => Some(&review.id),
            (Self::Review(review), "place_id") => Some(&review.place_id),
            (Self::Review(review), "user_id") => Some(&review.user_id),
            (Self::Country(country), "code") => Some(&country.code),
            (Self::Country(country), "name") => Some(&country.name),
            (Self::City(city), "id") => Some(&city.id),
            (Self::City(city), "name") => Some(&city.name),
            (Self::City(city), "country_code") => Some(&city.country_code),
            (Self::Amenity(amenity), "id") => Some(&amenity.id),
            (Self::Amenity(amenity), "name") => Some(&amenity.name),
            _ => None,
        }
    }

    /// Assigns identity, canonical form and both timestamps for a new row.
    pub(crate) fn prepare_insert(&mut self, now: i64) {
        if self.id().is_empty() {
            self.assign_id(Uuid::new_v4().to_string());
        }
        self.normalize();
        self.set_timestamps(now, now);
    }

    /// Keeps the stored creation time and refreshes `updated_at`.
    pub(crate) fn prepare_update(&mut self, stored_created_at: i64, now: i64) {
        self.normalize();
        self.set_timestamps(stored_created_at, now.max(stored_created_at));
    }

    fn normalize(&mut self) {
        if let Self::Place(place) = self {
            place.normalize();
        }
    }

    fn assign_id(&mut self, id: String) {
        match self {
            Self::User(value) => value.id = id,
            Self::Place(value) => value.id = id,
            Self::Review(value) => value.id = id,
            // Natural key: a blank code is rejected by validation instead.
            Self::Country(_) => {}
            Self::City(value) => value.id = id,
            Self::Amenity(value) => value.id = id,
        }
    }

    fn timestamps(&self) -> (i64, i64) {
        match self {
            Self::User(value) => (value.created_at, value.updated_at),
            Self::Place(value) => (value.created_at, value.updated_at),
            Self::Review(value) => (value.created_at, value.updated_at),
            Self::Country(value) => (value.created_at, value.updated_at),
            Self::City(value) => (value.created_at, value.updated_at),
            Self::Amenity(value) => (value.created_at, value.updated_at),
        }
    }

    fn set_timestamps(&mut self, created_at: i64, updated_at: i64) {
        let (created, updated) = match self {
            Self::User(value) => (&mut value.created_at, &mut value.updated_at),
            Self::Place(value) => (&mut value.created_at, &mut value.updated_at),
            Self::Review(value) => (&mut value.created_at, &mut value.updated_at),
            Self::Country(value) => (&mut value.created_at, &mut value.updated_at),
            Self::City(value) => (&mut value.created_at, &mut value.updated_at),
            Self::Amenity(value) => (&mut value.created_at, &mut value.updated_at),
        };
        *created = created_at;
        *updated = updated_at;
    }
}

#[cfg(test)]
mod tests {
    use super::{Entity, Record};
    use crate::model::country::Country;
    use crate::model::kind::Kind;
    use crate::model::place::Place;
    use crate::model::review::Review;
    use crate::model::user::User;

    #[test]
    fn prepare_insert_assigns_uuid_and_timestamps() {
        let mut entity = Entity::from(User::new("a@b.io", "A", "B", "hash"));
        entity.prepare_insert(1_000);

        assert!(uuid::Uuid::parse_str(entity.id()).is_ok());
        assert_eq!(entity.created_at(), 1_000);
        assert_eq!(entity.updated_at(), 1_000);
    }

    #[test]
    fn prepare_insert_keeps_caller_provided_id() {
        let mut user = User::new("a@b.io", "A", "B", "hash");
        user.id = "u1".to_string();
        let mut entity = Entity::from(user);
        entity.prepare_insert(5);
        assert_eq!(entity.id(), "u1");
    }

    #[test]
    fn country_id_is_its_code() {
        let mut entity = Entity::from(Country::new("", "Nowhere"));
        entity.prepare_insert(1);
        assert_eq!(entity.id(), "");
        assert!(entity.validate().is_err());

        let entity = Entity::from(Country::new("FR", "France"));
        assert_eq!(entity.id(), "FR");
        assert_eq!(entity.kind(), Kind::Country);
    }

    #[test]
    fn prepare_update_never_moves_updated_at_before_created_at() {
        let mut entity = Entity::from(Place::new("u1", "Loft"));
        entity.prepare_update(2_000, 1_500);
        assert_eq!(entity.created_at(), 2_000);
        assert_eq!(entity.updated_at(), 2_000);
    }

    #[test]
    fn owner_ids_follow_kind() {
        let mut user = User::new("a@b.io", "A", "B", "hash");
        user.id = "u1".to_string();
        assert_eq!(Entity::from(user).owner_id(), Some("u1"));
        assert_eq!(Entity::from(Place::new("u2", "Loft")).owner_id(), Some("u2"));
        assert_eq!(
            Entity::from(Review::new("p1", "u3", 4, "nice")).owner_id(),
            Some("u3")
        );
        assert_eq!(Entity::from(Country::new("FR", "France")).owner_id(), None);
    }

    #[test]
    fn place_references_host_city_and_amenities() {
        let mut place = Place::new("u1", "Loft");
        place.city_id = Some("c1".to_string());
        place.amenity_ids = vec!["a1".to_string()];
        let entity = Entity::from(place);
        assert_eq!(
            entity.references(),
            vec![(Kind::User, "u1"), (Kind::City, "c1"), (Kind::Amenity, "a1")]
        );
    }

    #[test]
    fn lookup_value_ignores_unlisted_fields() {
        let entity = Entity::from(User::new("a@b.io", "A", "B", "secret-hash"));
        assert_eq!(entity.lookup_value("email"), Some("a@b.io"));
        assert_eq!(entity.lookup_value("password_hash"), None);
        assert_eq!(entity.lookup_value("nope"), None);
    }

    #[test]
    fn from_entity_rejects_other_variants() {
        let entity = Entity::from(Place::new("u1", "Loft"));
        assert!(User::from_entity(entity.clone()).is_none());
        assert!(Place::from_entity(entity).is_some());
    }

    #[test]
    fn serializes_with_kind_tag() {
        let json = serde_json::to_value(Entity::from(Country::new("FR", "France"))).unwrap();
        assert_eq!(json["kind"], "country");
        assert_eq!(json["code"], "FR");
    }
}
