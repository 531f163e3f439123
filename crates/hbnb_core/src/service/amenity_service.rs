//! Amenity catalogue. Amenities have no owner, so every write needs the
//! admin claim.

use crate::auth::identity::Identity;
use crate::model::amenity::Amenity;
use crate::model::entity::Entity;
use crate::model::kind::Kind;
use crate::repo::{Repository, TypedRepository};
use crate::service::error::{ServiceError, ServiceResult};
use crate::service::{authorize_admin, fetch, log_use_case, require_admin};
use serde::Deserialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AmenityDraft {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AmenityChanges {
    pub name: Option<String>,
}

pub struct AmenityService<R: Repository> {
    repo: R,
}

impl<R: Repository> AmenityService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn list(&self) -> ServiceResult<Vec<Amenity>> {
        Ok(self.repo.find_all::<Amenity>()?)
    }

    pub fn get(&self, id: &str) -> ServiceResult<Amenity> {
        fetch::<Amenity, _>(&self.repo, id)
    }

    pub fn create(&self, identity: &Identity, draft: AmenityDraft) -> ServiceResult<Amenity> {
        let result = require_admin(identity).and_then(|_| {
            self.repo
                .insert(Amenity::new(draft.name))
                .map_err(ServiceError::from)
        });
        log_use_case(Kind::Amenity, "create", &result);
        result
    }

    pub fn update(
        &self,
        identity: &Identity,
        id: &str,
        changes: AmenityChanges,
    ) -> ServiceResult<Amenity> {
        let result = authorize_admin::<Amenity, _>(&self.repo, identity, id).and_then(|mut amenity| {
            if let Some(name) = changes.name {
                amenity.name = name;
            }
            self.repo.store(amenity).map_err(ServiceError::from)
        });
        log_use_case(Kind::Amenity, "update", &result);
        result
    }

    /// Deletes the amenity and unlinks it from every place.
    pub fn delete(&self, identity: &Identity, id: &str) -> ServiceResult<()> {
        let result = authorize_admin::<Amenity, _>(&self.repo, identity, id).and_then(|amenity| {
            self.repo
                .delete(&Entity::from(amenity))
                .map(|_| ())
                .map_err(ServiceError::from)
        });
        log_use_case(Kind::Amenity, "delete", &result);
        result
    }
}
