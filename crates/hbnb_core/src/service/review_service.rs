//! Reviews written by users about places.
//!
//! # Invariants
//! - The author of a new review is always the caller.
//! - A host cannot review a place they host.
//! - Reviews are moved between places only by deleting and re-creating them.

use crate::auth::identity::Identity;
use crate::model::entity::Entity;
use crate::model::kind::Kind;
use crate::model::place::Place;
use crate::model::review::Review;
use crate::model::user::User;
use crate::repo::{Repository, TypedRepository};
use crate::service::error::{ServiceError, ServiceResult};
use crate::service::{authorize_owner, fetch, log_use_case, require_caller};
use serde::Deserialize;

/// Creation payload. Unknown fields, including any author id, are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReviewDraft {
    pub rating: u8,
    pub comment: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReviewChanges {
    pub rating: Option<u8>,
    pub comment: Option<String>,
}

pub struct ReviewService<R: Repository> {
    repo: R,
}

impl<R: Repository> ReviewService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn list(&self) -> ServiceResult<Vec<Review>> {
        Ok(self.repo.find_all::<Review>()?)
    }

    pub fn get(&self, id: &str) -> ServiceResult<Review> {
        fetch::<Review, _>(&self.repo, id)
    }

    pub fn list_for_place(&self, place_id: &str) -> ServiceResult<Vec<Review>> {
        fetch::<Place, _>(&self.repo, place_id)?;
        self.reviews_where(|review| review.place_id == place_id)
    }

    pub fn list_by_user(&self, user_id: &str) -> ServiceResult<Vec<Review>> {
        fetch::<User, _>(&self.repo, user_id)?;
        self.reviews_where(|review| review.user_id == user_id)
    }

    pub fn create(
        &self,
        identity: &Identity,
        place_id: &str,
        draft: ReviewDraft,
    ) -> ServiceResult<Review> {
        let result = self.create_for_caller(identity, place_id, draft);
        log_use_case(Kind::Review, "create", &result);
        result
    }

    pub fn update(
        &self,
        identity: &Identity,
        id: &str,
        changes: ReviewChanges,
    ) -> ServiceResult<Review> {
        let result = authorize_owner::<Review, _>(&self.repo, identity, id).and_then(|mut review| {
            if let Some(rating) = changes.rating {
                review.rating = rating;
            }
            if let Some(comment) = changes.comment {
                review.comment = comment;
            }
            self.repo.store(review).map_err(ServiceError::from)
        });
        log_use_case(Kind::Review, "update", &result);
        result
    }

    pub fn delete(&self, identity: &Identity, id: &str) -> ServiceResult<()> {
        let result = authorize_owner::<Review, _>(&self.repo, identity, id).and_then(|review| {
            self.repo
                .delete(&Entity::from(review))
                .map(|_| ())
                .map_err(ServiceError::from)
        });
        log_use_case(Kind::Review, "delete", &result);
        result
    }

    fn create_for_caller(
        &self,
        identity: &Identity,
        place_id: &str,
        draft: ReviewDraft,
    ) -> ServiceResult<Review> {
        let caller = require_caller(identity)?;
        let place = fetch::<Place, _>(&self.repo, place_id)?;
        if place.host_id == caller.id {
            return Err(ServiceError::Invalid(
                "hosts cannot review their own place".to_string(),
            ));
        }
        let review = Review::new(place.id, caller.id.as_str(), draft.rating, draft.comment);
        Ok(self.repo.insert(review)?)
    }

    fn reviews_where(&self, keep: impl Fn(&Review) -> bool) -> ServiceResult<Vec<Review>> {
        let reviews = self.repo.find_all::<Review>()?;
        Ok(reviews.into_iter().filter(|review| keep(review)).collect())
    }
}
