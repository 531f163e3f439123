//! Resource use-case services.
//!
//! # Responsibility
//! - Orchestrate the guard and repository calls for each resource.
//! - Keep transport layers decoupled from storage and policy details.
//!
//! # Invariants
//! - Every mutating method authorizes before its first write.
//! - A denied or absent target never reaches a repository write.
//! - The authorization read and the following write are separate repository
//!   calls. Updates write the whole record, so of two concurrent updates to one
//!   record the last writer wins, including fields it did not change.

pub mod amenity_service;
pub mod city_service;
pub mod country_service;
pub mod error;
pub mod place_service;
pub mod review_service;
pub mod user_service;

pub use amenity_service::{AmenityChanges, AmenityDraft, AmenityService};
pub use city_service::CityService;
pub use country_service::CountryService;
pub use error::{ServiceError, ServiceResult};
pub use place_service::{PlaceChanges, PlaceDraft, PlaceService};
pub use review_service::{ReviewChanges, ReviewDraft, ReviewService};
pub use user_service::{Credentials, UserChanges, UserDraft, UserService};

use crate::auth::guard::{authorize_mutation, check_admin, Decision};
use crate::auth::identity::{Caller, Identity};
use crate::model::entity::{Entity, Record};
use crate::model::kind::Kind;
use crate::repo::{RepoError, Repository, TypedRepository};
use log::debug;

pub(crate) fn require_caller(identity: &Identity) -> ServiceResult<&Caller> {
    identity.caller().ok_or(ServiceError::Unauthenticated)
}

/// Owner-or-admin gate: returns the target snapshot when allowed.
pub(crate) fn authorize_owner<T: Record, R: Repository + ?Sized>(
    repo: &R,
    identity: &Identity,
    id: &str,
) -> ServiceResult<T> {
    let caller = require_caller(identity)?;
    let guarded = authorize_mutation(repo, caller, T::KIND, id)?;
    match guarded.decision {
        Decision::NotFound => Err(ServiceError::not_found(T::KIND, id)),
        Decision::Denied => Err(ServiceError::Denied),
        Decision::Allowed => guarded
            .into_allowed()
            .map(expect_kind::<T>)
            .unwrap_or_else(|| Err(ServiceError::not_found(T::KIND, id))),
    }
}

/// Admin-only gate for records without an owner.
pub(crate) fn authorize_admin<T: Record, R: Repository + ?Sized>(
    repo: &R,
    identity: &Identity,
    id: &str,
) -> ServiceResult<T> {
    let caller = require_caller(identity)?;
    let Some(resource) = repo.get(T::KIND, id)? else {
        return Err(ServiceError::not_found(T::KIND, id));
    };
    let decision = check_admin(&caller.claims);
    debug!(
        "event=authz_decision module=service kind={} decision={decision} admin={}",
        T::KIND,
        caller.is_admin()
    );
    if !decision.is_allowed() {
        return Err(ServiceError::Denied);
    }
    expect_kind(resource)
}

/// Admin gate for operations that have no target yet.
pub(crate) fn require_admin(identity: &Identity) -> ServiceResult<&Caller> {
    let caller = require_caller(identity)?;
    if check_admin(&caller.claims).is_allowed() {
        Ok(caller)
    } else {
        Err(ServiceError::Denied)
    }
}

pub(crate) fn fetch<T: Record, R: Repository + ?Sized>(repo: &R, id: &str) -> ServiceResult<T> {
    repo.find::<T>(id)?
        .ok_or_else(|| ServiceError::not_found(T::KIND, id))
}

pub(crate) fn log_use_case(kind: Kind, op: &str, result: &ServiceResult<impl Sized>) {
    match result {
        Ok(_) => debug!("event=use_case module=service kind={kind} op={op} status=ok"),
        Err(err) => debug!(
            "event=use_case module=service kind={kind} op={op} status=error code={}",
            err.status_code()
        ),
    }
}

fn expect_kind<T: Record>(entity: Entity) -> ServiceResult<T> {
    let actual = entity.kind();
    T::from_entity(entity).ok_or_else(|| {
        ServiceError::StorageFault(RepoError::InvalidData(format!(
            "expected {} record, found {actual}",
            T::KIND
        )))
    })
}
