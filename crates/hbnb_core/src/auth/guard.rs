//! Authorization decisions for mutating operations.
//!
//! # Invariants
//! - Absence is reported as `NotFound` before any ownership reasoning.
//! - `authorize_mutation` performs exactly one repository read.
//! - Decisions carry no reason; callers cannot learn which check failed.

use crate::auth::identity::{Caller, Claims};
use crate::model::entity::Entity;
use crate::model::kind::Kind;
use crate::repo::{RepoResult, Repository};
use log::debug;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Denied,
    NotFound,
}

impl Decision {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Allowed => "allowed",
            Self::Denied => "denied",
            Self::NotFound => "not_found",
        }
    }

    pub fn is_allowed(self) -> bool {
        self == Self::Allowed
    }
}

impl Display for Decision {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Allows the caller when it owns `resource`.
///
/// Kinds without an owner (countries, cities, amenities) are always denied.
pub fn check_owner(caller_id: &str, resource: Option<&Entity>) -> Decision {
    let Some(resource) = resource else {
        return Decision::NotFound;
    };
    match resource.owner_id() {
        Some(owner_id) if owner_id == caller_id => Decision::Allowed,
        _ => Decision::Denied,
    }
}

pub fn check_admin(claims: &Claims) -> Decision {
    if claims.is_admin {
        Decision::Allowed
    } else {
        Decision::Denied
    }
}

/// Owner-or-admin policy: allowed when either check passes.
pub fn owner_or_admin(caller: &Caller, resource: Option<&Entity>) -> Decision {
    match check_owner(&caller.id, resource) {
        Decision::Denied => check_admin(&caller.claims),
        decision => decision,
    }
}

/// Decision plus the snapshot it was computed from.
#[derive(Debug, Clone, PartialEq)]
pub struct Guarded {
    pub decision: Decision,
    pub resource: Option<Entity>,
}

impl Guarded {
    /// The resource, only when the decision allowed access.
    pub fn into_allowed(self) -> Option<Entity> {
        match self.decision {
            Decision::Allowed => self.resource,
            Decision::Denied | Decision::NotFound => None,
        }
    }
}

/// Loads `kind`/`id` once and applies the owner-or-admin policy to it.
pub fn authorize_mutation<R: Repository + ?Sized>(
    repo: &R,
    caller: &Caller,
    kind: Kind,
    id: &str,
) -> RepoResult<Guarded> {
    let resource = repo.get(kind, id)?;
    let decision = owner_or_admin(caller, resource.as_ref());
    debug!(
        "event=authz_decision module=auth kind={kind} decision={decision} admin={}",
        caller.is_admin()
    );
    Ok(Guarded { decision, resource })
}

#[cfg(test)]
mod tests {
    use super::{check_admin, check_owner, owner_or_admin, Decision};
    use crate::auth::identity::{Caller, Claims};
    use crate::model::amenity::Amenity;
    use crate::model::entity::Entity;
    use crate::model::place::Place;

    fn place_hosted_by(host: &str) -> Entity {
        Entity::from(Place::new(host, "Loft"))
    }

    #[test]
    fn check_owner_matches_host() {
        let place = place_hosted_by("u1");
        assert_eq!(check_owner("u1", Some(&place)), Decision::Allowed);
        assert_eq!(check_owner("u2", Some(&place)), Decision::Denied);
        assert_eq!(check_owner("u1", None), Decision::NotFound);
    }

    #[test]
    fn unowned_kinds_are_never_owned() {
        let amenity = Entity::from(Amenity::new("wifi"));
        assert_eq!(check_owner("", Some(&amenity)), Decision::Denied);
    }

    #[test]
    fn check_admin_reads_claim() {
        assert_eq!(check_admin(&Claims::admin()), Decision::Allowed);
        assert_eq!(check_admin(&Claims::default()), Decision::Denied);
    }

    #[test]
    fn composite_prefers_not_found_over_admin() {
        let admin = Caller::admin("root");
        assert_eq!(owner_or_admin(&admin, None), Decision::NotFound);

        let place = place_hosted_by("u1");
        assert_eq!(owner_or_admin(&admin, Some(&place)), Decision::Allowed);
        assert_eq!(
            owner_or_admin(&Caller::user("u2"), Some(&place)),
            Decision::Denied
        );
        assert_eq!(
            owner_or_admin(&Caller::user("u1"), Some(&place)),
            Decision::Allowed
        );
    }
}
