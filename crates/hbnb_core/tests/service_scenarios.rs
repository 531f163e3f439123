use hbnb_core::auth::CredentialError;
use hbnb_core::model::city::City;
use hbnb_core::model::country::Country;
use hbnb_core::service::{
    AmenityChanges, AmenityDraft, Credentials, PlaceChanges, PlaceDraft, ReviewChanges,
    ReviewDraft, UserChanges, UserDraft,
};
use hbnb_core::{
    AmenityService, BcryptHasher, Caller, CityService, CountryService, Identity, JwtTokens,
    Kind, MemoryRepository, PasswordHasher, PlaceService, Repository, ReviewService,
    ServiceError, SqliteRepository, TypedRepository, UserProfile, UserService,
};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const SECRET: &str = "scenario-secret";

struct App {
    repo: Arc<dyn Repository>,
    users: UserService<Arc<dyn Repository>>,
    places: PlaceService<Arc<dyn Repository>>,
    reviews: ReviewService<Arc<dyn Repository>>,
    amenities: AmenityService<Arc<dyn Repository>>,
}

impl App {
    fn new(repo: Arc<dyn Repository>) -> Self {
        let tokens = JwtTokens::new(SECRET, 300).unwrap();
        Self {
            users: UserService::new(
                repo.clone(),
                Arc::new(BcryptHasher::new(4)),
                Arc::new(tokens),
            ),
            places: PlaceService::new(repo.clone()),
            reviews: ReviewService::new(repo.clone()),
            amenities: AmenityService::new(repo.clone()),
            repo,
        }
    }

    fn memory() -> Self {
        Self::new(Arc::new(MemoryRepository::new()))
    }

    fn sqlite() -> Self {
        Self::new(Arc::new(SqliteRepository::open_in_memory().unwrap()))
    }

    fn signup(&self, email: &str) -> UserProfile {
        self.users
            .signup(UserDraft {
                email: email.to_string(),
                first_name: "Test".to_string(),
                last_name: "User".to_string(),
                password: "correct horse".to_string(),
            })
            .unwrap()
    }

    fn admin(&self) -> UserProfile {
        self.users
            .create_admin(UserDraft {
                email: "root@example.com".to_string(),
                first_name: "Root".to_string(),
                last_name: "Admin".to_string(),
                password: "admin pass".to_string(),
            })
            .unwrap()
    }
}

fn as_user(profile: &UserProfile) -> Identity {
    Identity::from(Caller::user(profile.id.as_str()))
}

fn as_admin(profile: &UserProfile) -> Identity {
    Identity::from(Caller::admin(profile.id.as_str()))
}

fn loft() -> PlaceDraft {
    PlaceDraft {
        name: "Loft".to_string(),
        price_per_night: 80.0,
        max_guests: 2,
        ..PlaceDraft::default()
    }
}

#[test]
fn spoofed_host_id_is_ignored_on_create() {
    let app = App::memory();
    let attacker = app.signup("attacker@example.com");
    let victim = app.signup("victim@example.com");

    let draft: PlaceDraft =
        serde_json::from_value(json!({ "name": "Loft", "host_id": victim.id })).unwrap();
    let place = app.places.create(&as_user(&attacker), draft).unwrap();

    assert_eq!(place.host_id, attacker.id);
    assert!(app.places.list_by_host(&victim.id).unwrap().is_empty());
}

#[test]
fn anonymous_create_is_unauthenticated() {
    let app = App::memory();
    let err = app.places.create(&Identity::Anonymous, loft()).unwrap_err();
    assert!(matches!(err, ServiceError::Unauthenticated));
    assert!(app.repo.get_all(Kind::Place).unwrap().is_empty());
}

#[test]
fn non_owner_update_is_denied_without_write() {
    for app in [App::memory(), App::sqlite()] {
        let host = app.signup("host@example.com");
        let other = app.signup("other@example.com");
        let place = app.places.create(&as_user(&host), loft()).unwrap();

        let changes = PlaceChanges {
            name: Some("Hijacked".to_string()),
            ..PlaceChanges::default()
        };
        let err = app
            .places
            .update(&as_user(&other), &place.id, changes)
            .unwrap_err();

        assert!(matches!(err, ServiceError::Denied));
        assert_eq!(err.status_code(), 403);
        assert_eq!(app.places.get(&place.id).unwrap(), place);
    }
}

#[test]
fn owner_update_applies_changes() {
    let app = App::memory();
    let host = app.signup("host@example.com");
    let place = app.places.create(&as_user(&host), loft()).unwrap();

    let changes = PlaceChanges {
        price_per_night: Some(95.5),
        ..PlaceChanges::default()
    };
    let updated = app.places.update(&as_user(&host), &place.id, changes).unwrap();
    assert_eq!(updated.price_per_night, 95.5);
    assert_eq!(updated.name, "Loft");
    assert_eq!(updated.created_at, place.created_at);
}

#[test]
fn place_city_can_be_set_and_cleared() {
    for app in [App::memory(), App::sqlite()] {
        let host = app.signup("host@example.com");
        app.repo.insert(Country::new("FR", "France")).unwrap();
        let paris = app.repo.insert(City::new("Paris", "FR")).unwrap();
        let place = app.places.create(&as_user(&host), loft()).unwrap();

        let set: PlaceChanges = serde_json::from_value(json!({ "city_id": paris.id })).unwrap();
        let updated = app.places.update(&as_user(&host), &place.id, set).unwrap();
        assert_eq!(updated.city_id.as_deref(), Some(paris.id.as_str()));

        let untouched: PlaceChanges = serde_json::from_value(json!({ "name": "Attic" })).unwrap();
        let updated = app
            .places
            .update(&as_user(&host), &place.id, untouched)
            .unwrap();
        assert_eq!(updated.city_id.as_deref(), Some(paris.id.as_str()));

        let cleared: PlaceChanges = serde_json::from_value(json!({ "city_id": null })).unwrap();
        let updated = app.places.update(&as_user(&host), &place.id, cleared).unwrap();
        assert_eq!(updated.city_id, None);
        assert_eq!(app.places.get(&place.id).unwrap().city_id, None);
    }
}

#[test]
fn invalid_update_is_rejected() {
    let app = App::memory();
    let host = app.signup("host@example.com");
    let place = app.places.create(&as_user(&host), loft()).unwrap();

    let changes = PlaceChanges {
        latitude: Some(120.0),
        ..PlaceChanges::default()
    };
    let err = app
        .places
        .update(&as_user(&host), &place.id, changes)
        .unwrap_err();
    assert!(matches!(err, ServiceError::Invalid(_)));
    assert_eq!(app.places.get(&place.id).unwrap(), place);
}

#[test]
fn admin_delete_of_foreign_place_succeeds() {
    for app in [App::memory(), App::sqlite()] {
        let host = app.signup("host@example.com");
        let admin = app.admin();
        let place = app.places.create(&as_user(&host), loft()).unwrap();

        app.places.delete(&as_admin(&admin), &place.id).unwrap();

        let err = app.places.get(&place.id).unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { kind: Kind::Place, .. }));
    }
}

#[test]
fn missing_target_is_not_found_before_ownership() {
    let app = App::memory();
    let someone = app.signup("someone@example.com");

    let err = app
        .places
        .update(&as_user(&someone), "missing", PlaceChanges::default())
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { .. }));
    assert_eq!(err.status_code(), 404);

    let err = app.places.delete(&as_user(&someone), "missing").unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { .. }));
}

#[test]
fn login_outcomes() {
    let app = App::memory();
    let user = app.signup("ada@example.com");

    let wrong_password = app
        .users
        .login(&Credentials {
            email: "ada@example.com".to_string(),
            password: "wrong".to_string(),
        })
        .unwrap_err();
    let unknown_email = app
        .users
        .login(&Credentials {
            email: "nobody@example.com".to_string(),
            password: "correct horse".to_string(),
        })
        .unwrap_err();
    assert!(matches!(wrong_password, ServiceError::AuthenticationFailure));
    assert!(matches!(unknown_email, ServiceError::AuthenticationFailure));
    assert_eq!(wrong_password.to_string(), unknown_email.to_string());

    let token = app
        .users
        .login(&Credentials {
            email: "ada@example.com".to_string(),
            password: "correct horse".to_string(),
        })
        .unwrap();
    let claims = JwtTokens::new(SECRET, 300)
        .unwrap()
        .decode_claims(&token.token)
        .unwrap();
    assert_eq!(claims.sub, user.id);
    assert!(!claims.is_admin);
    assert_eq!(token.expires_at, claims.exp);
}

/// Counts `verify` calls so tests can compare the work each login path does.
struct CountingHasher {
    inner: BcryptHasher,
    verifies: AtomicUsize,
}

impl CountingHasher {
    fn take(&self) -> usize {
        self.verifies.swap(0, Ordering::SeqCst)
    }
}

impl PasswordHasher for CountingHasher {
    fn hash(&self, plaintext: &str) -> Result<String, CredentialError> {
        self.inner.hash(plaintext)
    }

    fn verify(&self, plaintext: &str, stored_hash: &str) -> Result<bool, CredentialError> {
        self.verifies.fetch_add(1, Ordering::SeqCst);
        self.inner.verify(plaintext, stored_hash)
    }
}

#[test]
fn failed_logins_do_the_same_verification_work() {
    let hasher = Arc::new(CountingHasher {
        inner: BcryptHasher::new(4),
        verifies: AtomicUsize::new(0),
    });
    let repo: Arc<dyn Repository> = Arc::new(MemoryRepository::new());
    let users = UserService::new(
        repo,
        hasher.clone(),
        Arc::new(JwtTokens::new(SECRET, 300).unwrap()),
    );
    users
        .signup(UserDraft {
            email: "ada@example.com".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            password: "correct horse".to_string(),
        })
        .unwrap();

    let wrong_password = users.login(&Credentials {
        email: "ada@example.com".to_string(),
        password: "wrong".to_string(),
    });
    assert!(matches!(wrong_password, Err(ServiceError::AuthenticationFailure)));
    assert_eq!(hasher.take(), 1);

    for _ in 0..2 {
        let unknown_email = users.login(&Credentials {
            email: "nobody@example.com".to_string(),
            password: "hbnb-login-decoy".to_string(),
        });
        assert!(matches!(unknown_email, Err(ServiceError::AuthenticationFailure)));
        assert_eq!(hasher.take(), 1);
    }
}

#[test]
fn admin_login_carries_admin_claim() {
    let app = App::sqlite();
    let admin = app.admin();
    let token = app
        .users
        .login(&Credentials {
            email: "root@example.com".to_string(),
            password: "admin pass".to_string(),
        })
        .unwrap();
    let claims = JwtTokens::new(SECRET, 300)
        .unwrap()
        .decode_claims(&token.token)
        .unwrap();
    assert_eq!(claims.sub, admin.id);
    assert!(claims.is_admin);
}

#[test]
fn signup_never_exposes_or_stores_plaintext() {
    let app = App::memory();
    let profile = app.signup("ada@example.com");
    let json = serde_json::to_value(&profile).unwrap();
    assert!(json.get("password_hash").is_none());
    assert!(!profile.is_admin);

    let stored = app
        .repo
        .find::<hbnb_core::User>(&profile.id)
        .unwrap()
        .unwrap();
    assert_ne!(stored.password_hash, "correct horse");
}

#[test]
fn duplicate_signup_is_conflict() {
    let app = App::memory();
    app.signup("ada@example.com");
    let err = app
        .users
        .signup(UserDraft {
            email: "ada@example.com".to_string(),
            first_name: "Other".to_string(),
            last_name: "Person".to_string(),
            password: "pw".to_string(),
        })
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));
    assert_eq!(err.status_code(), 409);
}

#[test]
fn only_admins_change_admin_flag() {
    let app = App::memory();
    let user = app.signup("ada@example.com");
    let admin = app.admin();

    let promote = UserChanges {
        is_admin: Some(true),
        ..UserChanges::default()
    };
    let err = app
        .users
        .update(&as_user(&user), &user.id, promote.clone())
        .unwrap_err();
    assert!(matches!(err, ServiceError::Denied));
    assert!(!app.users.get(&user.id).unwrap().is_admin);

    let promoted = app
        .users
        .update(&as_admin(&admin), &user.id, promote)
        .unwrap();
    assert!(promoted.is_admin);
}

#[test]
fn users_update_only_themselves() {
    let app = App::memory();
    let ada = app.signup("ada@example.com");
    let grace = app.signup("grace@example.com");

    let rename = UserChanges {
        first_name: Some("Mallory".to_string()),
        ..UserChanges::default()
    };
    let err = app
        .users
        .update(&as_user(&grace), &ada.id, rename.clone())
        .unwrap_err();
    assert!(matches!(err, ServiceError::Denied));

    let renamed = app.users.update(&as_user(&ada), &ada.id, rename).unwrap();
    assert_eq!(renamed.first_name, "Mallory");
}

#[test]
fn password_change_takes_effect_at_login() {
    let app = App::memory();
    let ada = app.signup("ada@example.com");
    let changes = UserChanges {
        password: Some("new secret".to_string()),
        ..UserChanges::default()
    };
    app.users.update(&as_user(&ada), &ada.id, changes).unwrap();

    let old = app.users.login(&Credentials {
        email: "ada@example.com".to_string(),
        password: "correct horse".to_string(),
    });
    assert!(matches!(old, Err(ServiceError::AuthenticationFailure)));
    assert!(app
        .users
        .login(&Credentials {
            email: "ada@example.com".to_string(),
            password: "new secret".to_string(),
        })
        .is_ok());
}

#[test]
fn deleting_account_removes_listings() {
    let app = App::memory();
    let host = app.signup("host@example.com");
    app.places.create(&as_user(&host), loft()).unwrap();

    app.users.delete(&as_user(&host), &host.id).unwrap();
    assert!(app.places.list().unwrap().is_empty());
    assert!(matches!(
        app.users.get(&host.id),
        Err(ServiceError::NotFound { kind: Kind::User, .. })
    ));
}

#[test]
fn account_delete_rejects_strangers_and_missing_targets() {
    for app in [App::memory(), App::sqlite()] {
        let owner = app.signup("owner@example.com");
        let stranger = app.signup("stranger@example.com");

        let err = app.users.delete(&as_user(&stranger), &owner.id).unwrap_err();
        assert!(matches!(err, ServiceError::Denied));
        assert_eq!(app.users.get(&owner.id).unwrap(), owner);

        let err = app.users.delete(&as_user(&stranger), "missing").unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { kind: Kind::User, .. }));
        let err = app.users.delete(&Identity::Anonymous, &owner.id).unwrap_err();
        assert!(matches!(err, ServiceError::Unauthenticated));
    }
}

#[test]
fn review_author_comes_from_caller() {
    let app = App::memory();
    let host = app.signup("host@example.com");
    let guest = app.signup("guest@example.com");
    let place = app.places.create(&as_user(&host), loft()).unwrap();

    let draft: ReviewDraft = serde_json::from_value(json!({
        "rating": 5,
        "comment": "Lovely",
        "user_id": host.id,
    }))
    .unwrap();
    let review = app
        .reviews
        .create(&as_user(&guest), &place.id, draft)
        .unwrap();

    assert_eq!(review.user_id, guest.id);
    assert_eq!(review.place_id, place.id);
    assert_eq!(app.reviews.list_for_place(&place.id).unwrap(), vec![review.clone()]);
    assert_eq!(app.reviews.list_by_user(&guest.id).unwrap(), vec![review]);
    assert!(app.reviews.list_by_user(&host.id).unwrap().is_empty());
}

#[test]
fn host_cannot_review_own_place() {
    let app = App::memory();
    let host = app.signup("host@example.com");
    let place = app.places.create(&as_user(&host), loft()).unwrap();

    let err = app
        .reviews
        .create(
            &as_user(&host),
            &place.id,
            ReviewDraft {
                rating: 5,
                comment: "Best place ever".to_string(),
            },
        )
        .unwrap_err();
    assert!(matches!(err, ServiceError::Invalid(_)));
    assert!(app.reviews.list().unwrap().is_empty());
}

#[test]
fn review_rules() {
    let app = App::sqlite();
    let host = app.signup("host@example.com");
    let guest = app.signup("guest@example.com");
    let admin = app.admin();
    let place = app.places.create(&as_user(&host), loft()).unwrap();

    let err = app
        .reviews
        .create(&as_user(&guest), "missing", ReviewDraft::default())
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { kind: Kind::Place, .. }));

    let err = app
        .reviews
        .create(
            &as_user(&guest),
            &place.id,
            ReviewDraft {
                rating: 9,
                comment: "Too good".to_string(),
            },
        )
        .unwrap_err();
    assert!(matches!(err, ServiceError::Invalid(_)));

    let review = app
        .reviews
        .create(
            &as_user(&guest),
            &place.id,
            ReviewDraft {
                rating: 4,
                comment: "Nice".to_string(),
            },
        )
        .unwrap();

    let edit = ReviewChanges {
        comment: Some("Edited by host".to_string()),
        ..ReviewChanges::default()
    };
    let err = app
        .reviews
        .update(&as_user(&host), &review.id, edit)
        .unwrap_err();
    assert!(matches!(err, ServiceError::Denied));

    app.reviews.delete(&as_admin(&admin), &review.id).unwrap();
    assert!(app.reviews.list_for_place(&place.id).unwrap().is_empty());
}

#[test]
fn amenity_writes_require_admin() {
    let app = App::memory();
    let user = app.signup("ada@example.com");
    let admin = app.admin();

    let err = app
        .amenities
        .create(
            &as_user(&user),
            AmenityDraft {
                name: "Wifi".to_string(),
            },
        )
        .unwrap_err();
    assert!(matches!(err, ServiceError::Denied));

    let wifi = app
        .amenities
        .create(
            &as_admin(&admin),
            AmenityDraft {
                name: "Wifi".to_string(),
            },
        )
        .unwrap();

    let rename = AmenityChanges {
        name: Some("Fast wifi".to_string()),
    };
    assert!(matches!(
        app.amenities.update(&as_user(&user), &wifi.id, rename.clone()),
        Err(ServiceError::Denied)
    ));
    assert!(matches!(
        app.amenities.update(&as_admin(&admin), "missing", rename.clone()),
        Err(ServiceError::NotFound { .. })
    ));
    let renamed = app
        .amenities
        .update(&as_admin(&admin), &wifi.id, rename)
        .unwrap();
    assert_eq!(renamed.name, "Fast wifi");

    let mut draft = loft();
    draft.amenity_ids = vec![wifi.id.clone()];
    let place = app.places.create(&as_user(&user), draft).unwrap();

    app.amenities.delete(&as_admin(&admin), &wifi.id).unwrap();
    assert!(app.places.get(&place.id).unwrap().amenity_ids.is_empty());
    assert!(app.amenities.list().unwrap().is_empty());
}

#[test]
fn place_with_unknown_amenity_is_invalid() {
    let app = App::memory();
    let host = app.signup("host@example.com");
    let mut draft = loft();
    draft.amenity_ids = vec!["missing".to_string()];

    let err = app.places.create(&as_user(&host), draft).unwrap_err();
    assert!(matches!(err, ServiceError::Invalid(_)));
    assert_eq!(err.status_code(), 422);
}

#[test]
fn country_and_city_catalogue() {
    let app = App::memory();
    app.repo.insert(Country::new("FR", "France")).unwrap();
    app.repo.insert(Country::new("JP", "Japan")).unwrap();
    let paris = app.repo.insert(City::new("Paris", "FR")).unwrap();
    app.repo.insert(City::new("Tokyo", "JP")).unwrap();

    let countries = CountryService::new(app.repo.clone());
    let cities = CityService::new(app.repo.clone());

    assert_eq!(countries.list().unwrap().len(), 2);
    assert_eq!(countries.get("FR").unwrap().name, "France");
    assert_eq!(countries.list_cities("FR").unwrap(), vec![paris.clone()]);
    assert!(matches!(
        countries.list_cities("XX"),
        Err(ServiceError::NotFound { kind: Kind::Country, .. })
    ));

    assert_eq!(cities.list().unwrap().len(), 2);
    assert_eq!(cities.get(&paris.id).unwrap(), paris);
    assert!(matches!(
        cities.get("missing"),
        Err(ServiceError::NotFound { kind: Kind::City, .. })
    ));
}
