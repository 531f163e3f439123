//! Core domain logic for the HBnB backend.
//!
//! Transports (HTTP handlers, CLIs) build an `Identity`, pick a repository
//! through `config::open_repository` and call the resource services. All
//! persistence and authorization rules live in this crate.

pub mod auth;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use auth::{
    authorize_mutation, check_admin, check_owner, owner_or_admin, AccessToken, BcryptHasher,
    Caller, Claims, Decision, Guarded, Identity, JwtTokens, PasswordHasher, TokenIssuer,
    TokenVerifier,
};
pub use config::{open_repository, AppEnv, ConfigError, Settings};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::amenity::Amenity;
pub use model::city::City;
pub use model::country::Country;
pub use model::entity::{Entity, Record};
pub use model::kind::Kind;
pub use model::place::Place;
pub use model::review::Review;
pub use model::user::{User, UserProfile};
pub use repo::{
    MemoryRepository, RepoError, RepoResult, Repository, SqliteRepository, TypedRepository,
};
pub use service::{
    AmenityService, CityService, CountryService, PlaceService, ReviewService, ServiceError,
    ServiceResult, UserService,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
