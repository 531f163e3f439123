//! Caller identity, authorization decisions and credential capabilities.
//!
//! # Responsibility
//! - Model who is calling (`Identity`) without parsing transport headers.
//! - Decide ALLOWED / DENIED / NOT_FOUND for mutating operations.
//! - Provide password hashing and token issuance behind small traits.
//!
//! # Invariants
//! - The guard never mutates the repository.
//! - Password hashes and tokens are never logged.

pub mod guard;
pub mod identity;
pub mod password;
pub mod token;

pub use guard::{
    authorize_mutation, check_admin, check_owner, owner_or_admin, Decision, Guarded,
};
pub use identity::{Caller, Claims, Identity};
pub use password::{BcryptHasher, CredentialError, PasswordHasher};
pub use token::{AccessToken, JwtTokens, TokenClaims, TokenError, TokenIssuer, TokenVerifier};
