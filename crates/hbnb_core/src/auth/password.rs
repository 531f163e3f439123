//! Password hashing capability.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
    #[error("token error: {0}")]
    Token(#[from] crate::auth::token::TokenError),
}

pub trait PasswordHasher: Send + Sync {
    fn hash(&self, plaintext: &str) -> Result<String, CredentialError>;

    /// `Ok(false)` for a wrong password; `Err` only when the hash is unusable.
    fn verify(&self, plaintext: &str, stored_hash: &str) -> Result<bool, CredentialError>;
}

/// bcrypt with a configurable work factor.
#[derive(Debug, Clone, Copy)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

impl PasswordHasher for BcryptHasher {
    fn hash(&self, plaintext: &str) -> Result<String, CredentialError> {
        Ok(bcrypt::hash(plaintext, self.cost)?)
    }

    fn verify(&self, plaintext: &str, stored_hash: &str) -> Result<bool, CredentialError> {
        Ok(bcrypt::verify(plaintext, stored_hash)?)
    }
}
