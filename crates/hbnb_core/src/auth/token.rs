//! Signed, time-bound access tokens.
//!
//! # Invariants
//! - Tokens embed the caller id (`sub`) and the `is_admin` claim.
//! - `exp` is always later than `iat`.
//! - The signing secret never appears in `Debug` output or logs.

use crate::auth::identity::{Caller, Claims};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

pub const DEFAULT_TOKEN_TTL_SECS: u64 = 3600;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token signing secret cannot be empty")]
    EmptySecret,
    #[error("token lifetime must be positive")]
    ZeroTtl,
    #[error(transparent)]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

/// Payload carried inside every token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub is_admin: bool,
    pub iat: u64,
    pub exp: u64,
}

/// Token handed back by a successful login.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: u64,
}

impl Debug for AccessToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

pub trait TokenIssuer: Send + Sync {
    fn issue(&self, caller_id: &str, claims: Claims) -> Result<AccessToken, TokenError>;
}

pub trait TokenVerifier: Send + Sync {
    /// Checks signature and expiry, returning the caller the token names.
    fn verify(&self, token: &str) -> Result<Caller, TokenError>;
}

/// HS256 tokens signed with a shared secret.
#[derive(Clone)]
pub struct JwtTokens {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: u64,
}

impl JwtTokens {
    pub fn new(secret: &str, ttl_secs: u64) -> Result<Self, TokenError> {
        if secret.is_empty() {
            return Err(TokenError::EmptySecret);
        }
        if ttl_secs == 0 {
            return Err(TokenError::ZeroTtl);
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl_secs,
        })
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    /// Decodes and validates a token, returning its raw claims.
    pub fn decode_claims(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let data = decode::<TokenClaims>(
            token,
            &self.decoding,
            &Validation::new(Algorithm::HS256),
        )?;
        Ok(data.claims)
    }
}

impl Debug for JwtTokens {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtTokens")
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer for JwtTokens {
    fn issue(&self, caller_id: &str, claims: Claims) -> Result<AccessToken, TokenError> {
        let iat = now_epoch_secs();
        let exp = iat.saturating_add(self.ttl_secs);
        let payload = TokenClaims {
            sub: caller_id.to_string(),
            is_admin: claims.is_admin,
            iat,
            exp,
        };
        let token = encode(&Header::new(Algorithm::HS256), &payload, &self.encoding)?;
        Ok(AccessToken {
            token,
            expires_at: exp,
        })
    }
}

impl TokenVerifier for JwtTokens {
    fn verify(&self, token: &str) -> Result<Caller, TokenError> {
        let claims = self.decode_claims(token)?;
        Ok(Caller::new(
            claims.sub,
            Claims {
                is_admin: claims.is_admin,
            },
        ))
    }
}

fn now_epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}
