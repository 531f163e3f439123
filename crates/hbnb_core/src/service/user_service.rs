//! User accounts and login.
//!
//! # Invariants
//! - Plaintext passwords are hashed before they reach the repository.
//! - Only admins may grant or revoke the admin flag.
//! - Login failures are undifferentiated, in result and in work done: an
//!   unknown email is verified against a decoy hash of the same cost.

use crate::auth::identity::{Claims, Identity};
use crate::auth::password::PasswordHasher;
use crate::auth::token::{AccessToken, TokenIssuer};
use crate::model::entity::Entity;
use crate::model::kind::Kind;
use crate::model::user::{User, UserProfile};
use crate::repo::{Repository, TypedRepository};
use crate::service::error::{ServiceError, ServiceResult};
use crate::service::{authorize_owner, fetch, log_use_case, require_caller};
use log::{info, warn};
use once_cell::sync::OnceCell;
use serde::Deserialize;
use std::sync::Arc;

const DECOY_PASSWORD: &str = "hbnb-login-decoy";

/// Sign-up payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UserDraft {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

/// Partial update; `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct UserChanges {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password: Option<String>,
    pub is_admin: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

pub struct UserService<R: Repository> {
    repo: R,
    hasher: Arc<dyn PasswordHasher>,
    tokens: Arc<dyn TokenIssuer>,
    decoy_hash: OnceCell<String>,
}

impl<R: Repository> UserService<R> {
    pub fn new(repo: R, hasher: Arc<dyn PasswordHasher>, tokens: Arc<dyn TokenIssuer>) -> Self {
        Self {
            repo,
            hasher,
            tokens,
            decoy_hash: OnceCell::new(),
        }
    }

    pub fn list(&self) -> ServiceResult<Vec<UserProfile>> {
        let users = self.repo.find_all::<User>()?;
        Ok(users.iter().map(User::profile).collect())
    }

    pub fn get(&self, id: &str) -> ServiceResult<UserProfile> {
        Ok(fetch::<User, _>(&self.repo, id)?.profile())
    }

    /// Public registration; the new account is never an admin.
    pub fn signup(&self, draft: UserDraft) -> ServiceResult<UserProfile> {
        let result = self.register(draft, false);
        log_use_case(Kind::User, "signup", &result);
        result
    }

    /// Bootstrap path for the first administrator; not exposed to callers.
    pub fn create_admin(&self, draft: UserDraft) -> ServiceResult<UserProfile> {
        let result = self.register(draft, true);
        log_use_case(Kind::User, "create_admin", &result);
        result
    }

    pub fn update(
        &self,
        identity: &Identity,
        id: &str,
        changes: UserChanges,
    ) -> ServiceResult<UserProfile> {
        let result = self.apply_update(identity, id, changes);
        log_use_case(Kind::User, "update", &result);
        result
    }

    pub fn delete(&self, identity: &Identity, id: &str) -> ServiceResult<()> {
        let result = authorize_owner::<User, _>(&self.repo, identity, id).and_then(|user| {
            self.repo
                .delete(&Entity::from(user))
                .map(|_| ())
                .map_err(ServiceError::from)
        });
        log_use_case(Kind::User, "delete", &result);
        result
    }

    /// Exchanges an email/password pair for a signed access token.
    pub fn login(&self, credentials: &Credentials) -> ServiceResult<AccessToken> {
        let user = self
            .repo
            .find_by::<User>("email", credentials.email.as_str())?;
        let stored_hash = match &user {
            Some(user) => user.password_hash.as_str(),
            None => self.decoy_hash()?,
        };
        let verified = self
            .hasher
            .verify(credentials.password.as_str(), stored_hash)
            .inspect_err(|_| {
                warn!("event=login module=service status=error reason=unreadable_hash")
            })?;

        let user = match user {
            Some(user) if verified => user,
            _ => {
                info!("event=login module=service status=rejected");
                return Err(ServiceError::AuthenticationFailure);
            }
        };

        let token = self.tokens.issue(
            &user.id,
            Claims {
                is_admin: user.is_admin,
            },
        )?;
        info!(
            "event=login module=service status=ok admin={}",
            user.is_admin
        );
        Ok(token)
    }

    fn register(&self, draft: UserDraft, is_admin: bool) -> ServiceResult<UserProfile> {
        let password_hash = self.hash_password(&draft.password)?;
        let mut user = User::new(draft.email, draft.first_name, draft.last_name, password_hash);
        user.is_admin = is_admin;
        let user = self.repo.insert(user)?;
        Ok(user.profile())
    }

    fn apply_update(
        &self,
        identity: &Identity,
        id: &str,
        changes: UserChanges,
    ) -> ServiceResult<UserProfile> {
        let caller = require_caller(identity)?;
        let mut user = authorize_owner::<User, _>(&self.repo, identity, id)?;
        if changes.is_admin.is_some() && !caller.is_admin() {
            return Err(ServiceError::Denied);
        }

        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(first_name) = changes.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = changes.last_name {
            user.last_name = last_name;
        }
        if let Some(password) = changes.password {
            user.password_hash = self.hash_password(&password)?;
        }
        if let Some(is_admin) = changes.is_admin {
            user.is_admin = is_admin;
        }

        Ok(self.repo.store(user)?.profile())
    }

    fn decoy_hash(&self) -> ServiceResult<&str> {
        let hash = self
            .decoy_hash
            .get_or_try_init(|| self.hasher.hash(DECOY_PASSWORD))?;
        Ok(hash.as_str())
    }

    fn hash_password(&self, password: &str) -> ServiceResult<String> {
        if password.trim().is_empty() {
            return Err(ServiceError::Invalid("password cannot be blank".to_string()));
        }
        Ok(self.hasher.hash(password)?)
    }
}
