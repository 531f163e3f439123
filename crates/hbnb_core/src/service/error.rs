//! Service-level error taxonomy.

use crate::auth::password::CredentialError;
use crate::auth::token::TokenError;
use crate::model::kind::Kind;
use crate::model::validation::ValidationError;
use crate::repo::RepoError;
use thiserror::Error;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: Kind, id: String },
    /// Never says whether ownership or the admin claim was missing.
    #[error("permission denied")]
    Denied,
    #[error("authentication required")]
    Unauthenticated,
    #[error("conflict: {0}")]
    Conflict(String),
    /// Same message whether the email or the password was wrong.
    #[error("invalid email or password")]
    AuthenticationFailure,
    #[error("invalid input: {0}")]
    Invalid(String),
    #[error("storage fault: {0}")]
    StorageFault(#[source] RepoError),
    #[error(transparent)]
    Credential(#[from] CredentialError),
}

impl ServiceError {
    pub(crate) fn not_found(kind: Kind, id: &str) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Transport-level status equivalent.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound { .. } => 404,
            Self::Denied => 403,
            Self::Unauthenticated | Self::AuthenticationFailure => 401,
            Self::Conflict(_) => 409,
            Self::Invalid(_) => 422,
            Self::StorageFault(_) | Self::Credential(_) => 500,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { kind, id } => Self::NotFound { kind, id },
            RepoError::Conflict(message) => Self::Conflict(message),
            err @ (RepoError::Validation(_) | RepoError::MissingReference { .. }) => {
                Self::Invalid(err.to_string())
            }
            other => Self::StorageFault(other),
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Invalid(value.to_string())
    }
}

impl From<TokenError> for ServiceError {
    fn from(value: TokenError) -> Self {
        Self::Credential(CredentialError::from(value))
    }
}

#[cfg(test)]
mod tests {
    use super::ServiceError;
    use crate::model::kind::Kind;
    use crate::model::validation::ValidationError;
    use crate::repo::RepoError;

    #[test]
    fn repo_errors_map_one_to_one() {
        let err = ServiceError::from(RepoError::NotFound {
            kind: Kind::Place,
            id: "p1".to_string(),
        });
        assert_eq!(err.status_code(), 404);

        let err = ServiceError::from(RepoError::Conflict("email".to_string()));
        assert!(matches!(err, ServiceError::Conflict(_)));

        let err = ServiceError::from(RepoError::MissingReference {
            kind: Kind::City,
            id: "c1".to_string(),
        });
        assert!(matches!(err, ServiceError::Invalid(_)));

        let err = ServiceError::from(RepoError::Validation(ValidationError::RatingOutOfRange(9)));
        assert_eq!(err.status_code(), 422);

        let err = ServiceError::from(RepoError::LockPoisoned);
        assert!(matches!(err, ServiceError::StorageFault(_)));
        assert_eq!(err.status_code(), 500);
    }

    #[test]
    fn authentication_failure_does_not_name_the_factor() {
        let message = ServiceError::AuthenticationFailure.to_string();
        assert!(!message.contains("not found"));
        assert_eq!(ServiceError::AuthenticationFailure.status_code(), 401);
    }
}
