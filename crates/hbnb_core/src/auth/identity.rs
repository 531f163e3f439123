//! Caller identity as supplied by the transport layer.

use serde::{Deserialize, Serialize};

/// Role attributes asserted by a verified credential.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub is_admin: bool,
}

impl Claims {
    pub fn admin() -> Self {
        Self { is_admin: true }
    }
}

/// An identified caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub id: String,
    pub claims: Claims,
}

impl Caller {
    pub fn new(id: impl Into<String>, claims: Claims) -> Self {
        Self {
            id: id.into(),
            claims,
        }
    }

    pub fn user(id: impl Into<String>) -> Self {
        Self::new(id, Claims::default())
    }

    pub fn admin(id: impl Into<String>) -> Self {
        Self::new(id, Claims::admin())
    }

    pub fn is_admin(&self) -> bool {
        self.claims.is_admin
    }
}

/// Who is making a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Anonymous,
    Caller(Caller),
}

impl Identity {
    /// The identified caller, or `None` for anonymous requests.
    pub fn caller(&self) -> Option<&Caller> {
        match self {
            Self::Anonymous => None,
            Self::Caller(caller) => Some(caller),
        }
    }
}

impl From<Caller> for Identity {
    fn from(value: Caller) -> Self {
        Self::Caller(value)
    }
}
