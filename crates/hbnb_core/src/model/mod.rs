//! Domain records for the rental listing core.
//!
//! # Responsibility
//! - Define the plain records stored by repositories.
//! - Provide the closed `Kind` tag used as the repository dispatch key.
//!
//! # Invariants
//! - Records reference each other by id, never by embedded values.
//! - Every record is validated before a repository writes it.

pub mod amenity;
pub mod city;
pub mod country;
pub mod entity;
pub mod kind;
pub mod place;
pub mod review;
pub mod user;
pub mod validation;

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time in Unix epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
