//! Repository contract and its storage backends.
//!
//! # Responsibility
//! - Define one storage-agnostic CRUD contract over every resource kind.
//! - Keep backend details (SQL, locking, snapshot files) out of services.
//!
//! # Invariants
//! - Writes validate records and check references before touching storage.
//! - Writes are all-or-nothing: a failed call leaves the store unchanged.
//! - Missing records are `Ok(None)` on reads and `RepoError::NotFound` on
//!   writes; integrity faults are never reported as absent.
//! - Both backends must pass the same contract tests.

pub mod memory;
pub mod sqlite;

use crate::db::DbError;
use crate::model::entity::{Entity, Record};
use crate::model::kind::Kind;
use crate::model::validation::ValidationError;
use log::{debug, warn};
use std::sync::Arc;
use thiserror::Error;

pub use memory::MemoryRepository;
pub use sqlite::SqliteRepository;

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: Kind, id: String },
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("referenced {kind} does not exist: {id}")]
    MissingReference { kind: Kind, id: String },
    #[error("integrity violation: {0}")]
    Integrity(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("invalid persisted data: {0}")]
    InvalidData(String),
    #[error("repository lock poisoned")]
    LockPoisoned,
    #[error("snapshot file error: {0}")]
    SnapshotIo(#[from] std::io::Error),
    #[error("snapshot encoding error: {0}")]
    SnapshotFormat(#[from] serde_json::Error),
    #[error(transparent)]
    Db(#[from] DbError),
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl RepoError {
    pub(crate) fn not_found(kind: Kind, id: &str) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

/// Storage-agnostic CRUD contract shared by every backend.
pub trait Repository: Send + Sync {
    /// All records of `kind`, ordered by `created_at` then id.
    fn get_all(&self, kind: Kind) -> RepoResult<Vec<Entity>>;

    /// One record by id, or `None` when it does not exist.
    fn get(&self, kind: Kind, id: &str) -> RepoResult<Option<Entity>>;

    /// First record whose `field` equals `value`.
    ///
    /// Fields outside `Kind::lookup_fields` never match. More than one match
    /// is reported as `RepoError::Integrity`.
    fn get_by_field(&self, kind: Kind, field: &str, value: &str) -> RepoResult<Option<Entity>>;

    /// Inserts a new record, assigning its id when empty and stamping both
    /// timestamps. `entity` is only updated once the write has committed.
    fn save(&self, entity: &mut Entity) -> RepoResult<()>;

    /// Persists every field of an existing record and refreshes `updated_at`.
    fn update(&self, entity: &mut Entity) -> RepoResult<()>;

    /// Removes a record together with the data it owns.
    fn delete(&self, entity: &Entity) -> RepoResult<bool>;

    /// Drops backend-local state and re-reads from the backing store.
    fn reload(&self) -> RepoResult<()>;

    /// `get_all` addressed by kind name; unknown kinds yield an empty list.
    fn get_all_named(&self, kind: &str) -> RepoResult<Vec<Entity>> {
        match Kind::from_name(kind) {
            Some(kind) => self.get_all(kind),
            None => Ok(Vec::new()),
        }
    }

    /// `get` addressed by kind name; unknown kinds yield `None`.
    fn get_named(&self, kind: &str, id: &str) -> RepoResult<Option<Entity>> {
        match Kind::from_name(kind) {
            Some(kind) => self.get(kind, id),
            None => Ok(None),
        }
    }

    /// `get_by_field` addressed by kind name; unknown kinds yield `None`.
    fn get_by_field_named(
        &self,
        kind: &str,
        field: &str,
        value: &str,
    ) -> RepoResult<Option<Entity>> {
        match Kind::from_name(kind) {
            Some(kind) => self.get_by_field(kind, field, value),
            None => Ok(None),
        }
    }
}

impl<R: Repository + ?Sized> Repository for Arc<R> {
    fn get_all(&self, kind: Kind) -> RepoResult<Vec<Entity>> {
        (**self).get_all(kind)
    }

    fn get(&self, kind: Kind, id: &str) -> RepoResult<Option<Entity>> {
        (**self).get(kind, id)
    }

    fn get_by_field(&self, kind: Kind, field: &str, value: &str) -> RepoResult<Option<Entity>> {
        (**self).get_by_field(kind, field, value)
    }

    fn save(&self, entity: &mut Entity) -> RepoResult<()> {
        (**self).save(entity)
    }

    fn update(&self, entity: &mut Entity) -> RepoResult<()> {
        (**self).update(entity)
    }

    fn delete(&self, entity: &Entity) -> RepoResult<bool> {
        (**self).delete(entity)
    }

    fn reload(&self) -> RepoResult<()> {
        (**self).reload()
    }
}

impl<R: Repository + ?Sized> Repository for &R {
    fn get_all(&self, kind: Kind) -> RepoResult<Vec<Entity>> {
        (**self).get_all(kind)
    }

    fn get(&self, kind: Kind, id: &str) -> RepoResult<Option<Entity>> {
        (**self).get(kind, id)
    }

    fn get_by_field(&self, kind: Kind, field: &str, value: &str) -> RepoResult<Option<Entity>> {
        (**self).get_by_field(kind, field, value)
    }

    fn save(&self, entity: &mut Entity) -> RepoResult<()> {
        (**self).save(entity)
    }

    fn update(&self, entity: &mut Entity) -> RepoResult<()> {
        (**self).update(entity)
    }

    fn delete(&self, entity: &Entity) -> RepoResult<bool> {
        (**self).delete(entity)
    }

    fn reload(&self) -> RepoResult<()> {
        (**self).reload()
    }
}

/// Typed helpers over `Repository` for callers that know the record type.
pub trait TypedRepository: Repository {
    fn find<T: Record>(&self, id: &str) -> RepoResult<Option<T>> {
        self.get(T::KIND, id)?.map(expect_record).transpose()
    }

    fn find_by<T: Record>(&self, field: &str, value: &str) -> RepoResult<Option<T>> {
        self.get_by_field(T::KIND, field, value)?
            .map(expect_record)
            .transpose()
    }

    fn find_all<T: Record>(&self) -> RepoResult<Vec<T>> {
        self.get_all(T::KIND)?
            .into_iter()
            .map(expect_record)
            .collect()
    }

    /// Saves `record` and returns it with identity and timestamps assigned.
    fn insert<T: Record>(&self, record: T) -> RepoResult<T> {
        let mut entity = record.into();
        self.save(&mut entity)?;
        expect_record(entity)
    }

    /// Updates `record` and returns it with refreshed timestamps.
    fn store<T: Record>(&self, record: T) -> RepoResult<T> {
        let mut entity = record.into();
        self.update(&mut entity)?;
        expect_record(entity)
    }
}

impl<R: Repository + ?Sized> TypedRepository for R {}

/// Emits the `repo_write` event shared by every backend.
pub(crate) fn log_write<T>(backend: &str, op: &str, kind: Kind, result: &RepoResult<T>) {
    match result {
        Ok(_) => debug!("event=repo_write module=repo backend={backend} op={op} kind={kind} status=ok"),
        Err(err) => warn!(
            "event=repo_write module=repo backend={backend} op={op} kind={kind} status=error error={err}"
        ),
    }
}

fn expect_record<T: Record>(entity: Entity) -> RepoResult<T> {
    let actual = entity.kind();
    T::from_entity(entity).ok_or_else(|| {
        RepoError::InvalidData(format!("expected {} record, found {actual}", T::KIND))
    })
}
