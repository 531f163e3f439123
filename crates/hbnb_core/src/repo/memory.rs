//! In-process repository, optionally mirrored to a JSON snapshot file.
//!
//! # Responsibility
//! - Serve tests and lightweight environments without a database.
//! - Mirror the SQLite backend's contract, including owned-data cascades.
//!
//! # Invariants
//! - A single `RwLock` guards all tables: one writer at a time, readers only
//!   ever see committed state.
//! - Every write is applied to a copy of the tables and swapped in only after
//!   all checks (and the snapshot write, when enabled) succeed.
//! - Snapshot writes are read-modify-write: the file is re-read under a
//!   per-path lock shared by every handle in the process, so one handle never
//!   overwrites records another handle committed. Separate processes on one
//!   file are not coordinated.

use crate::model::entity::Entity;
use crate::model::kind::Kind;
use crate::model::now_epoch_ms;
use crate::model::place::Place;
use crate::repo::{log_write, RepoError, RepoResult, Repository};
use log::{debug, info};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard};

const SNAPSHOT_FORMAT_VERSION: u32 = 1;

type Table = BTreeMap<String, Entity>;

static SNAPSHOT_LOCKS: Lazy<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

#[derive(Debug, Clone, Default)]
struct Tables {
    by_kind: BTreeMap<Kind, Table>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    entities: Vec<Entity>,
}

/// Repository backed by process memory.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    tables: RwLock<Tables>,
    snapshot_path: Option<PathBuf>,
}

impl MemoryRepository {
    /// Creates an empty, process-local repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a repository mirrored to the JSON file at `path`.
    ///
    /// Loads the file when it exists; otherwise starts empty and creates the
    /// file on the first successful write.
    pub fn open_snapshot(path: impl Into<PathBuf>) -> RepoResult<Self> {
        let path = path.into();
        let tables = read_snapshot(&path)?;
        info!(
            "event=snapshot_open module=repo backend=memory status=ok records={}",
            tables.len()
        );
        Ok(Self {
            tables: RwLock::new(tables),
            snapshot_path: Some(path),
        })
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot_path.as_deref()
    }

    fn read(&self) -> RepoResult<RwLockReadGuard<'_, Tables>> {
        self.tables.read().map_err(|_| RepoError::LockPoisoned)
    }

    fn mutate<T>(&self, apply: impl FnOnce(&mut Tables) -> RepoResult<T>) -> RepoResult<T> {
        let mut guard = self.tables.write().map_err(|_| RepoError::LockPoisoned)?;
        let Some(path) = &self.snapshot_path else {
            let mut next = guard.clone();
            let output = apply(&mut next)?;
            *guard = next;
            return Ok(output);
        };

        let file_lock = snapshot_lock(path)?;
        let _file_guard = file_lock.lock().map_err(|_| RepoError::LockPoisoned)?;
        let mut next = read_snapshot(path)?;
        let output = apply(&mut next)?;
        write_snapshot(path, &next)?;
        *guard = next;
        Ok(output)
    }
}

impl Repository for MemoryRepository {
    fn get_all(&self, kind: Kind) -> RepoResult<Vec<Entity>> {
        Ok(self.read()?.sorted(kind, |_| true))
    }

    fn get(&self, kind: Kind, id: &str) -> RepoResult<Option<Entity>> {
        Ok(self.read()?.get(kind, id).cloned())
    }

    fn get_by_field(&self, kind: Kind, field: &str, value: &str) -> RepoResult<Option<Entity>> {
        if !kind.supports_lookup(field) {
            return Ok(None);
        }
        let mut matches = self
            .read()?
            .sorted(kind, |entity| entity.lookup_value(field) == Some(value));
        if matches.len() > 1 {
            return Err(RepoError::Integrity(format!(
                "{} {kind} records share {field}; expected at most one",
                matches.len()
            )));
        }
        Ok(matches.pop())
    }

    fn save(&self, entity: &mut Entity) -> RepoResult<()> {
        let kind = entity.kind();
        let mut prepared = entity.clone();
        prepared.prepare_insert(now_epoch_ms());

        let result = prepared
            .validate()
            .map_err(RepoError::from)
            .and_then(|()| {
                self.mutate(|tables| {
                    if tables.get(kind, prepared.id()).is_some() {
                        return Err(RepoError::Conflict(format!(
                            "{kind} already exists: {}",
                            prepared.id()
                        )));
                    }
                    tables.ensure_references(&prepared)?;
                    tables.ensure_email_available(&prepared)?;
                    tables.put(prepared.clone());
                    Ok(())
                })
            });
        log_write("memory", "save", kind, &result);
        result?;

        *entity = prepared;
        Ok(())
    }

    fn update(&self, entity: &mut Entity) -> RepoResult<()> {
        let kind = entity.kind();
        let mut prepared = entity.clone();

        let result = self.mutate(|tables| {
            let stored_created_at = tables
                .get(kind, prepared.id())
                .map(Entity::created_at)
                .ok_or_else(|| RepoError::not_found(kind, prepared.id()))?;
            prepared.prepare_update(stored_created_at, now_epoch_ms());
            prepared.validate()?;
            tables.ensure_references(&prepared)?;
            tables.ensure_email_available(&prepared)?;
            tables.put(prepared.clone());
            Ok(())
        });
        log_write("memory", "update", kind, &result);
        result?;

        *entity = prepared;
        Ok(())
    }

    fn delete(&self, entity: &Entity) -> RepoResult<bool> {
        let kind = entity.kind();
        let result = self.mutate(|tables| {
            if tables.get(kind, entity.id()).is_none() {
                return Err(RepoError::not_found(kind, entity.id()));
            }
            tables.remove_cascade(kind, entity.id());
            Ok(true)
        });
        log_write("memory", "delete", kind, &result);
        result
    }

    fn reload(&self) -> RepoResult<()> {
        let Some(path) = &self.snapshot_path else {
            debug!("event=repo_reload module=repo backend=memory status=skipped");
            return Ok(());
        };
        let fresh = read_snapshot(path)?;
        let mut guard = self.tables.write().map_err(|_| RepoError::LockPoisoned)?;
        *guard = fresh;
        info!("event=repo_reload module=repo backend=memory status=ok records={}", guard.len());
        Ok(())
    }
}

impl Tables {
    fn len(&self) -> usize {
        self.by_kind.values().map(BTreeMap::len).sum()
    }

    fn get(&self, kind: Kind, id: &str) -> Option<&Entity> {
        self.by_kind.get(&kind).and_then(|table| table.get(id))
    }

    fn put(&mut self, entity: Entity) {
        self.by_kind
            .entry(entity.kind())
            .or_default()
            .insert(entity.id().to_string(), entity);
    }

    fn sorted(&self, kind: Kind, keep: impl Fn(&Entity) -> bool) -> Vec<Entity> {
        let mut entities: Vec<Entity> = self
            .by_kind
            .get(&kind)
            .map(|table| table.values().filter(|entity| keep(entity)).cloned().collect())
            .unwrap_or_default();
        entities.sort_by(|left, right| {
            (left.created_at(), left.id()).cmp(&(right.created_at(), right.id()))
        });
        entities
    }

    fn ids_where(&self, kind: Kind, field: &str, value: &str) -> Vec<String> {
        self.by_kind
            .get(&kind)
            .map(|table| {
                table
                    .values()
                    .filter(|entity| entity.lookup_value(field) == Some(value))
                    .map(|entity| entity.id().to_string())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn ensure_references(&self, entity: &Entity) -> RepoResult<()> {
        for (kind, id) in entity.references() {
            if self.get(kind, id).is_none() {
                return Err(RepoError::MissingReference {
                    kind,
                    id: id.to_string(),
                });
            }
        }
        Ok(())
    }

    fn ensure_email_available(&self, entity: &Entity) -> RepoResult<()> {
        let Entity::User(user) = entity else {
            return Ok(());
        };
        let taken = self
            .ids_where(Kind::User, "email", &user.email)
            .iter()
            .any(|id| *id != user.id);
        if taken {
            return Err(RepoError::Conflict("email already registered".to_string()));
        }
        Ok(())
    }

    /// Removes one record plus everything it owns, mirroring the SQL
    /// `ON DELETE CASCADE` / `SET NULL` rules.
    fn remove_cascade(&mut self, kind: Kind, id: &str) {
        match kind {
            Kind::User => {
                for place_id in self.ids_where(Kind::Place, "host_id", id) {
                    self.remove_cascade(Kind::Place, &place_id);
                }
                for review_id in self.ids_where(Kind::Review, "user_id", id) {
                    self.remove_cascade(Kind::Review, &review_id);
                }
            }
            Kind::Place => {
                for review_id in self.ids_where(Kind::Review, "place_id", id) {
                    self.remove_cascade(Kind::Review, &review_id);
                }
            }
            Kind::Country => {
                for city_id in self.ids_where(Kind::City, "country_code", id) {
                    self.remove_cascade(Kind::City, &city_id);
                }
            }
            Kind::City => {
                for place in self.places_mut() {
                    if place.city_id.as_deref() == Some(id) {
                        place.city_id = None;
                    }
                }
            }
            Kind::Amenity => {
                for place in self.places_mut() {
                    place.amenity_ids.retain(|amenity_id| amenity_id != id);
                }
            }
            Kind::Review => {}
        }

        if let Some(table) = self.by_kind.get_mut(&kind) {
            table.remove(id);
        }
    }

    fn places_mut(&mut self) -> impl Iterator<Item = &mut Place> {
        self.by_kind
            .get_mut(&Kind::Place)
            .into_iter()
            .flat_map(|table| table.values_mut())
            .filter_map(|entity| match entity {
                Entity::Place(place) => Some(place),
                _ => None,
            })
    }

    fn from_snapshot(snapshot: Snapshot) -> RepoResult<Self> {
        if snapshot.version != SNAPSHOT_FORMAT_VERSION {
            return Err(RepoError::InvalidData(format!(
                "unsupported snapshot version {}",
                snapshot.version
            )));
        }
        let mut tables = Self::default();
        for entity in snapshot.entities {
            entity.validate().map_err(|err| {
                RepoError::InvalidData(format!(
                    "snapshot {} `{}` failed validation: {err}",
                    entity.kind(),
                    entity.id()
                ))
            })?;
            if tables.get(entity.kind(), entity.id()).is_some() {
                return Err(RepoError::InvalidData(format!(
                    "snapshot contains duplicate {} `{}`",
                    entity.kind(),
                    entity.id()
                )));
            }
            tables.put(entity);
        }
        Ok(tables)
    }

    fn to_snapshot(&self) -> Snapshot {
        let entities = Kind::ALL
            .iter()
            .flat_map(|kind| self.sorted(*kind, |_| true))
            .collect();
        Snapshot {
            version: SNAPSHOT_FORMAT_VERSION,
            entities,
        }
    }
}

fn read_snapshot(path: &Path) -> RepoResult<Tables> {
    if !path.exists() {
        return Ok(Tables::default());
    }
    let bytes = fs::read(path)?;
    let snapshot: Snapshot = serde_json::from_slice(&bytes)?;
    Tables::from_snapshot(snapshot)
}

/// Writes to a uniquely named sibling temp file, then renames it over `path`.
fn write_snapshot(path: &Path, tables: &Tables) -> RepoResult<()> {
    let encoded = serde_json::to_vec_pretty(&tables.to_snapshot())?;
    let mut temp = tempfile::NamedTempFile::new_in(snapshot_dir(path))?;
    temp.write_all(&encoded)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|err| RepoError::SnapshotIo(err.error))?;
    Ok(())
}

fn snapshot_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Returns the lock every handle on the same file shares.
fn snapshot_lock(path: &Path) -> RepoResult<Arc<Mutex<()>>> {
    let key = match (fs::canonicalize(snapshot_dir(path)), path.file_name()) {
        (Ok(dir), Some(name)) => dir.join(name),
        _ => path.to_path_buf(),
    };
    let mut locks = SNAPSHOT_LOCKS.lock().map_err(|_| RepoError::LockPoisoned)?;
    Ok(Arc::clone(locks.entry(key).or_default()))
}
