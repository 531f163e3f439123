//! SQLite-backed repository.
//!
//! # Responsibility
//! - Persist every resource kind in its own table.
//! - Keep SQL and row decoding inside the persistence boundary.
//!
//! # Invariants
//! - Each write runs in one `IMMEDIATE` transaction; dropping an uncommitted
//!   transaction rolls it back.
//! - Owned data is removed by `ON DELETE CASCADE` / `SET NULL` inside the
//!   same transaction as its owner.
//! - Read paths reject invalid persisted rows instead of masking them.

use crate::db::migrations::ensure_current;
use crate::db::{open_db, open_db_in_memory};
use crate::model::amenity::Amenity;
use crate::model::city::City;
use crate::model::country::Country;
use crate::model::entity::Entity;
use crate::model::kind::Kind;
use crate::model::now_epoch_ms;
use crate::model::place::Place;
use crate::model::review::Review;
use crate::model::user::User;
use crate::repo::{log_write, RepoError, RepoResult, Repository};
use log::debug;
use rusqlite::{ffi, params, Connection, OptionalExtension, Params, Row, TransactionBehavior};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const USER_SELECT_SQL: &str = "SELECT
    id,
    email,
    first_name,
    last_name,
    password_hash,
    is_admin,
    created_at,
    updated_at
FROM users";

const PLACE_SELECT_SQL: &str = "SELECT
    id,
    host_id,
    name,
    description,
    address,
    city_id,
    latitude,
    longitude,
    number_of_rooms,
    number_of_bathrooms,
    price_per_night,
    max_guests,
    created_at,
    updated_at
FROM places";

const REVIEW_SELECT_SQL: &str = "SELECT
    id,
    place_id,
    user_id,
    rating,
    comment,
    created_at,
    updated_at
FROM reviews";

const COUNTRY_SELECT_SQL: &str = "SELECT code, name, created_at, updated_at FROM countries";

const CITY_SELECT_SQL: &str =
    "SELECT id, name, country_code, created_at, updated_at FROM cities";

const AMENITY_SELECT_SQL: &str = "SELECT id, name, created_at, updated_at FROM amenities";

/// Repository over one SQLite connection.
pub struct SqliteRepository {
    conn: Mutex<Connection>,
}

impl SqliteRepository {
    /// Wraps a connection that is already at the latest schema version.
    pub fn try_new(conn: Connection) -> RepoResult<Self> {
        ensure_current(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Opens (or creates) the database file at `path` and migrates it.
    pub fn open(path: impl AsRef<Path>) -> RepoResult<Self> {
        Self::try_new(open_db(path)?)
    }

    /// Opens a private in-memory database with the full schema.
    pub fn open_in_memory() -> RepoResult<Self> {
        Self::try_new(open_db_in_memory()?)
    }

    fn lock(&self) -> RepoResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| RepoError::LockPoisoned)
    }

    fn save_prepared(&self, prepared: &Entity) -> RepoResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if row_exists(&tx, prepared.kind(), prepared.id())? {
            return Err(RepoError::Conflict(format!(
                "{} already exists: {}",
                prepared.kind(),
                prepared.id()
            )));
        }
        ensure_references(&tx, prepared)?;
        ensure_email_available(&tx, prepared)?;
        insert_row(&tx, prepared)?;
        tx.commit()?;
        Ok(())
    }

    fn update_prepared(&self, prepared: &mut Entity) -> RepoResult<()> {
        let kind = prepared.kind();
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let stored_created_at: Option<i64> = tx
            .query_row(
                &format!(
                    "SELECT created_at FROM {} WHERE {} = ?1;",
                    table_name(kind),
                    id_column(kind)
                ),
                [prepared.id()],
                |row| row.get(0),
            )
            .optional()?;
        let stored_created_at =
            stored_created_at.ok_or_else(|| RepoError::not_found(kind, prepared.id()))?;

        prepared.prepare_update(stored_created_at, now_epoch_ms());
        prepared.validate()?;
        ensure_references(&tx, prepared)?;
        ensure_email_available(&tx, prepared)?;
        update_row(&tx, prepared)?;
        tx.commit()?;
        Ok(())
    }

    fn delete_row(&self, entity: &Entity) -> RepoResult<bool> {
        let kind = entity.kind();
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let changed = execute(
            &tx,
            &format!(
                "DELETE FROM {} WHERE {} = ?1;",
                table_name(kind),
                id_column(kind)
            ),
            [entity.id()],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found(kind, entity.id()));
        }
        tx.commit()?;
        Ok(true)
    }
}

impl Repository for SqliteRepository {
    fn get_all(&self, kind: Kind) -> RepoResult<Vec<Entity>> {
        let conn = self.lock()?;
        query_entities(&conn, kind, "", params![])
    }

    fn get(&self, kind: Kind, id: &str) -> RepoResult<Option<Entity>> {
        let conn = self.lock()?;
        let filter = format!("WHERE {} = ?1", id_column(kind));
        Ok(query_entities(&conn, kind, &filter, [id])?.into_iter().next())
    }

    fn get_by_field(&self, kind: Kind, field: &str, value: &str) -> RepoResult<Option<Entity>> {
        // Only whitelisted column names ever reach the SQL text below.
        if !kind.supports_lookup(field) {
            return Ok(None);
        }
        let conn = self.lock()?;
        let filter = format!("WHERE {field} = ?1");
        let mut matches = query_entities(&conn, kind, &filter, [value])?;
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
            .and_then(|()| self.save_prepared(&prepared));
        log_write("sqlite", "save", kind, &result);
        result?;

        *entity = prepared;
        Ok(())
    }

    fn update(&self, entity: &mut Entity) -> RepoResult<()> {
        let kind = entity.kind();
        let mut prepared = entity.clone();

        let result = self.update_prepared(&mut prepared);
        log_write("sqlite", "update", kind, &result);
        result?;

        *entity = prepared;
        Ok(())
    }

    fn delete(&self, entity: &Entity) -> RepoResult<bool> {
        let result = self.delete_row(entity);
        log_write("sqlite", "delete", entity.kind(), &result);
        result
    }

    fn reload(&self) -> RepoResult<()> {
        // Every call reads through to SQLite; there is no session cache to drop.
        debug!("event=repo_reload module=repo backend=sqlite status=skipped");
        Ok(())
    }
}

fn table_name(kind: Kind) -> &'static str {
    match kind {
        Kind::User => "users",
        Kind::Place => "places",
        Kind::Review => "reviews",
        Kind::Country => "countries",
        Kind::City => "cities",
        Kind::Amenity => "amenities",
    }
}

fn id_column(kind: Kind) -> &'static str {
    match kind {
        Kind::Country => "code",
        _ => "id",
    }
}

fn select_sql(kind: Kind) -> &'static str {
    match kind {
        Kind::User => USER_SELECT_SQL,
        Kind::Place => PLACE_SELECT_SQL,
        Kind::Review => REVIEW_SELECT_SQL,
        Kind::Country => COUNTRY_SELECT_SQL,
        Kind::City => CITY_SELECT_SQL,
        Kind::Amenity => AMENITY_SELECT_SQL,
    }
}

fn query_entities<P: Params>(
    conn: &Connection,
    kind: Kind,
    filter: &str,
    params: P,
) -> RepoResult<Vec<Entity>> {
    let sql = format!(
        "{} {filter} ORDER BY created_at ASC, {} ASC;",
        select_sql(kind),
        id_column(kind)
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params)?;
    let mut entities = Vec::new();
    while let Some(row) = rows.next()? {
        entities.push(parse_row(kind, row)?);
    }

    for entity in &mut entities {
        if let Entity::Place(place) = entity {
            place.amenity_ids = load_amenity_ids(conn, &place.id)?;
        }
    }
    Ok(entities)
}

fn load_amenity_ids(conn: &Connection, place_id: &str) -> RepoResult<Vec<String>> {
    let mut stmt = conn.prepare_cached(
        "SELECT amenity_id
         FROM place_amenities
         WHERE place_id = ?1
         ORDER BY amenity_id ASC;",
    )?;
    let ids = stmt
        .query_map([place_id], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ids)
}

fn parse_row(kind: Kind, row: &Row<'_>) -> RepoResult<Entity> {
    let entity = match kind {
        Kind::User => Entity::User(User {
            id: row.get("id")?,
            email: row.get("email")?,
            first_name: row.get("first_name")?,
            last_name: row.get("last_name")?,
            password_hash: row.get("password_hash")?,
            is_admin: parse_bool(row.get("is_admin")?, "users.is_admin")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        }),
        Kind::Place => Entity::Place(Place {
            id: row.get("id")?,
            host_id: row.get("host_id")?,
            name: row.get("name")?,
            description: row.get("description")?,
            address: row.get("address")?,
            city_id: row.get("city_id")?,
            latitude: row.get("latitude")?,
            longitude: row.get("longitude")?,
            number_of_rooms: parse_count(row.get("number_of_rooms")?, "places.number_of_rooms")?,
            number_of_bathrooms: parse_count(
                row.get("number_of_bathrooms")?,
                "places.number_of_bathrooms",
            )?,
            price_per_night: row.get("price_per_night")?,
            max_guests: parse_count(row.get("max_guests")?, "places.max_guests")?,
            amenity_ids: Vec::new(),
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        }),
        Kind::Review => Entity::Review(Review {
            id: row.get("id")?,
            place_id: row.get("place_id")?,
            user_id: row.get("user_id")?,
            rating: parse_rating(row.get("rating")?)?,
            comment: row.get("comment")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        }),
        Kind::Country => Entity::Country(Country {
            code: row.get("code")?,
            name: row.get("name")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        }),
        Kind::City => Entity::City(City {
            id: row.get("id")?,
            name: row.get("name")?,
            country_code: row.get("country_code")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        }),
        Kind::Amenity => Entity::Amenity(Amenity {
            id: row.get("id")?,
            name: row.get("name")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        }),
    };

    entity.validate().map_err(|err| {
        RepoError::InvalidData(format!(
            "{} row `{}` failed validation: {err}",
            table_name(kind),
            entity.id()
        ))
    })?;
    Ok(entity)
}

fn insert_row(conn: &Connection, entity: &Entity) -> RepoResult<()> {
    match entity {
        Entity::User(user) => {
            execute(
                conn,
                "INSERT INTO users (
                    id,
                    email,
                    first_name,
                    last_name,
                    password_hash,
                    is_admin,
                    created_at,
                    updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
                params![
                    user.id,
                    user.email,
                    user.first_name,
                    user.last_name,
                    user.password_hash,
                    bool_to_int(user.is_admin),
                    user.created_at,
                    user.updated_at,
                ],
            )?;
        }
        Entity::Place(place) => {
            execute(
                conn,
                "INSERT INTO places (
                    id,
                    host_id,
                    name,
                    description,
                    address,
                    city_id,
                    latitude,
                    longitude,
                    number_of_rooms,
                    number_of_bathrooms,
                    price_per_night,
                    max_guests,
                    created_at,
                    updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14);",
                params![
                    place.id,
                    place.host_id,
                    place.name,
                    place.description,
                    place.address,
                    place.city_id,
                    place.latitude,
                    place.longitude,
                    i64::from(place.number_of_rooms),
                    i64::from(place.number_of_bathrooms),
                    place.price_per_night,
                    i64::from(place.max_guests),
                    place.created_at,
                    place.updated_at,
                ],
            )?;
            replace_amenity_links(conn, place)?;
        }
        Entity::Review(review) => {
            execute(
                conn,
                "INSERT INTO reviews (
                    id,
                    place_id,
                    user_id,
                    rating,
                    comment,
                    created_at,
                    updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
                params![
                    review.id,
                    review.place_id,
                    review.user_id,
                    i64::from(review.rating),
                    review.comment,
                    review.created_at,
                    review.updated_at,
                ],
            )?;
        }
        Entity::Country(country) => {
            execute(
                conn,
                "INSERT INTO countries (code, name, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4);",
                params![
                    country.code,
                    country.name,
                    country.created_at,
                    country.updated_at
                ],
            )?;
        }
        Entity::City(city) => {
            execute(
                conn,
                "INSERT INTO cities (id, name, country_code, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5);",
                params![
                    city.id,
                    city.name,
                    city.country_code,
                    city.created_at,
                    city.updated_at
                ],
            )?;
        }
        Entity::Amenity(amenity) => {
            execute(
                conn,
                "INSERT INTO amenities (id, name, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4);",
                params![
                    amenity.id,
                    amenity.name,
                    amenity.created_at,
                    amenity.updated_at
                ],
            )?;
        }
    }
    Ok(())
}

fn update_row(conn: &Connection, entity: &Entity) -> RepoResult<()> {
    let changed = match entity {
        Entity::User(user) => execute(
            conn,
            "UPDATE users
             SET
                email = ?2,
                first_name = ?3,
                last_name = ?4,
                password_hash = ?5,
                is_admin = ?6,
                created_at = ?7,
                updated_at = ?8
             WHERE id = ?1;",
            params![
                user.id,
                user.email,
                user.first_name,
                user.last_name,
                user.password_hash,
                bool_to_int(user.is_admin),
                user.created_at,
                user.updated_at,
            ],
        )?,
        Entity::Place(place) => {
            let changed = execute(
                conn,
                "UPDATE places
                 SET
                    host_id = ?2,
                    name = ?3,
                    description = ?4,
                    address = ?5,
                    city_id = ?6,
                    latitude = ?7,
                    longitude = ?8,
                    number_of_rooms = ?9,
                    number_of_bathrooms = ?10,
                    price_per_night = ?11,
                    max_guests = ?12,
                    created_at = ?13,
                    updated_at = ?14
                 WHERE id = ?1;",
                params![
                    place.id,
                    place.host_id,
                    place.name,
                    place.description,
                    place.address,
                    place.city_id,
                    place.latitude,
                    place.longitude,
                    i64::from(place.number_of_rooms),
                    i64::from(place.number_of_bathrooms),
                    place.price_per_night,
                    i64::from(place.max_guests),
                    place.created_at,
                    place.updated_at,
                ],
            )?;
            replace_amenity_links(conn, place)?;
            changed
        }
        Entity::Review(review) => execute(
            conn,
            "UPDATE reviews
             SET
                place_id = ?2,
                user_id = ?3,
                rating = ?4,
                comment = ?5,
                created_at = ?6,
                updated_at = ?7
             WHERE id = ?1;",
            params![
                review.id,
                review.place_id,
                review.user_id,
                i64::from(review.rating),
                review.comment,
                review.created_at,
                review.updated_at,
            ],
        )?,
        Entity::Country(country) => execute(
            conn,
            "UPDATE countries SET name = ?2, created_at = ?3, updated_at = ?4 WHERE code = ?1;",
            params![
                country.code,
                country.name,
                country.created_at,
                country.updated_at
            ],
        )?,
        Entity::City(city) => execute(
            conn,
            "UPDATE cities
             SET name = ?2, country_code = ?3, created_at = ?4, updated_at = ?5
             WHERE id = ?1;",
            params![
                city.id,
                city.name,
                city.country_code,
                city.created_at,
                city.updated_at
            ],
        )?,
        Entity::Amenity(amenity) => execute(
            conn,
            "UPDATE amenities SET name = ?2, created_at = ?3, updated_at = ?4 WHERE id = ?1;",
            params![
                amenity.id,
                amenity.name,
                amenity.created_at,
                amenity.updated_at
            ],
        )?,
    };

    if changed == 0 {
        return Err(RepoError::not_found(entity.kind(), entity.id()));
    }
    Ok(())
}

fn replace_amenity_links(conn: &Connection, place: &Place) -> RepoResult<()> {
    execute(
        conn,
        "DELETE FROM place_amenities WHERE place_id = ?1;",
        [place.id.as_str()],
    )?;
    for amenity_id in &place.amenity_ids {
        execute(
            conn,
            "INSERT INTO place_amenities (place_id, amenity_id) VALUES (?1, ?2);",
            [place.id.as_str(), amenity_id.as_str()],
        )?;
    }
    Ok(())
}

fn row_exists(conn: &Connection, kind: Kind, id: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        &format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = ?1);",
            table_name(kind),
            id_column(kind)
        ),
        [id],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn ensure_references(conn: &Connection, entity: &Entity) -> RepoResult<()> {
    for (kind, id) in entity.references() {
        if !row_exists(conn, kind, id)? {
            return Err(RepoError::MissingReference {
                kind,
                id: id.to_string(),
            });
        }
    }
    Ok(())
}

fn ensure_email_available(conn: &Connection, entity: &Entity) -> RepoResult<()> {
    let Entity::User(user) = entity else {
        return Ok(());
    };
    let taken: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1 AND id <> ?2);",
        [user.email.as_str(), user.id.as_str()],
        |row| row.get(0),
    )?;
    if taken == 1 {
        return Err(RepoError::Conflict("email already registered".to_string()));
    }
    Ok(())
}

/// Executes one write, mapping constraint failures to contract errors.
fn execute<P: Params>(conn: &Connection, sql: &str, params: P) -> RepoResult<usize> {
    conn.execute(sql, params).map_err(map_write_error)
}

fn map_write_error(err: rusqlite::Error) -> RepoError {
    if let rusqlite::Error::SqliteFailure(failure, message) = &err {
        let detail = message
            .clone()
            .unwrap_or_else(|| "constraint failed".to_string());
        match failure.extended_code {
            ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                return RepoError::Conflict(detail);
            }
            ffi::SQLITE_CONSTRAINT_FOREIGNKEY | ffi::SQLITE_CONSTRAINT_CHECK => {
                return RepoError::Integrity(detail);
            }
            _ => {}
        }
    }
    err.into()
}

fn parse_bool(value: i64, column: &str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean value `{other}` in {column}"
        ))),
    }
}

fn parse_count(value: i64, column: &str) -> RepoResult<u32> {
    u32::try_from(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid count `{value}` in {column}")))
}

fn parse_rating(value: i64) -> RepoResult<u8> {
    u8::try_from(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid rating `{value}` in reviews.rating")))
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
