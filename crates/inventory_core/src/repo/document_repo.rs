//! Generic document repository and SQLite implementation.
//!
//! # Responsibility
//! - Persist any `Entity` as one `(id, document)` row in `E::TABLE`.
//! - Run every write inside an immediate transaction, rolled back on failure.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - `create` validates before acquiring a connection.
//! - Rows are never physically removed; `delete` flips `deleted` to `true`.
//! - `update`/`delete` bump `version` and refresh `modifiedAt`; the UPDATE is
//!   guarded by the version that was read, so a concurrent writer can never be
//!   silently overwritten.
//! - Read paths reject persisted documents that fail to parse or validate.

use crate::db::{ConnectionManager, DbError};
use crate::model::audit::now_timestamp;
use crate::model::equipment::Equipment;
use crate::model::id::{IdGenerator, UuidV4Generator};
use crate::model::product::Product;
use crate::model::{Document, Entity, EntityId, ValidationError};
use log::{debug, error, info, warn};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::marker::PhantomData;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for document persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// Input rejected before (or instead of) any write.
    Validation(ValidationError),
    /// Connection, constraint or SQL failure. Writes were rolled back.
    Storage(DbError),
    /// Mutation targeted an id with no row.
    NotFound { kind: &'static str, id: EntityId },
    /// Stored version differs from the one the caller based its change on.
    Conflict {
        kind: &'static str,
        id: EntityId,
        expected_version: u64,
        actual_version: u64,
    },
    /// Persisted document could not be turned back into an entity.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Storage(err) => write!(f, "{err}"),
            Self::NotFound { kind, id } => write!(f, "{kind} not found: {id}"),
            Self::Conflict {
                kind,
                id,
                expected_version,
                actual_version,
            } => write!(
                f,
                "{kind} {id} is at version {actual_version}, expected {expected_version}"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted document: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Storage(err) => Some(err),
            Self::NotFound { .. } | Self::Conflict { .. } | Self::InvalidData(_) => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Storage(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Storage(DbError::Sqlite(value))
    }
}

/// CRUD persistence for one entity kind.
///
/// Owns its connection manager exclusively; the connection is opened on the
/// first call that needs storage. One operation runs at a time per instance
/// (`&mut self`), callers sharing a repository must serialize access.
pub struct DocumentRepository<E: Entity> {
    connections: ConnectionManager,
    ids: Box<dyn IdGenerator + Send>,
    _kind: PhantomData<fn() -> E>,
}

pub type EquipmentDb = DocumentRepository<Equipment>;
pub type ProductDb = DocumentRepository<Product>;

impl<E: Entity> DocumentRepository<E> {
    /// Creates a repository that generates UUID v4 ids.
    pub fn new(connections: ConnectionManager) -> Self {
        Self::with_id_generator(connections, UuidV4Generator)
    }

    pub fn with_id_generator(
        connections: ConnectionManager,
        ids: impl IdGenerator + Send + 'static,
    ) -> Self {
        Self {
            connections,
            ids: Box::new(ids),
            _kind: PhantomData,
        }
    }

    /// Validates, assigns a fresh id and inserts a new row.
    ///
    /// # Errors
    /// - `Validation` before any storage interaction.
    /// - `Storage` after the insert was rolled back.
    pub fn create(&mut self, attributes: E::Attributes) -> RepoResult<EntityId> {
        let now = now_timestamp();
        let entity = match E::create(self.ids.next_id(), attributes, &now) {
            Ok(entity) => entity,
            Err(err) => {
                warn!(
                    "event=record_create module=repo status=rejected kind={} error={}",
                    E::KIND,
                    err
                );
                return Err(err.into());
            }
        };

        self.write("create", entity.id(), |tx| {
            tx.execute(
                &format!("INSERT INTO {} (id, document) VALUES (?1, ?2);", E::TABLE),
                params![entity.id(), encode(&entity)?],
            )?;
            Ok(())
        })?;

        info!(
            "event=record_create module=repo status=ok kind={} id={}",
            E::KIND,
            entity.id()
        );
        Ok(entity.id().to_string())
    }

    /// Loads one row by id, soft-deleted rows included.
    ///
    /// Absence is `Ok(None)`, not an error.
    pub fn get_by_id(&mut self, id: &str) -> RepoResult<Option<E>> {
        let conn = self.connections.acquire()?;
        match fetch::<E>(conn, id) {
            Ok(Some(entity)) => {
                debug!(
                    "event=record_get module=repo status=ok kind={} id={}",
                    E::KIND,
                    id
                );
                Ok(Some(entity))
            }
            Ok(None) => {
                warn!(
                    "event=record_get module=repo status=not_found kind={} id={}",
                    E::KIND,
                    id
                );
                Ok(None)
            }
            Err(err) => {
                error!(
                    "event=record_get module=repo status=error kind={} id={} error={}",
                    E::KIND,
                    id,
                    err
                );
                Err(err)
            }
        }
    }

    /// Lists every non-deleted row, newest `createdAt` first.
    pub fn list_all(&mut self) -> RepoResult<Vec<E>> {
        let conn = self.connections.acquire()?;
        match query_active::<E>(conn) {
            Ok(entities) => {
                debug!(
                    "event=record_list module=repo status=ok kind={} count={}",
                    E::KIND,
                    entities.len()
                );
                Ok(entities)
            }
            Err(err) => {
                error!(
                    "event=record_list module=repo status=error kind={} error={}",
                    E::KIND,
                    err
                );
                Err(err)
            }
        }
    }

    /// Overlays `patch` onto the stored entity.
    ///
    /// # Errors
    /// - `NotFound` when no row has `id`.
    /// - `Validation` when the merged entity is invalid; nothing is written.
    pub fn update(&mut self, id: &str, patch: E::Patch) -> RepoResult<EntityId> {
        self.mutate("update", id, None, |entity| entity.apply_patch(patch))
    }

    /// Like `update`, but fails with `Conflict` unless the stored version is
    /// `expected_version`.
    pub fn update_if_version(
        &mut self,
        id: &str,
        expected_version: u64,
        patch: E::Patch,
    ) -> RepoResult<EntityId> {
        self.mutate("update", id, Some(expected_version), |entity| {
            entity.apply_patch(patch)
        })
    }

    /// Soft-deletes: the row stays readable by id but leaves `list_all`.
    pub fn delete(&mut self, id: &str) -> RepoResult<EntityId> {
        self.mutate("delete", id, None, mark_deleted)
    }

    pub fn delete_if_version(&mut self, id: &str, expected_version: u64) -> RepoResult<EntityId> {
        self.mutate("delete", id, Some(expected_version), mark_deleted)
    }

    /// Closes the held connection; the next call reopens lazily.
    pub fn release(&mut self) {
        self.connections.release();
    }

    pub fn is_connected(&self) -> bool {
        self.connections.is_open()
    }

    fn mutate(
        &mut self,
        operation: &'static str,
        id: &str,
        expected_version: Option<u64>,
        change: impl FnOnce(&mut E),
    ) -> RepoResult<EntityId> {
        let version = self.write(operation, id, |tx| {
            let Some(mut entity) = fetch::<E>(tx, id)? else {
                return Err(RepoError::NotFound {
                    kind: E::KIND,
                    id: id.to_string(),
                });
            };

            let read_version = entity.audit().version;
            if let Some(expected) = expected_version {
                if expected != read_version {
                    return Err(RepoError::Conflict {
                        kind: E::KIND,
                        id: id.to_string(),
                        expected_version: expected,
                        actual_version: read_version,
                    });
                }
            }

            change(&mut entity);
            entity.validate()?;
            if entity.audit_mut().touch(&now_timestamp()).is_none() {
                return Err(RepoError::InvalidData(format!(
                    "{} {id} version {read_version} cannot be incremented",
                    E::KIND
                )));
            }

            let changed = tx.execute(
                &format!(
                    "UPDATE {}
                     SET document = ?1
                     WHERE id = ?2
                       AND IFNULL(json_extract(document, '$.version'), 0) = ?3;",
                    E::TABLE
                ),
                params![encode(&entity)?, id, version_to_db(read_version)?],
            )?;
            // Defense in depth: the IMMEDIATE transaction already excludes
            // other writers, so this only fires for writers bypassing it.
            if changed == 0 {
                let actual_version = fetch::<E>(tx, id)?
                    .map_or(read_version, |current| current.audit().version);
                return Err(RepoError::Conflict {
                    kind: E::KIND,
                    id: id.to_string(),
                    expected_version: read_version,
                    actual_version,
                });
            }

            Ok(entity.audit().version)
        })?;

        info!(
            "event=record_{} module=repo status=ok kind={} id={} version={}",
            operation,
            E::KIND,
            id,
            version
        );
        Ok(id.to_string())
    }

    /// Runs `body` in an immediate transaction, committing on success and
    /// rolling back on any error.
    fn write<T>(
        &mut self,
        operation: &'static str,
        id: &str,
        body: impl FnOnce(&Transaction<'_>) -> RepoResult<T>,
    ) -> RepoResult<T> {
        let outcome = self
            .connections
            .acquire()
            .map_err(RepoError::from)
            .and_then(|conn| run_in_transaction(conn, body));

        if let Err(err) = &outcome {
            log_write_failure(operation, E::KIND, id, err);
        }
        outcome
    }
}

fn run_in_transaction<T>(
    conn: &mut Connection,
    body: impl FnOnce(&Transaction<'_>) -> RepoResult<T>,
) -> RepoResult<T> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    match body(&tx) {
        Ok(value) => {
            tx.commit()?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback() {
                error!(
                    "event=tx_rollback module=repo status=error error={}",
                    rollback_err
                );
            }
            Err(err)
        }
    }
}

fn log_write_failure(operation: &str, kind: &str, id: &str, err: &RepoError) {
    match err {
        RepoError::Validation(_) | RepoError::NotFound { .. } | RepoError::Conflict { .. } => {
            warn!(
                "event=record_{} module=repo status=rejected kind={} id={} error={}",
                operation, kind, id, err
            );
        }
        RepoError::Storage(_) | RepoError::InvalidData(_) => {
            error!(
                "event=record_{} module=repo status=rolled_back kind={} id={} error={}",
                operation, kind, id, err
            );
        }
    }
}

fn mark_deleted<E: Entity>(entity: &mut E) {
    entity.audit_mut().deleted = true;
}

fn fetch<E: Entity>(conn: &Connection, id: &str) -> RepoResult<Option<E>> {
    let row = conn
        .query_row(
            &format!("SELECT id, document FROM {} WHERE id = ?1;", E::TABLE),
            [id],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
        )
        .optional()?;

    row.map(|(row_id, document)| decode::<E>(row_id, &document))
        .transpose()
}

fn query_active<E: Entity>(conn: &Connection) -> RepoResult<Vec<E>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT id, document
         FROM {}
         WHERE IFNULL(json_type(document, '$.deleted'), 'false') = 'false'
         ORDER BY json_extract(document, '$.createdAt') DESC, rowid DESC;",
        E::TABLE
    ))?;

    let mut rows = stmt.query([])?;
    let mut entities = Vec::new();
    while let Some(row) = rows.next()? {
        let id: String = row.get(0)?;
        let document: String = row.get(1)?;
        entities.push(decode::<E>(id, &document)?);
    }

    Ok(entities)
}

fn encode<E: Entity>(entity: &E) -> RepoResult<String> {
    let document = entity.to_document().map_err(|err| {
        RepoError::InvalidData(format!(
            "{} {} could not be serialized: {err}",
            E::KIND,
            entity.id()
        ))
    })?;
    serde_json::to_string(&document).map_err(|err| {
        RepoError::InvalidData(format!(
            "{} {} could not be encoded: {err}",
            E::KIND,
            entity.id()
        ))
    })
}

fn decode<E: Entity>(id: String, raw: &str) -> RepoResult<E> {
    let document: Document = serde_json::from_str(raw).map_err(|err| {
        RepoError::InvalidData(format!(
            "{}.document for `{id}` is not a JSON object: {err}",
            E::TABLE
        ))
    })?;

    let entity = E::from_document(id.clone(), document).map_err(|err| {
        RepoError::InvalidData(format!(
            "{}.document for `{id}` does not match {}: {err}",
            E::TABLE,
            E::KIND
        ))
    })?;

    entity.validate().map_err(|err| {
        RepoError::InvalidData(format!(
            "{}.document for `{id}` fails validation: {err}",
            E::TABLE
        ))
    })?;
    Ok(entity)
}

fn version_to_db(version: u64) -> RepoResult<i64> {
    i64::try_from(version).map_err(|_| {
        RepoError::InvalidData(format!("version {version} is outside the storable range"))
    })
}
