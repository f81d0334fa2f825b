//! Repository layer over the `(id, document)` tables.
//!
//! # Responsibility
//! - Map create/read/update/delete/list onto document rows.
//! - Isolate SQLite query details from HTTP orchestration.
//!
//! # Invariants
//! - Writes validate the entity before touching storage.
//! - Lookups return `None` for absent rows; mutations return `NotFound`.

pub mod document_repo;
