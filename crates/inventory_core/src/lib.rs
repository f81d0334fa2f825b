//! Core persistence for equipment and product records.
//! This crate is the single source of truth for record invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;

pub use db::{ConnectionManager, DbError, DbLocation};
pub use logging::{default_log_level, init_logging, logging_status, LogTarget};
pub use model::audit::AuditFields;
pub use model::equipment::{Equipment, EquipmentPatch, NewEquipment};
pub use model::id::{IdGenerator, UuidV4Generator};
pub use model::product::{NewProduct, Product, ProductPatch};
pub use model::{Document, Entity, EntityId, ValidationError};
pub use repo::document_repo::{
    DocumentRepository, EquipmentDb, ProductDb, RepoError, RepoResult,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
