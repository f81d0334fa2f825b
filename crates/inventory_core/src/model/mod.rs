//! Entity model shared by every record kind.
//!
//! # Responsibility
//! - Define the `Entity` contract the generic document repository relies on.
//! - Keep identity (`id`, the row key) apart from the mutable document.
//!
//! # Invariants
//! - An entity only exists in validated form; `create` and `validate` agree.
//! - Rehydration (`from_document`) never stamps a new `modifiedAt`.
//! - Deletion is represented by the `deleted` flag, never by row removal.

pub mod audit;
pub mod equipment;
pub mod id;
pub mod product;

use self::audit::AuditFields;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Row key of a stored entity.
pub type EntityId = String;

/// JSON object persisted in the `document` column.
pub type Document = Map<String, Value>;

/// Rejected attribute set.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Required field absent or blank.
    MissingField(&'static str),
    /// Numeric field that must be strictly positive and finite.
    NonPositive { field: &'static str, value: f64 },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "{field} is required"),
            Self::NonPositive { field, value } => {
                write!(f, "{field} must be a positive number, got {value}")
            }
        }
    }
}

impl Error for ValidationError {}

/// A record kind persisted as `(id, document)`.
pub trait Entity: Clone + Serialize + DeserializeOwned + Send + 'static {
    /// Human-readable kind used in logs and error messages.
    const KIND: &'static str;
    /// Table holding this kind. Must match a migration.
    const TABLE: &'static str;

    /// Input accepted by `create`.
    type Attributes: DeserializeOwned + Send + 'static;
    /// Partial overlay accepted by `apply_patch`.
    type Patch: DeserializeOwned + Send + 'static;

    /// Builds a brand-new entity stamped with `now`.
    fn create(id: EntityId, attributes: Self::Attributes, now: &str)
        -> Result<Self, ValidationError>;

    fn id(&self) -> &str;

    fn audit(&self) -> &AuditFields;

    fn audit_mut(&mut self) -> &mut AuditFields;

    /// Overlays the provided fields; omitted fields keep their value.
    fn apply_patch(&mut self, patch: Self::Patch);

    fn validate(&self) -> Result<(), ValidationError>;

    /// Restores the identity that `Serialize` leaves out of the document.
    fn set_id(&mut self, id: EntityId);

    /// Serializes everything except the id.
    fn to_document(&self) -> Result<Document, serde_json::Error> {
        match serde_json::to_value(self)? {
            Value::Object(document) => Ok(document),
            other => Err(<serde_json::Error as serde::ser::Error>::custom(format!(
                "{} serialized to non-object JSON `{other}`",
                Self::KIND
            ))),
        }
    }

    /// Rehydrates a stored row. Audit fields are taken as stored.
    fn from_document(id: EntityId, document: Document) -> Result<Self, serde_json::Error> {
        let mut entity: Self = serde_json::from_value(Value::Object(document))?;
        entity.set_id(id);
        Ok(entity)
    }
}

pub(crate) fn require_text(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(())
}

