//! Equipment record.
//!
//! # Invariants
//! - `name` and `location` are never blank.
//! - `serial_number` falls back to `"N/A"` when not supplied.

use super::audit::AuditFields;
use super::{require_text, Entity, EntityId, ValidationError};
use serde::{Deserialize, Serialize};

pub const DEFAULT_SERIAL_NUMBER: &str = "N/A";

/// A piece of equipment installed at a location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Equipment {
    /// Row key; kept out of the stored document.
    #[serde(skip)]
    pub id: EntityId,
    pub name: String,
    pub location: String,
    #[serde(default = "default_serial_number", alias = "serial_number")]
    pub serial_number: String,
    #[serde(flatten)]
    pub audit: AuditFields,
}

/// Attributes for creating equipment.
///
/// Missing required fields deserialize as empty strings and are rejected by
/// `Equipment::create`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewEquipment {
    pub name: String,
    pub location: String,
    #[serde(alias = "serial_number")]
    pub serial_number: Option<String>,
    #[serde(alias = "created_by")]
    pub created_by: Option<String>,
}

impl NewEquipment {
    pub fn new(name: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
            ..Self::default()
        }
    }
}

/// Partial update for equipment. `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EquipmentPatch {
    pub name: Option<String>,
    pub location: Option<String>,
    #[serde(alias = "serial_number")]
    pub serial_number: Option<String>,
}

impl Entity for Equipment {
    const KIND: &'static str = "equipment";
    const TABLE: &'static str = "equipment";

    type Attributes = NewEquipment;
    type Patch = EquipmentPatch;

    fn create(id: EntityId, attributes: NewEquipment, now: &str) -> Result<Self, ValidationError> {
        let equipment = Self {
            id,
            name: attributes.name,
            location: attributes.location,
            serial_number: attributes
                .serial_number
                .unwrap_or_else(default_serial_number),
            audit: AuditFields::new(attributes.created_by, now),
        };
        equipment.validate()?;
        Ok(equipment)
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn audit(&self) -> &AuditFields {
        &self.audit
    }

    fn audit_mut(&mut self) -> &mut AuditFields {
        &mut self.audit
    }

    fn apply_patch(&mut self, patch: EquipmentPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(location) = patch.location {
            self.location = location;
        }
        if let Some(serial_number) = patch.serial_number {
            self.serial_number = serial_number;
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name)?;
        require_text("location", &self.location)
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }
}

fn default_serial_number() -> String {
    DEFAULT_SERIAL_NUMBER.to_string()
}
