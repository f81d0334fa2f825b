//! Identifier generation for new entities.

use super::EntityId;
use uuid::Uuid;

/// Source of globally unique ids for newly created rows.
pub trait IdGenerator {
    fn next_id(&self) -> EntityId;
}

/// Default generator: random UUID v4 in hyphenated text form.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidV4Generator;

impl IdGenerator for UuidV4Generator {
    fn next_id(&self) -> EntityId {
        Uuid::new_v4().to_string()
    }
}

impl<F> IdGenerator for F
where
    F: Fn() -> EntityId,
{
    fn next_id(&self) -> EntityId {
        self()
    }
}
